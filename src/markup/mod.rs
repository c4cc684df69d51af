//! # Markup Compiler
//!
//! Compiles the line-tagged receipt formatting language into a [`PrintJob`].
//!
//! ## Grammar
//!
//! The language is line-oriented. Each line may begin with an alignment tag
//! and may contain inline tags:
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `[L]` / `[C]` / `[R]` | Line alignment (default left when absent) |
//! | `<b>...</b>` | Emphasis |
//! | `<img>hex</img>` | Embedded raster payload (see [`RasterBitmap::to_hex`]) |
//! | `<qrcode size='N'>data</qrcode>` | QR code, module size `N` |
//! | `<barcode type='T' height='H'>data</barcode>` | 1D barcode |
//!
//! Blank lines compile to a line feed. A line consisting only of dashes
//! (three or more) compiles to a horizontal rule. A second alignment tag
//! inside a line marks a column break: its text is appended verbatim to the
//! same text directive, so receipt rows like
//! `[L]Item A        [R]10.00` stay a single line.
//!
//! ## Errors
//!
//! Unknown or malformed tags fail compilation with
//! [`MarkupError::UnknownTag`]; a missing close tag fails with
//! [`MarkupError::UnterminatedTag`]. Nothing is dropped silently and no
//! partial job is ever returned; a swallowed formatting error would print a
//! wrong physical receipt.
//!
//! ## Example
//!
//! ```
//! use recibo::markup;
//!
//! let job = markup::compile("[C]<b>TEST</b>\n[L]Item A        [R]10.00").unwrap();
//! assert_eq!(job.len(), 2);
//! ```
//!
//! The compiler never touches image policy: `<img>` payloads are pre-encoded
//! rasters produced by the preprocessing step.
//!
//! [`RasterBitmap::to_hex`]: crate::render::RasterBitmap::to_hex

mod line;

use crate::error::MarkupError;
use crate::job::PrintJob;

/// Options controlling compilation of embedded images.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// When set, an `<img>` tag with an empty payload is skipped instead of
    /// failing the job. This is the partial-failure policy for optional
    /// product images: the caller substitutes an empty payload when the
    /// image could not be fetched, and the receipt prints without it.
    pub image_optional: bool,
}

/// Compile markup text into a print job with default options.
pub fn compile(markup: &str) -> Result<PrintJob, MarkupError> {
    compile_with(markup, &CompileOptions::default())
}

/// Compile markup text into a print job.
///
/// The job is built in full before being returned; any error aborts the
/// whole compilation.
pub fn compile_with(markup: &str, options: &CompileOptions) -> Result<PrintJob, MarkupError> {
    let mut directives = Vec::new();
    for raw_line in markup.lines() {
        directives.extend(line::compile_line(raw_line, options)?);
    }
    Ok(PrintJob::new(directives))
}

// ============================================================================
// TESTS
// ============================================================================
