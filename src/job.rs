//! # Print Directives
//!
//! The intermediate representation between the markup compiler and the
//! command encoder:
//!
//! ```text
//! markup ──► PrintJob (inspectable) ──► encoder ──► ESC/POS bytes
//! ```
//!
//! A [`PrintJob`] is an ordered sequence of directives, immutable once
//! compiled. Each directive maps to one or more opcodes during encoding;
//! none of them carries printer geometry; that arrives with the session
//! config at encode time.

use crate::protocol::text::Alignment;
use crate::render::RasterBitmap;

/// One print operation in a compiled job.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintDirective {
    /// A line of text with its alignment and emphasis.
    AlignedText {
        align: Alignment,
        bold: bool,
        content: String,
    },

    /// A horizontal rule, rendered as a full line of dashes.
    Rule,

    /// A packed monochrome bitmap, already sized for the head.
    RasterImage(RasterBitmap),

    /// A 1D barcode. `symbology` is the lowercase markup token
    /// (e.g. `"ean13"`, `"code128"`); the encoder validates it.
    Barcode {
        symbology: String,
        data: String,
        height: u8,
    },

    /// A QR code. `size` is the requested module size in dots.
    QrCode { data: String, size: u8 },

    /// An empty line.
    LineFeed,

    /// Feed and cut the paper.
    Cut,
}

/// An ordered, immutable sequence of directives making up one print.
///
/// Created by the markup compiler (or assembled directly for bitmap-only
/// jobs) and consumed exactly once by the command encoder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrintJob {
    directives: Vec<PrintDirective>,
}

impl PrintJob {
    pub fn new(directives: Vec<PrintDirective>) -> Self {
        Self { directives }
    }

    /// The directives in print order.
    pub fn directives(&self) -> &[PrintDirective] {
        &self.directives
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    /// Append a trailing [`PrintDirective::Cut`] if the job does not already
    /// end with one.
    pub fn with_cut(mut self) -> Self {
        if self.directives.last() != Some(&PrintDirective::Cut) {
            self.directives.push(PrintDirective::Cut);
        }
        self
    }
}

impl From<Vec<PrintDirective>> for PrintJob {
    fn from(directives: Vec<PrintDirective>) -> Self {
        Self::new(directives)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_cut_appends_once() {
        let job = PrintJob::new(vec![PrintDirective::LineFeed]).with_cut();
        assert_eq!(job.len(), 2);
        assert_eq!(job.directives().last(), Some(&PrintDirective::Cut));

        let again = job.with_cut();
        assert_eq!(again.len(), 2);
    }

    #[test]
    fn test_empty_job() {
        let job = PrintJob::default();
        assert!(job.is_empty());
        assert_eq!(job.len(), 0);
    }
}
