//! # Image Preprocessing
//!
//! Turns an arbitrary decoded bitmap (RGBA or grayscale, up to multi-
//! megapixel photos) into a [`RasterBitmap`] no wider than the print head.
//!
//! ## Pipeline
//!
//! ```text
//! source bitmap ──► downscale (if wider than the head) ──► luma ──► threshold ──► packed 1bpp
//! ```
//!
//! - **Downscale**: one `imageops::resize` call with a triangle (area
//!   averaging) filter, straight from the source to the target size. There
//!   is never an intermediate full-resolution grayscale copy, so peak memory
//!   is one full-resolution source plus one downscaled buffer even for a
//!   6000x6000 photo (~144MB RGBA source, ~0.4MB downscaled).
//! - **Luma**: ITU-R BT.601 weights, 0.299 R + 0.587 G + 0.114 B, after
//!   compositing alpha onto white (paper is white).
//! - **Threshold**: fixed cutoff. Gray > 127 prints white, everything else
//!   black. Matches the reference output byte for byte; see DESIGN.md for
//!   why no dithering pass is applied.

use image::{DynamicImage, GenericImageView, Rgba, imageops, imageops::FilterType};

use crate::error::ImageError;
use crate::render::raster::{RasterBitmap, pack_row};

/// Resize a decoded bitmap to at most `max_width` pixels wide and binarize
/// it for print.
///
/// - Sources already within `max_width` keep their dimensions; only the
///   grayscale + threshold pass is applied. Running the output through this
///   function again with the same `max_width` is a no-op.
/// - Wider sources are downscaled to exactly `max_width`, preserving aspect
///   ratio: `new_height = round(height * max_width / width)`, clamped to at
///   least one row.
///
/// ## Errors
///
/// `InvalidImage` if the source or the requested width has zero area. Never
/// returns a bitmap with a zero dimension.
///
/// ## Example
///
/// ```
/// use image::DynamicImage;
/// use recibo::render::preprocess::resize_to_width;
///
/// let photo = DynamicImage::new_rgba8(6000, 4000);
/// let raster = resize_to_width(&photo, 384).unwrap();
/// assert_eq!(raster.width(), 384);
/// assert_eq!(raster.height(), 256);
/// ```
pub fn resize_to_width(
    source: &DynamicImage,
    max_width: u32,
) -> Result<RasterBitmap, ImageError> {
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidImage(format!(
            "zero-area source bitmap ({width}x{height})"
        )));
    }
    if max_width == 0 {
        return Err(ImageError::InvalidImage(
            "target width is zero".to_string(),
        ));
    }

    if width <= max_width {
        return binarize(source);
    }

    let scale = max_width as f64 / width as f64;
    let new_height = ((height as f64 * scale).round() as u32).max(1);

    tracing::debug!(
        "downscaling {}x{} -> {}x{} for print",
        width,
        height,
        max_width,
        new_height
    );

    // Single pass from the source pixels to the target size; the only
    // allocation is the downscaled buffer itself.
    let resized = imageops::resize(source, max_width, new_height, FilterType::Triangle);
    binarize(&resized)
}

/// Grayscale + fixed-threshold pass over any RGBA view, packed to 1bpp.
fn binarize<I>(img: &I) -> Result<RasterBitmap, ImageError>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    let (width, height) = img.dimensions();
    let mut data = Vec::with_capacity(RasterBitmap::row_bytes(width) * height as usize);
    let mut row = vec![false; width as usize];

    for y in 0..height {
        for x in 0..width {
            row[x as usize] = luma_over_white(img.get_pixel(x, y)) <= 127;
        }
        data.extend(pack_row(&row));
    }

    RasterBitmap::from_packed(width, height, data)
}

/// BT.601 luma of a pixel composited onto white paper.
fn luma_over_white(pixel: Rgba<u8>) -> u8 {
    let [r, g, b, a] = pixel.0;
    let alpha = a as u32;
    let blend = |c: u8| (c as u32 * alpha + 255 * (255 - alpha)) / 255;
    let gray =
        0.299 * blend(r) as f64 + 0.587 * blend(g) as f64 + 0.114 * blend(b) as f64;
    gray.round().min(255.0) as u8
}

// ============================================================================
// TESTS
// ============================================================================
