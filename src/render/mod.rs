//! # Raster Pipeline
//!
//! Converts decoded bitmaps into packed monochrome rasters sized for the
//! print head.
//!
//! ## Modules
//!
//! - [`raster`]: packed 1-bit-per-pixel [`RasterBitmap`] and its hex payload
//!   form
//! - [`preprocess`]: resize + grayscale + threshold pipeline for arbitrary
//!   source images

pub mod preprocess;
pub mod raster;

pub use preprocess::resize_to_width;
pub use raster::RasterBitmap;
