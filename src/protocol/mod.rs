//! # ESC/POS Protocol
//!
//! Command builders for the ESC/POS byte protocol spoken by most thermal
//! receipt printers.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`commands`] | Control commands (init, feed, cut) |
//! | [`text`] | Alignment and emphasis |
//! | [`cp437`] | Unicode to code page 437 text encoding |
//! | [`graphics`] | Raster bit images |
//! | [`barcode`] | 1D barcodes and QR codes |
//!
//! Each builder returns the raw bytes for one command. Higher layers
//! concatenate them into a print job; nothing here performs I/O.

pub mod barcode;
pub mod commands;
pub mod cp437;
pub mod graphics;
pub mod text;
