//! # ESC/POS Raster Graphics
//!
//! Raster bit-image command for printing packed monochrome bitmaps.
//!
//! ## Coordinate System
//!
//! ```text
//! (0,0) ──────────────────────► X (horizontal, 384 dots on 58mm paper)
//!   │
//!   │   ████████  ← each dot is ~0.125mm (203 DPI)
//!   │   ████████
//!   ▼
//!   Y (vertical, paper feed direction)
//! ```
//!
//! ## Bit Packing
//!
//! Each data byte carries 8 horizontal dots:
//! - Bit 7 (MSB) = leftmost dot
//! - Bit 0 (LSB) = rightmost dot
//! - 1 = black (print), 0 = white
//!
//! ```text
//! Byte value 0xF0 = 11110000 = ████░░░░
//! Byte value 0xAA = 10101010 = █░█░█░█░
//! ```

use super::commands::{GS, u16_le};

/// # Print Raster Bit Image (GS v 0 m xL xH yL yH d1...dk)
///
/// Prints a monochrome bitmap of arbitrary height in normal density.
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | GS v 0 m xL xH yL yH d1...dk |
/// | Hex     | 1D 76 30 00 xL xH yL yH d1...dk |
///
/// ## Parameters
///
/// - `m = 0`: normal density (one dot per bit in both axes)
/// - `xL xH`: width in **bytes**, little-endian (48 bytes = 384 dots)
/// - `yL yH`: height in **dots**, little-endian
/// - `d1...dk`: row-major packed data, k = width_bytes × height
///
/// ## Example
///
/// ```
/// use recibo::protocol::graphics;
///
/// // 48 bytes wide (384 dots), 2 rows, all black
/// let data = vec![0xFF; 48 * 2];
/// let cmd = graphics::raster(48, 2, &data);
///
/// assert_eq!(&cmd[0..8], &[0x1D, 0x76, 0x30, 0x00, 48, 0, 2, 0]);
/// assert_eq!(cmd.len(), 8 + 48 * 2);
/// ```
pub fn raster(width_bytes: u16, height: u16, data: &[u8]) -> Vec<u8> {
    debug_assert_eq!(data.len(), width_bytes as usize * height as usize);

    let mut cmd = Vec::with_capacity(8 + data.len());
    cmd.extend([GS, b'v', b'0', 0]);
    cmd.extend(u16_le(width_bytes));
    cmd.extend(u16_le(height));
    cmd.extend(data);
    cmd
}

// ============================================================================
// TESTS
// ============================================================================
