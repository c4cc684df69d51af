//! # ESC/POS Barcode Commands
//!
//! 1D barcode and QR code generation. The printer renders the symbology
//! itself; these builders only stage parameters and data.
//!
//! ## Supported Symbologies
//!
//! | Type | Command | Data |
//! |------|---------|------|
//! | EAN-13 | GS k 67 | 12–13 digits |
//! | CODE128 | GS k 73 | full ASCII (code set B) |
//! | QR | GS ( k | up to ~7000 bytes |
//!
//! ## QR Code Usage
//!
//! QR codes are a staged sequence: select model, set module size and error
//! correction, store the data, then print:
//!
//! ```
//! use recibo::protocol::barcode::qr;
//!
//! let mut data = Vec::new();
//! data.extend(qr::select_model());
//! data.extend(qr::set_module_size(4));
//! data.extend(qr::set_error_correction(qr::QrErrorLevel::M));
//! data.extend(qr::store_data(b"https://example.com"));
//! data.extend(qr::print());
//! ```

use super::commands::GS;

// ============================================================================
// 1D BARCODES (GS k, function B)
// ============================================================================

/// 1D barcode command builders.
pub mod barcode1d {
    use super::GS;

    /// Symbology codes for GS k function B (length-prefixed payload).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(u8)]
    pub enum BarcodeType {
        /// EAN-13 / JAN-13 (12 digits + check digit)
        Ean13 = 67,
        /// Code128 (full ASCII, requires code set prefix)
        Code128 = 73,
    }

    /// HRI (human readable interpretation) position.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum HriPosition {
        /// No HRI text printed
        None = 0,
        /// HRI above barcode
        Above = 1,
        /// HRI below barcode (default)
        #[default]
        Below = 2,
    }

    /// # Set Barcode Height (GS h n)
    ///
    /// Height in dots (1–255). At 203 DPI, 64 dots ≈ 8mm.
    ///
    /// | Format  | Bytes   |
    /// |---------|---------|
    /// | Hex     | 1D 68 n |
    #[inline]
    pub fn set_height(dots: u8) -> Vec<u8> {
        vec![GS, b'h', dots]
    }

    /// # Set Module Width (GS w n)
    ///
    /// Narrow bar width in dots (2–6). Default 3.
    #[inline]
    pub fn set_module_width(dots: u8) -> Vec<u8> {
        vec![GS, b'w', dots]
    }

    /// # Set HRI Position (GS H n)
    #[inline]
    pub fn set_hri_position(position: HriPosition) -> Vec<u8> {
        vec![GS, b'H', position as u8]
    }

    /// # Print Barcode (GS k m n d1...dn)
    ///
    /// Function B: `m` selects the symbology (65–79), `n` is the payload
    /// length, followed by the payload bytes.
    ///
    /// | Format  | Bytes |
    /// |---------|-------|
    /// | Hex     | 1D 6B m n d1...dn |
    ///
    /// ```
    /// use recibo::protocol::barcode::barcode1d::{print, BarcodeType};
    ///
    /// let cmd = print(BarcodeType::Ean13, b"129743658710");
    /// assert_eq!(&cmd[0..4], &[0x1D, 0x6B, 67, 12]);
    /// ```
    pub fn print(barcode_type: BarcodeType, data: &[u8]) -> Vec<u8> {
        let mut cmd = Vec::with_capacity(4 + data.len());
        cmd.extend([GS, b'k', barcode_type as u8, data.len() as u8]);
        cmd.extend(data);
        cmd
    }

    /// Print a Code128 barcode using code set B (printable ASCII).
    ///
    /// Function B requires the payload to begin with a code set selector;
    /// `{B` selects code set B.
    pub fn code128(data: &[u8]) -> Vec<u8> {
        let mut payload = Vec::with_capacity(2 + data.len());
        payload.extend(b"{B");
        payload.extend(data);
        print(BarcodeType::Code128, &payload)
    }
}

// ============================================================================
// QR CODES (GS ( k)
// ============================================================================

/// QR code command builders.
///
/// All QR commands share the `GS ( k pL pH cn fn` frame with `cn = 49`.
pub mod qr {
    use super::GS;
    use crate::protocol::commands::u16_le;

    /// QR error correction level.
    ///
    /// Higher levels survive more damage at the cost of density.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum QrErrorLevel {
        /// ~7% recovery
        L = 48,
        /// ~15% recovery (default)
        #[default]
        M = 49,
        /// ~25% recovery
        Q = 50,
        /// ~30% recovery
        H = 51,
    }

    /// # Select QR Model 2 (fn 65)
    ///
    /// | Format  | Bytes |
    /// |---------|-------|
    /// | Hex     | 1D 28 6B 04 00 31 41 32 00 |
    ///
    /// Model 2 is the standard QR model supported by all current firmware.
    #[inline]
    pub fn select_model() -> Vec<u8> {
        vec![GS, b'(', b'k', 4, 0, 49, 65, 50, 0]
    }

    /// # Set Module Size (fn 67)
    ///
    /// Dot width of one QR module, 1–16.
    ///
    /// | Format  | Bytes |
    /// |---------|-------|
    /// | Hex     | 1D 28 6B 03 00 31 43 n |
    #[inline]
    pub fn set_module_size(dots: u8) -> Vec<u8> {
        vec![GS, b'(', b'k', 3, 0, 49, 67, dots]
    }

    /// # Set Error Correction Level (fn 69)
    #[inline]
    pub fn set_error_correction(level: QrErrorLevel) -> Vec<u8> {
        vec![GS, b'(', b'k', 3, 0, 49, 69, level as u8]
    }

    /// # Store Data in Symbol Buffer (fn 80)
    ///
    /// The length field counts the data plus the 3 function bytes.
    ///
    /// | Format  | Bytes |
    /// |---------|-------|
    /// | Hex     | 1D 28 6B pL pH 31 50 30 d1...dk |
    pub fn store_data(data: &[u8]) -> Vec<u8> {
        let len = u16_le(data.len() as u16 + 3);
        let mut cmd = Vec::with_capacity(8 + data.len());
        cmd.extend([GS, b'(', b'k', len[0], len[1], 49, 80, 48]);
        cmd.extend(data);
        cmd
    }

    /// # Print Stored Symbol (fn 81)
    #[inline]
    pub fn print() -> Vec<u8> {
        vec![GS, b'(', b'k', 3, 0, 49, 81, 48]
    }
}

// ============================================================================
// TESTS
// ============================================================================
