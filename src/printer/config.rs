//! # Printer Configuration
//!
//! This module defines the session parameters for supported thermal printers.
//!
//! ## Presets
//!
//! | Preset | Width (dots) | Paper | Columns |
//! |--------|--------------|-------|---------|
//! | GENERIC_58MM | 384 | 58mm (48mm printable) | 32 |
//! | GENERIC_80MM | 576 | 80mm (72mm printable) | 48 |
//!
//! The configuration is fixed at session construction. The raster width used
//! by the image preprocessor must match `dots_per_line` for that session.
//!
//! ## Usage
//!
//! ```
//! use recibo::printer::PrinterConfig;
//!
//! let config = PrinterConfig::GENERIC_58MM;
//! println!("Print width: {} dots ({} bytes)",
//!          config.dots_per_line,
//!          config.width_bytes());
//! ```

use serde::{Deserialize, Serialize};

/// # Printer Session Configuration
///
/// Defines the printable geometry of a thermal printer session.
///
/// - **dots_per_line**: fixed pixel width of the printable area, determined
///   by the print head hardware
/// - **paper_width_mm**: printable width in millimeters
/// - **chars_per_line**: text columns at the default font
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrinterConfig {
    /// Maximum print width in dots (pixels).
    pub dots_per_line: u16,

    /// Printable width in millimeters.
    pub paper_width_mm: f32,

    /// Text columns per line at the default font.
    pub chars_per_line: u8,
}

impl PrinterConfig {
    /// # Generic 58mm ESC/POS printer
    ///
    /// The common narrow receipt format: 58mm paper, 48mm printable width,
    /// 384 dots at 203 DPI, 32 columns of 12x24 font.
    ///
    /// ```text
    /// ├─ 5mm ─┼────── 48mm printable ──────┼─ 5mm ─┤
    /// │margin │         384 dots           │margin │
    /// ```
    pub const GENERIC_58MM: Self = Self {
        dots_per_line: 384,
        paper_width_mm: 48.0,
        chars_per_line: 32,
    };

    /// # Generic 80mm ESC/POS printer
    ///
    /// 80mm paper, 72mm printable width, 576 dots at 203 DPI, 48 columns.
    pub const GENERIC_80MM: Self = Self {
        dots_per_line: 576,
        paper_width_mm: 72.0,
        chars_per_line: 48,
    };

    /// Print width in bytes of packed raster data (`dots_per_line / 8`,
    /// rounded up).
    #[inline]
    pub fn width_bytes(&self) -> u16 {
        self.dots_per_line.div_ceil(8)
    }

    /// Dots per millimeter for this session.
    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dots_per_line as f32 / self.paper_width_mm
    }

    /// Convert millimeters to dots.
    #[inline]
    pub fn mm_to_dots(&self, mm: f32) -> u16 {
        (mm * self.dots_per_mm()).round() as u16
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::GENERIC_58MM
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_58mm_dimensions() {
        let config = PrinterConfig::GENERIC_58MM;
        assert_eq!(config.dots_per_line, 384);
        assert_eq!(config.width_bytes(), 48);
        assert_eq!(config.chars_per_line, 32);
    }

    #[test]
    fn test_80mm_dimensions() {
        let config = PrinterConfig::GENERIC_80MM;
        assert_eq!(config.dots_per_line, 576);
        assert_eq!(config.width_bytes(), 72);
    }

    #[test]
    fn test_dots_per_mm() {
        let config = PrinterConfig::GENERIC_58MM;
        // 384 dots / 48mm = 8 dots/mm (203 DPI)
        assert!((config.dots_per_mm() - 8.0).abs() < 0.01);
    }

    #[test]
    fn test_mm_to_dots() {
        let config = PrinterConfig::GENERIC_58MM;
        assert_eq!(config.mm_to_dots(10.0), 80);
    }

    #[test]
    fn test_default_is_58mm() {
        assert_eq!(PrinterConfig::default(), PrinterConfig::GENERIC_58MM);
    }

    #[test]
    fn test_width_bytes_rounds_up() {
        let config = PrinterConfig {
            dots_per_line: 380,
            paper_width_mm: 47.5,
            chars_per_line: 32,
        };
        assert_eq!(config.width_bytes(), 48);
    }
}
