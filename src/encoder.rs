//! # Command Encoding
//!
//! Renders a [`PrintJob`] into ESC/POS bytes for a given session
//! configuration.
//!
//! Encoding is a pure function of job + config: no I/O, no hidden state,
//! identical input always yields byte-identical output. The golden byte
//! tests in `tests/golden_bytes.rs` rely on this.
//!
//! Every job starts with `ESC @` so it never inherits formatting from the
//! previous one. Each directive then maps to one opcode group; see the
//! [`protocol`](crate::protocol) modules for the individual commands.

use crate::error::EncodeError;
use crate::job::{PrintDirective, PrintJob};
use crate::printer::PrinterConfig;
use crate::protocol::barcode::{barcode1d, qr};
use crate::protocol::{commands, cp437, graphics, text};
use crate::render::RasterBitmap;

/// Rows per raster command. Tall images are split into bands so a single
/// command never overflows the printer's line buffer on slow links.
const MAX_RASTER_ROWS: usize = 256;

/// Longest payload a model-2 QR symbol can hold (8-bit mode, level L).
const MAX_QR_PAYLOAD: usize = 7089;

/// Default narrow-bar width in dots for 1D barcodes.
const BARCODE_MODULE_WIDTH: u8 = 3;

/// Encode a print job into ESC/POS bytes.
///
/// ## Errors
///
/// - [`EncodeError::WidthMismatch`] if a raster directive is wider than
///   `config.dots_per_line`
/// - [`EncodeError::UnsupportedSymbology`] for barcode types outside
///   {EAN13, CODE128, QR}
/// - [`EncodeError::InvalidBarcode`] for data the symbology cannot encode
///
/// ## Example
///
/// ```
/// use recibo::{encoder, markup, printer::PrinterConfig};
///
/// let job = markup::compile("[C]<b>TEST</b>").unwrap();
/// let bytes = encoder::encode(&job, &PrinterConfig::GENERIC_58MM).unwrap();
/// assert_eq!(&bytes[..2], &[0x1B, 0x40]); // ESC @
/// ```
pub fn encode(job: &PrintJob, config: &PrinterConfig) -> Result<Vec<u8>, EncodeError> {
    let mut out = commands::init();

    for directive in job.directives() {
        match directive {
            PrintDirective::AlignedText {
                align,
                bold,
                content,
            } => {
                out.extend(text::align(*align));
                if *bold {
                    out.extend(text::bold_on());
                }
                out.extend(cp437::encode(content));
                if *bold {
                    out.extend(text::bold_off());
                }
                out.extend(commands::line_feed());
            }

            PrintDirective::Rule => {
                out.extend(std::iter::repeat_n(b'-', config.chars_per_line as usize));
                out.extend(commands::line_feed());
            }

            PrintDirective::RasterImage(raster) => {
                encode_raster(&mut out, raster, config)?;
            }

            PrintDirective::Barcode {
                symbology,
                data,
                height,
            } => {
                encode_barcode(&mut out, symbology, data, *height)?;
            }

            PrintDirective::QrCode { data, size } => {
                encode_qr(&mut out, data, *size)?;
            }

            PrintDirective::LineFeed => out.extend(commands::line_feed()),

            PrintDirective::Cut => out.extend(commands::cut_partial_feed()),
        }
    }

    Ok(out)
}

/// Emit a raster bitmap, banded into [`MAX_RASTER_ROWS`]-row commands.
fn encode_raster(
    out: &mut Vec<u8>,
    raster: &RasterBitmap,
    config: &PrinterConfig,
) -> Result<(), EncodeError> {
    if raster.width() > config.dots_per_line as u32 {
        return Err(EncodeError::WidthMismatch {
            width: raster.width(),
            max: config.dots_per_line as u32,
        });
    }

    let row_bytes = RasterBitmap::row_bytes(raster.width());
    for band in raster.data().chunks(row_bytes * MAX_RASTER_ROWS) {
        let rows = band.len() / row_bytes;
        out.extend(graphics::raster(row_bytes as u16, rows as u16, band));
    }
    Ok(())
}

fn encode_barcode(
    out: &mut Vec<u8>,
    symbology: &str,
    data: &str,
    height: u8,
) -> Result<(), EncodeError> {
    match symbology {
        "ean13" => {
            if !(data.len() == 12 || data.len() == 13)
                || !data.bytes().all(|b| b.is_ascii_digit())
            {
                return Err(EncodeError::InvalidBarcode {
                    symbology: symbology.to_string(),
                    reason: "EAN-13 requires 12 or 13 digits".to_string(),
                });
            }
            out.extend(barcode1d::set_height(height));
            out.extend(barcode1d::set_module_width(BARCODE_MODULE_WIDTH));
            out.extend(barcode1d::set_hri_position(barcode1d::HriPosition::Below));
            out.extend(barcode1d::print(
                barcode1d::BarcodeType::Ean13,
                data.as_bytes(),
            ));
        }
        "code128" => {
            if data.is_empty() || !data.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
                return Err(EncodeError::InvalidBarcode {
                    symbology: symbology.to_string(),
                    reason: "CODE128 requires printable ASCII data".to_string(),
                });
            }
            out.extend(barcode1d::set_height(height));
            out.extend(barcode1d::set_module_width(BARCODE_MODULE_WIDTH));
            out.extend(barcode1d::set_hri_position(barcode1d::HriPosition::Below));
            out.extend(barcode1d::code128(data.as_bytes()));
        }
        // `<barcode type='qr'>` routes through the 2D path with defaults.
        "qr" => encode_qr(out, data, 4)?,
        other => return Err(EncodeError::UnsupportedSymbology(other.to_string())),
    }
    Ok(())
}

fn encode_qr(out: &mut Vec<u8>, data: &str, size: u8) -> Result<(), EncodeError> {
    if data.len() > MAX_QR_PAYLOAD {
        return Err(EncodeError::InvalidBarcode {
            symbology: "qr".to_string(),
            reason: format!("payload exceeds {MAX_QR_PAYLOAD} bytes"),
        });
    }
    // Requested module sizes outside the command's range are clamped rather
    // than rejected; markup in the field uses sizes like 20.
    let module = size.clamp(1, 16);

    out.extend(qr::select_model());
    out.extend(qr::set_module_size(module));
    out.extend(qr::set_error_correction(qr::QrErrorLevel::M));
    out.extend(qr::store_data(data.as_bytes()));
    out.extend(qr::print());
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::text::Alignment;
    use crate::render::raster::pack_row;

    fn config() -> PrinterConfig {
        PrinterConfig::GENERIC_58MM
    }

    fn text_directive(content: &str) -> PrintDirective {
        PrintDirective::AlignedText {
            align: Alignment::Left,
            bold: false,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_job_starts_with_init() {
        let job = PrintJob::new(vec![]);
        assert_eq!(encode(&job, &config()).unwrap(), vec![0x1B, 0x40]);
    }

    #[test]
    fn test_plain_text_line() {
        let job = PrintJob::new(vec![text_directive("hi")]);
        let bytes = encode(&job, &config()).unwrap();
        let expected = [
            0x1B, 0x40, // init
            0x1B, 0x61, 0x00, // align left
            b'h', b'i', 0x0A,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_bold_wraps_text() {
        let job = PrintJob::new(vec![PrintDirective::AlignedText {
            align: Alignment::Center,
            bold: true,
            content: "X".to_string(),
        }]);
        let bytes = encode(&job, &config()).unwrap();
        let expected = [
            0x1B, 0x40, // init
            0x1B, 0x61, 0x01, // align center
            0x1B, 0x45, 0x01, // bold on
            b'X',
            0x1B, 0x45, 0x00, // bold off
            0x0A,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_rule_uses_chars_per_line() {
        let job = PrintJob::new(vec![PrintDirective::Rule]);
        let bytes = encode(&job, &config()).unwrap();
        let dashes = &bytes[2..bytes.len() - 1];
        assert_eq!(dashes.len(), 32);
        assert!(dashes.iter().all(|&b| b == b'-'));
        assert_eq!(*bytes.last().unwrap(), 0x0A);
    }

    #[test]
    fn test_raster_within_width() {
        let raster = RasterBitmap::from_packed(16, 2, vec![0xFF, 0x00, 0x0F, 0xF0]).unwrap();
        let job = PrintJob::new(vec![PrintDirective::RasterImage(raster)]);
        let bytes = encode(&job, &config()).unwrap();
        assert_eq!(
            &bytes[2..],
            &[0x1D, 0x76, 0x30, 0x00, 2, 0, 2, 0, 0xFF, 0x00, 0x0F, 0xF0]
        );
    }

    #[test]
    fn test_raster_too_wide_fails() {
        let width = 400u32;
        let data = vec![0u8; RasterBitmap::row_bytes(width) * 2];
        let raster = RasterBitmap::from_packed(width, 2, data).unwrap();
        let job = PrintJob::new(vec![PrintDirective::RasterImage(raster)]);
        let err = encode(&job, &config()).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::WidthMismatch {
                width: 400,
                max: 384
            }
        ));
    }

    #[test]
    fn test_tall_raster_is_banded() {
        let width = 8u32;
        let height = 600u32;
        let raster =
            RasterBitmap::from_packed(width, height, vec![0xAA; height as usize]).unwrap();
        let job = PrintJob::new(vec![PrintDirective::RasterImage(raster)]);
        let bytes = encode(&job, &config()).unwrap();

        // 600 rows split into 256 + 256 + 88.
        let headers: Vec<usize> = bytes
            .windows(4)
            .enumerate()
            .filter(|(_, w)| *w == [0x1D, 0x76, 0x30, 0x00])
            .map(|(i, _)| i)
            .collect();
        assert_eq!(headers.len(), 3);
        assert_eq!(&bytes[headers[0] + 4..headers[0] + 8], &[1, 0, 0, 1]); // 256 rows
        assert_eq!(&bytes[headers[2] + 4..headers[2] + 8], &[1, 0, 88, 0]);
    }

    #[test]
    fn test_ean13_rejects_bad_data() {
        let job = PrintJob::new(vec![PrintDirective::Barcode {
            symbology: "ean13".to_string(),
            data: "12345".to_string(),
            height: 64,
        }]);
        assert!(matches!(
            encode(&job, &config()).unwrap_err(),
            EncodeError::InvalidBarcode { .. }
        ));
    }

    #[test]
    fn test_unsupported_symbology() {
        let job = PrintJob::new(vec![PrintDirective::Barcode {
            symbology: "pdf417".to_string(),
            data: "x".to_string(),
            height: 64,
        }]);
        let err = encode(&job, &config()).unwrap_err();
        assert!(matches!(err, EncodeError::UnsupportedSymbology(s) if s == "pdf417"));
    }

    #[test]
    fn test_qr_size_clamped() {
        let job = PrintJob::new(vec![PrintDirective::QrCode {
            data: "x".to_string(),
            size: 20,
        }]);
        let bytes = encode(&job, &config()).unwrap();
        // Module size command carries the clamped value 16.
        let pos = bytes
            .windows(7)
            .position(|w| w == [0x1D, 0x28, 0x6B, 3, 0, 49, 67])
            .unwrap();
        assert_eq!(bytes[pos + 7], 16);
    }

    #[test]
    fn test_cut_opcode() {
        let job = PrintJob::new(vec![PrintDirective::Cut]);
        let bytes = encode(&job, &config()).unwrap();
        assert_eq!(&bytes[2..], &[0x1D, 0x56, 0x42, 0x00]);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let job = PrintJob::new(vec![
            text_directive("Item A        10.00"),
            PrintDirective::Rule,
            PrintDirective::QrCode {
                data: "https://example.com".to_string(),
                size: 4,
            },
        ]);
        assert_eq!(
            encode(&job, &config()).unwrap(),
            encode(&job, &config()).unwrap()
        );
    }
}
