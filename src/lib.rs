//! # Recibo - ESC/POS Receipt Printer Library
//!
//! Recibo drives thermal receipt printers speaking ESC/POS over a byte
//! stream (typically Bluetooth SPP). It provides:
//!
//! - **Markup compiler**: a line-tagged formatting language
//!   (`[L]`/`[C]`/`[R]`, `<b>`, `<img>`, `<qrcode>`, `<barcode>`) compiled
//!   into print directives
//! - **Command encoder**: deterministic translation of directives into
//!   ESC/POS opcodes
//! - **Raster pipeline**: resizing and binarizing arbitrary bitmaps
//!   (multi-megapixel photos included) for a narrow print head
//! - **Connection manager**: an observable transport lifecycle state machine
//! - **Print session**: single-flight job orchestration with typed errors
//!
//! ## Quick Start
//!
//! ```no_run
//! use recibo::{
//!     connection::ConnectionManager,
//!     printer::PrinterConfig,
//!     session::{PrintRequest, PrintSession},
//!     transport::RfcommConnector,
//! };
//!
//! # async fn print() -> Result<(), Box<dyn std::error::Error>> {
//! // One session per printer, configured at construction.
//! let connection = ConnectionManager::new(
//!     Box::new(RfcommConnector::new()),
//!     PrinterConfig::GENERIC_58MM,
//! );
//! let session = PrintSession::new(connection);
//!
//! // Connect and print a formatted receipt.
//! session.connect("00:11:22:33:44:55").await?;
//! session
//!     .submit(
//!         PrintRequest::markup(
//!             "[C]<b>TEST RECEIPT</b>\n\
//!              [L]Item A        [R]10.00\n\
//!              ---\n\
//!              [R]<b>Total: 10.00</b>",
//!         )
//!         .with_cut(),
//!     )
//!     .await?;
//! session.disconnect().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`markup`] | Markup compiler |
//! | [`job`] | Print directives (compiler output, encoder input) |
//! | [`encoder`] | Directive → ESC/POS byte encoding |
//! | [`protocol`] | ESC/POS opcode builders |
//! | [`render`] | Bitmap preprocessing and packed rasters |
//! | [`printer`] | Session configuration |
//! | [`connection`] | Transport lifecycle state machine |
//! | [`session`] | Print job orchestration |
//! | [`transport`] | Byte-stream backends |
//! | [`error`] | Error types |
//!
//! ## Concurrency Model
//!
//! Every connect, write, and submit is an `async fn`; the calling surface
//! never blocks. State is observable through watch channels
//! ([`connection::ConnectionState`] plus the session's status messages).
//! One job is in flight per session at a time; a concurrent submit fails
//! with [`error::PrintError::JobInProgress`] rather than interleaving byte
//! streams on the wire.

pub mod connection;
pub mod encoder;
pub mod error;
pub mod job;
pub mod markup;
pub mod printer;
pub mod protocol;
pub mod render;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use connection::{ConnectionManager, ConnectionState};
pub use error::PrintError;
pub use job::{PrintDirective, PrintJob};
pub use printer::PrinterConfig;
pub use render::RasterBitmap;
pub use session::{PrintRequest, PrintSession};
