//! # Error Types
//!
//! One error enum per failure domain. Every component reports typed results
//! to its caller; [`PrintError`] is the orchestrator-level union that
//! preserves the originating kind through `#[from]` conversions, so callers
//! (and tests) can match on the failure category rather than string contents.

use thiserror::Error;

/// Connection lifecycle failures.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// `connect()` called while a connection attempt is already underway.
    #[error("connection attempt already in progress")]
    AlreadyConnecting,

    /// `connect()` called while a transport is already open.
    #[error("already connected")]
    AlreadyConnected,

    /// The device could not be reached or the transport failed to open.
    #[error("device unreachable: {0}")]
    DeviceUnreachable(String),

    /// The connection attempt did not complete within the I/O timeout.
    #[error("connection timed out")]
    Timeout,
}

/// Failures while writing to an open connection.
#[derive(Debug, Error)]
pub enum WriteError {
    /// `write_bytes()` called while not in the Connected state.
    /// No I/O was attempted.
    #[error("not connected")]
    NotConnected,

    /// The write did not complete within the I/O timeout.
    #[error("write timed out")]
    Timeout,

    /// Transport-level I/O failure. The transport has been released and
    /// the state machine returned to Idle.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

/// Image preprocessing failures.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Zero-area, malformed, or undecodable source image or raster payload.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Markup compilation failures.
///
/// Formatting errors are surfaced, never swallowed: silently dropping a tag
/// would print a wrong physical receipt.
#[derive(Debug, Error)]
pub enum MarkupError {
    /// A tag that is not part of the grammar, or a recognized tag with
    /// malformed attributes.
    #[error("unknown tag: <{0}>")]
    UnknownTag(String),

    /// An inline tag with no matching close tag on the same line.
    #[error("unterminated tag: <{0}>")]
    UnterminatedTag(String),

    /// An embedded `<img>` payload that could not be decoded.
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Command encoding failures.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A raster directive wider than the print head.
    #[error("raster width {width} exceeds printer width {max}")]
    WidthMismatch { width: u32, max: u32 },

    /// A barcode symbology outside the supported set (EAN13, CODE128, QR).
    #[error("unsupported symbology: {0}")]
    UnsupportedSymbology(String),

    /// Barcode data that the symbology cannot encode.
    #[error("invalid {symbology} barcode: {reason}")]
    InvalidBarcode { symbology: String, reason: String },
}

/// Print job failures, as reported by the orchestrator.
///
/// All kinds are recoverable: the session stays usable after any of them.
#[derive(Debug, Error)]
pub enum PrintError {
    /// A job is already in flight on this session. Jobs are never queued or
    /// interleaved; retry after the current job resolves.
    #[error("a print job is already in progress")]
    JobInProgress,

    /// The session is not connected.
    #[error("printer not connected")]
    NotConnected,

    /// The connection was closed while this job was on the wire.
    #[error("connection lost during print")]
    ConnectionLost,

    /// The wire write did not complete within the I/O timeout.
    #[error("print timed out")]
    Timeout,

    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Transport-level I/O failure mid-write.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<WriteError> for PrintError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::NotConnected => PrintError::NotConnected,
            WriteError::Timeout => PrintError::Timeout,
            WriteError::Io(e) => PrintError::Io(e),
        }
    }
}
