//! # Printer Transport Layer
//!
//! The byte-stream seam between the connection manager and the wire.
//!
//! The core only requires an opaque reliable stream: something that can
//! write bytes and close. Bluetooth RFCOMM is the expected concrete binding
//! ([`bluetooth`]); tests supply in-memory implementations.
//!
//! ## Available Transports
//!
//! - [`bluetooth`]: Bluetooth RFCOMM/SPP (Linux)
//!
//! ## Future Transports
//!
//! - USB serial
//! - Network (TCP/IP)

pub mod bluetooth;

use async_trait::async_trait;

pub use bluetooth::RfcommConnector;

/// An open byte stream to a printer.
///
/// Implementations own the underlying device handle; the connection manager
/// holds the only long-lived reference and lends it out per write.
#[async_trait]
pub trait Transport: Send {
    /// Write the whole buffer to the device.
    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()>;

    /// Close the stream, releasing the device.
    async fn close(&mut self) -> std::io::Result<()>;
}

/// Opens a [`Transport`] for a device address.
///
/// The address format is binding-specific: a Bluetooth MAC for RFCOMM, a
/// host:port for a future network binding.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, address: &str) -> std::io::Result<Box<dyn Transport>>;
}
