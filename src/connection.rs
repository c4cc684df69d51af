//! # Connection Manager
//!
//! Owns the byte-stream transport and its lifecycle state machine.
//!
//! ## State Machine
//!
//! ```text
//!            connect            success
//!   Idle ───────────► Connecting ───────► Connected
//!    ▲                    │                   │
//!    │                    │ failure           │ disconnect,
//!    │                    ▼                   │ I/O failure
//!    ├──────────────── Failed(reason)         │
//!    │    disconnect                          │
//!    └────────────────────────────────────────┘
//! ```
//!
//! Transitions are one-directional except the return to Idle on explicit
//! disconnect. A `connect` while Connecting or Connected is rejected, never
//! queued, since a queued attempt could double-open the transport. `write_bytes`
//! outside Connected fails without touching the wire.
//!
//! The state is observable through a watch channel so a presentation layer
//! can react without polling.

use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::{ConnectError, WriteError};
use crate::printer::PrinterConfig;
use crate::transport::{Connector, Transport};

/// Default I/O timeout for connect and write operations.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle state of a printer connection.
///
/// Exactly one instance per session, owned and mutated only by
/// [`ConnectionManager`]; everything else observes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Failed(String),
}

/// Owns the transport and serializes access to it.
///
/// The manager instance stays usable after any failure: a failed or closed
/// connection can always be retried with another `connect`.
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    config: PrinterConfig,
    io_timeout: Duration,
    state: watch::Sender<ConnectionState>,
    transport: Mutex<Option<Box<dyn Transport>>>,
}

impl ConnectionManager {
    /// Create a manager for one printer session.
    ///
    /// `config` is fixed for the session's lifetime; its `dots_per_line` is
    /// the raster width every image in this session is prepared for.
    pub fn new(connector: Box<dyn Connector>, config: PrinterConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            connector,
            config,
            io_timeout: DEFAULT_IO_TIMEOUT,
            state,
            transport: Mutex::new(None),
        }
    }

    /// Override the I/O timeout applied to connect and write operations.
    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    /// The session configuration this connection was built with.
    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Open the transport for `address`.
    ///
    /// Rejected with `AlreadyConnecting`/`AlreadyConnected` when an attempt
    /// or a connection exists; the rejection leaves the state untouched.
    /// A failed attempt ends in `Failed(reason)`.
    pub async fn connect(&self, address: &str) -> Result<(), ConnectError> {
        // Atomic Idle/Failed -> Connecting transition; the closure runs
        // under the channel lock, so two racing connects cannot both pass.
        let mut rejection = None;
        self.state.send_if_modified(|state| match state {
            ConnectionState::Connecting => {
                rejection = Some(ConnectError::AlreadyConnecting);
                false
            }
            ConnectionState::Connected => {
                rejection = Some(ConnectError::AlreadyConnected);
                false
            }
            _ => {
                *state = ConnectionState::Connecting;
                true
            }
        });
        if let Some(err) = rejection {
            return Err(err);
        }

        info!("connecting to {address}");
        match timeout(self.io_timeout, self.connector.open(address)).await {
            Ok(Ok(transport)) => {
                *self.transport.lock().await = Some(transport);
                self.state.send_replace(ConnectionState::Connected);
                info!("connected to {address}");
                Ok(())
            }
            Ok(Err(err)) => {
                let reason = err.to_string();
                warn!("connection to {address} failed: {reason}");
                self.state
                    .send_replace(ConnectionState::Failed(reason.clone()));
                Err(ConnectError::DeviceUnreachable(reason))
            }
            Err(_) => {
                warn!("connection to {address} timed out");
                self.state
                    .send_replace(ConnectionState::Failed("connection timed out".into()));
                Err(ConnectError::Timeout)
            }
        }
    }

    /// Close the transport and return to Idle.
    ///
    /// Always ends in Idle: releasing the session must not be blocked by a
    /// close failure, so one is logged and swallowed.
    pub async fn disconnect(&self) {
        if let Some(mut transport) = self.transport.lock().await.take() {
            if let Err(err) = transport.close().await {
                warn!("transport close failed: {err}");
            }
        }
        self.state.send_replace(ConnectionState::Idle);
        info!("disconnected");
    }

    /// Write a byte buffer to the connected transport.
    ///
    /// Only valid in the Connected state; otherwise fails with
    /// `NotConnected` before any I/O. An I/O failure releases the transport
    /// and returns the state machine to Idle; a timeout transitions to
    /// Failed.
    pub async fn write_bytes(&self, buf: &[u8]) -> Result<(), WriteError> {
        if self.state() != ConnectionState::Connected {
            return Err(WriteError::NotConnected);
        }

        let mut guard = self.transport.lock().await;
        // A disconnect may have taken the transport while we waited.
        let Some(transport) = guard.as_mut() else {
            return Err(WriteError::NotConnected);
        };

        match timeout(self.io_timeout, transport.write_all(buf)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                warn!("write failed: {err}");
                *guard = None;
                self.state.send_replace(ConnectionState::Idle);
                Err(WriteError::Io(err))
            }
            Err(_) => {
                warn!("write timed out");
                *guard = None;
                self.state
                    .send_replace(ConnectionState::Failed("write timed out".into()));
                Err(WriteError::Timeout)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
//
// State machine behavior is covered end-to-end in tests/session_tests.rs
// with in-memory transports; only the plumbing that needs no transport is
// tested here.

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NeverConnector;

    #[async_trait]
    impl Connector for NeverConnector {
        async fn open(&self, _address: &str) -> std::io::Result<Box<dyn Transport>> {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such device",
            ))
        }
    }

    fn manager() -> ConnectionManager {
        ConnectionManager::new(Box::new(NeverConnector), PrinterConfig::GENERIC_58MM)
    }

    #[tokio::test]
    async fn test_initial_state_is_idle() {
        assert_eq!(manager().state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_failed_connect_transitions_to_failed() {
        let manager = manager();
        let err = manager.connect("00:11:22:33:44:55").await.unwrap_err();
        assert!(matches!(err, ConnectError::DeviceUnreachable(_)));
        assert!(matches!(manager.state(), ConnectionState::Failed(_)));
    }

    #[tokio::test]
    async fn test_failed_connection_can_be_retried() {
        let manager = manager();
        let _ = manager.connect("00:11:22:33:44:55").await;
        // A second attempt from Failed is allowed (and fails the same way).
        let err = manager.connect("00:11:22:33:44:55").await.unwrap_err();
        assert!(matches!(err, ConnectError::DeviceUnreachable(_)));
    }

    #[tokio::test]
    async fn test_write_when_idle_is_rejected() {
        let manager = manager();
        let err = manager.write_bytes(&[0x1B, 0x40]).await.unwrap_err();
        assert!(matches!(err, WriteError::NotConnected));
        assert_eq!(manager.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_disconnect_from_idle_is_harmless() {
        let manager = manager();
        manager.disconnect().await;
        assert_eq!(manager.state(), ConnectionState::Idle);
    }
}
