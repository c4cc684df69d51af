//! # Session and Connection Tests
//!
//! Drives the connection state machine and the print orchestrator end to
//! end over in-memory transports. Tests run on a current-thread runtime
//! with paused time, so interleavings at await points are deterministic and
//! timeouts elapse instantly.

use std::io;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, Rgba, RgbaImage};

use recibo::connection::{ConnectionManager, ConnectionState};
use recibo::encoder;
use recibo::error::{ConnectError, PrintError};
use recibo::markup;
use recibo::printer::PrinterConfig;
use recibo::render::RasterBitmap;
use recibo::session::{PrintRequest, PrintSession};
use recibo::transport::{Connector, Transport};

const MAC: &str = "00:11:22:33:44:55";

// ============================================================================
// IN-MEMORY TRANSPORT
// ============================================================================

/// Everything the mock wire records, shared between test and transport.
#[derive(Clone, Default)]
struct Wire {
    writes: Arc<StdMutex<Vec<Vec<u8>>>>,
    writes_started: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Wire {
    fn concat(&self) -> Vec<u8> {
        self.writes.lock().unwrap().concat()
    }

    fn writes_started(&self) -> usize {
        self.writes_started.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
struct MockConnector {
    wire: Wire,
    connect_delay: Duration,
    write_delay: Duration,
    /// Fail the nth write (0-based) with BrokenPipe.
    fail_nth_write: Option<usize>,
    fail_close: bool,
}

struct MockTransport {
    wire: Wire,
    write_delay: Duration,
    fail_nth_write: Option<usize>,
    fail_close: bool,
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, _address: &str) -> io::Result<Box<dyn Transport>> {
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        Ok(Box::new(MockTransport {
            wire: self.wire.clone(),
            write_delay: self.write_delay,
            fail_nth_write: self.fail_nth_write,
            fail_close: self.fail_close,
        }))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let n = self.wire.writes_started.fetch_add(1, Ordering::SeqCst);
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        if self.fail_nth_write == Some(n) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "wire broke"));
        }
        self.wire.writes.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.wire.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(io::Error::new(io::ErrorKind::Other, "close failed"));
        }
        Ok(())
    }
}

fn session_with(connector: MockConnector) -> (Arc<PrintSession>, Wire) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let wire = connector.wire.clone();
    let connection =
        ConnectionManager::new(Box::new(connector), PrinterConfig::GENERIC_58MM);
    (Arc::new(PrintSession::new(connection)), wire)
}

fn black_bitmap(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])))
}

/// A solid raster wide and tall enough to span several wire chunks.
fn tall_raster() -> RasterBitmap {
    let width = 384u32;
    let height = 600u32;
    let data = vec![0xFFu8; RasterBitmap::row_bytes(width) * height as usize];
    RasterBitmap::from_packed(width, height, data).unwrap()
}

// ============================================================================
// CONNECTION STATE MACHINE
// ============================================================================

#[tokio::test]
async fn connect_reaches_connected() {
    let (session, _) = session_with(MockConnector::default());
    session.connect(MAC).await.unwrap();
    assert_eq!(session.connection().state(), ConnectionState::Connected);
    assert_eq!(session.last_message(), Some(format!("Connected to {MAC}")));
}

#[tokio::test]
async fn second_connect_while_connected_is_rejected() {
    let (session, _) = session_with(MockConnector::default());
    session.connect(MAC).await.unwrap();

    let err = session.connect(MAC).await.unwrap_err();
    assert!(matches!(err, ConnectError::AlreadyConnected));
    // The rejection leaves the connection untouched.
    assert_eq!(session.connection().state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn concurrent_connect_is_rejected_while_connecting() {
    let (session, _) = session_with(MockConnector {
        connect_delay: Duration::from_millis(50),
        ..Default::default()
    });

    let (first, second) = tokio::join!(session.connect(MAC), session.connect(MAC));

    first.unwrap();
    assert!(matches!(second.unwrap_err(), ConnectError::AlreadyConnecting));
    assert_eq!(session.connection().state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn connect_timeout_transitions_to_failed() {
    let (session, _) = session_with(MockConnector {
        connect_delay: Duration::from_secs(60),
        ..Default::default()
    });

    let err = session.connect(MAC).await.unwrap_err();
    assert!(matches!(err, ConnectError::Timeout));
    assert!(matches!(
        session.connection().state(),
        ConnectionState::Failed(_)
    ));
}

#[tokio::test]
async fn disconnect_returns_to_idle_and_closes_transport() {
    let (session, wire) = session_with(MockConnector::default());
    session.connect(MAC).await.unwrap();

    session.disconnect().await;
    assert_eq!(session.connection().state(), ConnectionState::Idle);
    assert_eq!(wire.closes(), 1);
    assert_eq!(session.last_message(), Some("Disconnected".to_string()));
}

#[tokio::test]
async fn disconnect_swallows_close_failure() {
    let (session, wire) = session_with(MockConnector {
        fail_close: true,
        ..Default::default()
    });
    session.connect(MAC).await.unwrap();

    // Best-effort release: the close error is logged, not surfaced, and the
    // state machine still ends Idle.
    session.disconnect().await;
    assert_eq!(session.connection().state(), ConnectionState::Idle);
    assert_eq!(wire.closes(), 1);
}

#[tokio::test]
async fn session_is_reusable_after_disconnect() {
    let (session, wire) = session_with(MockConnector::default());
    session.connect(MAC).await.unwrap();
    session.disconnect().await;

    session.connect(MAC).await.unwrap();
    session
        .submit(PrintRequest::markup("[C]again"))
        .await
        .unwrap();
    assert!(!wire.concat().is_empty());
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

#[tokio::test]
async fn submit_writes_one_contiguous_stream() {
    let (session, wire) = session_with(MockConnector::default());
    session.connect(MAC).await.unwrap();

    let markup_text = "[C]<b>TEST</b>\n[L]Item A        [R]10.00";
    session
        .submit(PrintRequest::markup(markup_text))
        .await
        .unwrap();

    let job = markup::compile(markup_text).unwrap();
    let expected = encoder::encode(&job, &PrinterConfig::GENERIC_58MM).unwrap();
    assert_eq!(wire.concat(), expected);
    assert_eq!(session.last_message(), Some("Print success".to_string()));
}

#[tokio::test]
async fn submit_without_connection_fails_before_io() {
    let (session, wire) = session_with(MockConnector::default());

    let err = session
        .submit(PrintRequest::markup("[C]x"))
        .await
        .unwrap_err();
    assert!(matches!(err, PrintError::NotConnected));
    assert_eq!(wire.writes_started(), 0);
}

#[tokio::test]
async fn markup_error_aborts_before_any_write() {
    let (session, wire) = session_with(MockConnector::default());
    session.connect(MAC).await.unwrap();

    let err = session
        .submit(PrintRequest::markup("[C]ok\n<xyz>bad</xyz>"))
        .await
        .unwrap_err();
    assert!(matches!(err, PrintError::Markup(_)));
    // The first (valid) line must not have been partially written.
    assert_eq!(wire.writes_started(), 0);
    assert!(session.connection().state() == ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn concurrent_submit_fails_with_job_in_progress() {
    let (session, wire) = session_with(MockConnector {
        write_delay: Duration::from_millis(20),
        ..Default::default()
    });
    session.connect(MAC).await.unwrap();

    let markup_text = "[C]<b>RECEIPT</b>";
    let (first, second) = tokio::join!(
        session.submit(PrintRequest::markup(markup_text)),
        session.submit(PrintRequest::markup("[C]interloper"))
    );

    first.unwrap();
    assert!(matches!(second.unwrap_err(), PrintError::JobInProgress));

    // The wire saw exactly the first job, uninterrupted.
    let job = markup::compile(markup_text).unwrap();
    let expected = encoder::encode(&job, &PrinterConfig::GENERIC_58MM).unwrap();
    assert_eq!(wire.concat(), expected);
}

#[tokio::test]
async fn session_usable_after_job_error() {
    let (session, _) = session_with(MockConnector::default());
    session.connect(MAC).await.unwrap();

    let err = session
        .submit(PrintRequest::markup("<nope>"))
        .await
        .unwrap_err();
    assert!(matches!(err, PrintError::Markup(_)));

    // The failed job released the single-flight guard.
    session.submit(PrintRequest::markup("[C]ok")).await.unwrap();
}

#[tokio::test]
async fn bitmap_job_is_resized_and_rastered() {
    let (session, wire) = session_with(MockConnector::default());
    session.connect(MAC).await.unwrap();

    session
        .submit(PrintRequest::bitmap(black_bitmap(6000, 4000)).with_cut())
        .await
        .unwrap();

    let bytes = wire.concat();
    // init, then the first raster band: 48 bytes wide, 256 rows.
    assert_eq!(&bytes[..2], &[0x1B, 0x40]);
    assert_eq!(&bytes[2..10], &[0x1D, 0x76, 0x30, 0x00, 48, 0, 0, 1]);
    // 384x256 image in 256-row bands: exactly one band, then the cut.
    assert!(bytes.ends_with(&[0x1D, 0x56, 0x42, 0x00]));
    let data_len = 48 * 256;
    assert_eq!(bytes.len(), 2 + 8 + data_len + 4);
}

#[tokio::test]
async fn zero_area_bitmap_fails_with_invalid_image() {
    let (session, wire) = session_with(MockConnector::default());
    session.connect(MAC).await.unwrap();

    let empty = DynamicImage::new_rgba8(0, 10);
    let err = session
        .submit(PrintRequest::bitmap(empty))
        .await
        .unwrap_err();
    assert!(matches!(err, PrintError::Image(_)));
    assert_eq!(wire.writes_started(), 0);
}

#[tokio::test]
async fn optional_image_request_prints_without_picture() {
    let (session, wire) = session_with(MockConnector::default());
    session.connect(MAC).await.unwrap();

    session
        .submit(
            PrintRequest::markup("[C]<b>PRODUCT</b>\n[C]<img></img>\n[C]Price: 9.99")
                .image_optional(),
        )
        .await
        .unwrap();

    let bytes = wire.concat();
    // No raster opcode anywhere in the stream.
    assert!(!bytes.windows(4).any(|w| w == [0x1D, 0x76, 0x30, 0x00]));
    assert!(bytes.windows(7).any(|w| w == b"PRODUCT"));
}

// ============================================================================
// WIRE FAILURES
// ============================================================================

#[tokio::test]
async fn io_failure_mid_write_returns_connection_to_idle() {
    let (session, _) = session_with(MockConnector {
        fail_nth_write: Some(0),
        ..Default::default()
    });
    session.connect(MAC).await.unwrap();

    let err = session
        .submit(PrintRequest::markup("[C]doomed"))
        .await
        .unwrap_err();
    assert!(matches!(err, PrintError::Io(_)));
    assert_eq!(session.connection().state(), ConnectionState::Idle);

    // Recoverable: reconnect and print again.
    session.connect(MAC).await.unwrap();
    session.submit(PrintRequest::markup("[C]ok")).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn write_timeout_fails_job_and_connection() {
    let (session, _) = session_with(MockConnector {
        write_delay: Duration::from_secs(60),
        ..Default::default()
    });
    session.connect(MAC).await.unwrap();

    let err = session
        .submit(PrintRequest::markup("[C]slow"))
        .await
        .unwrap_err();
    assert!(matches!(err, PrintError::Timeout));
    assert!(matches!(
        session.connection().state(),
        ConnectionState::Failed(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn disconnect_mid_job_fails_it_with_connection_lost() {
    let (session, wire) = session_with(MockConnector {
        write_delay: Duration::from_millis(10),
        ..Default::default()
    });
    session.connect(MAC).await.unwrap();

    // A job large enough to need several sequential wire writes.
    let markup_text = format!("[C]<img>{}</img>", tall_raster().to_hex());
    let submit = tokio::spawn({
        let session = session.clone();
        async move { session.submit(PrintRequest::markup(markup_text)).await }
    });

    // Wait until the first chunk is on the wire, then pull the plug. The
    // disconnect queues behind the in-progress chunk write and wins the
    // transport before the next one.
    while wire.writes_started() == 0 {
        tokio::task::yield_now().await;
    }
    session.disconnect().await;

    let err = submit.await.unwrap().unwrap_err();
    assert!(matches!(err, PrintError::ConnectionLost));
    assert_eq!(session.connection().state(), ConnectionState::Idle);
}
