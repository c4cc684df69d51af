//! # Print Session Orchestrator
//!
//! Sequences the pipeline for one print job (preprocess, compile, encode,
//! write) against a single connection, and translates failures into an
//! observable status stream.
//!
//! ## Single-Flight Invariant
//!
//! Exactly one job may be on the wire per session. ESC/POS is a stateful
//! stream protocol: two jobs with interleaved writes would corrupt the
//! physical printout, so a `submit` while another job is in flight fails
//! with [`PrintError::JobInProgress`] instead of queueing.
//!
//! ## Failure Policy
//!
//! Any stage failure aborts the remaining stages; no bytes reach the wire
//! unless encoding succeeded, and the typed error kind survives alongside
//! the human-readable status message.

use std::sync::atomic::{AtomicBool, Ordering};

use image::DynamicImage;
use tokio::sync::watch;
use tracing::debug;

use crate::connection::{ConnectionManager, ConnectionState};
use crate::encoder;
use crate::error::{ConnectError, ImageError, PrintError, WriteError};
use crate::job::{PrintDirective, PrintJob};
use crate::markup::{self, CompileOptions};
use crate::render::preprocess;

/// Bytes per wire write. A job is written as ordered sequential chunks; the
/// single-flight guard keeps any other job from interleaving between them.
const WIRE_CHUNK: usize = 4096;

/// What to print.
pub enum JobSource {
    /// Markup text (may embed pre-encoded rasters, QR codes, barcodes).
    Markup(String),
    /// A decoded bitmap, preprocessed to the session's head width.
    Bitmap(DynamicImage),
}

/// One print request.
///
/// ```
/// use recibo::session::PrintRequest;
///
/// let request = PrintRequest::markup("[C]<b>TEST</b>").with_cut();
/// ```
pub struct PrintRequest {
    source: JobSource,
    cut: bool,
    image_optional: bool,
}

impl PrintRequest {
    /// Print formatted markup.
    pub fn markup(text: impl Into<String>) -> Self {
        Self {
            source: JobSource::Markup(text.into()),
            cut: false,
            image_optional: false,
        }
    }

    /// Print a single bitmap, resized and binarized for the head.
    pub fn bitmap(image: DynamicImage) -> Self {
        Self {
            source: JobSource::Bitmap(image),
            cut: false,
            image_optional: false,
        }
    }

    /// Feed and cut the paper after the job.
    pub fn with_cut(mut self) -> Self {
        self.cut = true;
        self
    }

    /// Skip empty embedded image payloads instead of failing the job.
    ///
    /// This is the partial-failure policy for product images fetched by the
    /// caller: when the fetch fails, the caller substitutes an empty
    /// `<img></img>` and the receipt prints without the picture.
    pub fn image_optional(mut self) -> Self {
        self.image_optional = true;
        self
    }
}

/// Orchestrates print jobs over one connection.
///
/// Owns the [`ConnectionManager`] for its session and publishes a
/// last-message status stream for presentation layers, mirroring the
/// connection state channel.
pub struct PrintSession {
    connection: ConnectionManager,
    in_flight: AtomicBool,
    message: watch::Sender<Option<String>>,
}

impl PrintSession {
    pub fn new(connection: ConnectionManager) -> Self {
        let (message, _) = watch::channel(None);
        Self {
            connection,
            in_flight: AtomicBool::new(false),
            message,
        }
    }

    /// The session's connection, for state observation.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Subscribe to human-readable status messages.
    pub fn messages(&self) -> watch::Receiver<Option<String>> {
        self.message.subscribe()
    }

    /// The most recent status message.
    pub fn last_message(&self) -> Option<String> {
        self.message.borrow().clone()
    }

    /// Connect to a printer, publishing the outcome as a status message.
    pub async fn connect(&self, address: &str) -> Result<(), ConnectError> {
        match self.connection.connect(address).await {
            Ok(()) => {
                self.publish(format!("Connected to {address}"));
                Ok(())
            }
            Err(err) => {
                self.publish(format!("Connection failed: {err}"));
                Err(err)
            }
        }
    }

    /// Disconnect, publishing a status message. Always ends in Idle.
    pub async fn disconnect(&self) {
        self.connection.disconnect().await;
        self.publish("Disconnected");
    }

    /// Run one print job through the full pipeline.
    ///
    /// Fails with [`PrintError::JobInProgress`] if another job is in flight
    /// on this session; with [`PrintError::ConnectionLost`] if the
    /// connection went away between this job's admission and its wire
    /// write (e.g. a disconnect raced it).
    pub async fn submit(&self, request: PrintRequest) -> Result<(), PrintError> {
        let _guard = self.begin_job()?;

        let result = self.run_job(request).await;
        match &result {
            Ok(()) => self.publish("Print success"),
            Err(err) => self.publish(format!("Print failed: {err}")),
        }
        result
    }

    async fn run_job(&self, request: PrintRequest) -> Result<(), PrintError> {
        if self.connection.state() != ConnectionState::Connected {
            return Err(PrintError::NotConnected);
        }
        let config = *self.connection.config();

        let job = match request.source {
            JobSource::Markup(text) => {
                let options = CompileOptions {
                    image_optional: request.image_optional,
                };
                markup::compile_with(&text, &options)?
            }
            JobSource::Bitmap(image) => {
                let width = config.dots_per_line as u32;
                // Multi-megapixel resizes take real CPU time; keep them off
                // the async workers.
                let raster = tokio::task::spawn_blocking(move || {
                    preprocess::resize_to_width(&image, width)
                })
                .await
                .map_err(|e| {
                    ImageError::InvalidImage(format!("resize task failed: {e}"))
                })??;
                PrintJob::new(vec![PrintDirective::RasterImage(raster)])
            }
        };
        let job = if request.cut { job.with_cut() } else { job };

        let bytes = encoder::encode(&job, &config)?;
        debug!("encoded job: {} directives, {} bytes", job.len(), bytes.len());

        // We verified Connected above, so a NotConnected from the wire means
        // the connection was torn down while this job was in flight.
        for chunk in bytes.chunks(WIRE_CHUNK) {
            self.connection
                .write_bytes(chunk)
                .await
                .map_err(|err| match err {
                    WriteError::NotConnected => PrintError::ConnectionLost,
                    other => other.into(),
                })?;
        }
        Ok(())
    }

    fn begin_job(&self) -> Result<JobGuard<'_>, PrintError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PrintError::JobInProgress);
        }
        Ok(JobGuard {
            in_flight: &self.in_flight,
        })
    }

    fn publish(&self, message: impl Into<String>) {
        self.message.send_replace(Some(message.into()));
    }
}

/// Clears the in-flight flag when the job resolves, success or failure.
struct JobGuard<'a> {
    in_flight: &'a AtomicBool,
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}
