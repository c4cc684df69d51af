//! # Bluetooth RFCOMM Transport
//!
//! Communicates with ESC/POS printers over Bluetooth Serial Port Profile
//! (SPP) via RFCOMM.
//!
//! ## Bluetooth Setup (Linux)
//!
//! The printer must already be paired and bound to an RFCOMM device; pairing
//! is platform plumbing outside this library.
//!
//! ```bash
//! # 1. Pair with the printer
//! $ bluetoothctl
//! [bluetooth]# scan on
//! [bluetooth]# pair 00:11:22:XX:XX:XX
//!
//! # 2. Bind to an RFCOMM device
//! $ sudo rfcomm bind 0 00:11:22:XX:XX:XX
//! # This creates /dev/rfcomm0
//! ```
//!
//! ## TTY Configuration
//!
//! The RFCOMM device is opened in raw mode so binary data passes through
//! unmodified: no input/output processing, 8-bit characters, no echo, and
//! no XON/XOFF flow control, because 0x11 and 0x13 can
//! appear in packed raster data.
//!
//! ## Chunked Writes
//!
//! Large jobs are written in chunks with a small delay between them so the
//! printer's Bluetooth buffer is never overrun.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use super::{Connector, Transport};

/// Default chunk size for writes (bytes).
const CHUNK_SIZE: usize = 4096;

/// Delay between chunks (milliseconds).
const CHUNK_DELAY_MS: u64 = 2;

/// # RFCOMM Connector
///
/// Resolves a Bluetooth MAC address (or a literal device path) to an open
/// [`RfcommTransport`].
///
/// ## Example
///
/// ```no_run
/// use recibo::transport::{Connector, RfcommConnector};
///
/// # async fn open() -> std::io::Result<()> {
/// let connector = RfcommConnector::new();
/// let transport = connector.open("00:11:22:33:44:55").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct RfcommConnector;

impl RfcommConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for RfcommConnector {
    /// Open a transport for `address`.
    ///
    /// `address` is either a Bluetooth MAC (`XX:XX:XX:XX:XX:XX`), resolved
    /// through the kernel's RFCOMM binding table, or a device path such as
    /// `/dev/rfcomm0`.
    async fn open(&self, address: &str) -> io::Result<Box<dyn Transport>> {
        let address = address.to_string();
        // Device lookup and TTY configuration are blocking filesystem work.
        let transport = tokio::task::spawn_blocking(move || {
            let device = if is_valid_mac(&address) {
                find_rfcomm_for_mac(&address)?.ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("no RFCOMM device bound for {address}"),
                    )
                })?
            } else {
                address
            };
            RfcommTransport::open(device)
        })
        .await
        .map_err(|e| io::Error::other(format!("open task failed: {e}")))??;

        Ok(Box::new(transport))
    }
}

/// # RFCOMM Transport
///
/// An open raw-mode RFCOMM device with chunked writes.
pub struct RfcommTransport {
    file: Option<File>,
    device: String,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl RfcommTransport {
    /// Open and raw-configure an RFCOMM device path.
    pub fn open(device: impl Into<String>) -> io::Result<Self> {
        let device = device.into();
        let file = OpenOptions::new().write(true).open(&device)?;
        configure_tty_raw(file.as_raw_fd())?;

        tracing::debug!("opened {device} in raw mode");
        Ok(Self {
            file: Some(file),
            device,
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
        })
    }

    /// Set the chunk size for large writes. Larger chunks are faster but may
    /// overrun the printer's Bluetooth buffer.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// Set the delay between chunks.
    pub fn set_chunk_delay(&mut self, delay: Duration) {
        self.chunk_delay = delay;
    }
}

#[async_trait]
impl Transport for RfcommTransport {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let Some(file) = &self.file else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "transport closed",
            ));
        };
        let mut file = file.try_clone()?;
        let data = data.to_vec();
        let chunk_size = self.chunk_size;
        let chunk_delay = self.chunk_delay;

        // The chunk delays are real sleeps; keep them off the async workers.
        tokio::task::spawn_blocking(move || {
            for chunk in data.chunks(chunk_size) {
                file.write_all(chunk)?;
                if !chunk_delay.is_zero() {
                    std::thread::sleep(chunk_delay);
                }
            }
            file.flush()
        })
        .await
        .map_err(|e| io::Error::other(format!("write task failed: {e}")))?
    }

    async fn close(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            tracing::debug!("closing {}", self.device);
            file.flush()?;
        }
        Ok(())
    }
}

/// Validate a Bluetooth MAC address format (`XX:XX:XX:XX:XX:XX`).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Find an existing RFCOMM device bound to the given MAC address.
///
/// Reads `/proc/net/rfcomm` (format: `rfcomm0: XX:XX:XX:XX:XX:XX channel N`)
/// and returns the device path if one exists.
#[cfg(unix)]
pub fn find_rfcomm_for_mac(mac: &str) -> io::Result<Option<String>> {
    let mac_upper = mac.to_uppercase();

    let Ok(contents) = fs::read_to_string("/proc/net/rfcomm") else {
        return Ok(None);
    };
    for line in contents.lines() {
        if line.to_uppercase().contains(&mac_upper) {
            if let Some(dev_name) = line.split(':').next() {
                let device_path = format!("/dev/{}", dev_name.trim());
                if Path::new(&device_path).exists() {
                    return Ok(Some(device_path));
                }
            }
        }
    }
    Ok(None)
}

#[cfg(not(unix))]
pub fn find_rfcomm_for_mac(_mac: &str) -> io::Result<Option<String>> {
    Ok(None)
}

/// Configure a file descriptor for raw TTY mode.
///
/// Disables all input/output processing so binary data passes through
/// unmodified. IXON/IXOFF/IXANY matter most: 0x11 (XON) and 0x13 (XOFF)
/// occur routinely in raster bytes and would otherwise be eaten by software
/// flow control.
#[cfg(unix)]
fn configure_tty_raw(fd: i32) -> io::Result<()> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_fd: i32) -> io::Result<()> {
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
