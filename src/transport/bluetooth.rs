//! # Bluetooth RFCOMM Transport
//!
//! Classic Bluetooth printers speak the Serial Port Profile. On Linux the
//! kernel exposes a bound RFCOMM channel as a tty (`/dev/rfcommN`), so a
//! link is just a raw-mode file.
//!
//! ## Bluetooth Setup (Linux)
//!
//! The printer must be paired before use; this backend does not bond:
//!
//! ```bash
//! $ bluetoothctl
//! [bluetooth]# scan on
//! [bluetooth]# pair 66:22:B3:1C:07:9A
//! ```
//!
//! [`RfcommAdapter::open_link`] then reuses an existing binding for the MAC
//! or creates one with `rfcomm bind` (needs root).
//!
//! ## TTY Configuration
//!
//! The device is opened in raw mode so ESC/POS bytes pass unmodified:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, etc. cleared
//! - **No output processing**: OPOST cleared (no CR/LF translation)
//! - **8-bit characters**: CS8, no parity
//! - **No echo, non-canonical**: ECHO, ECHONL, ICANON cleared

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::{Adapter, LinkKind, Transport};
use crate::connection::{DeviceId, DiscoveredDevice, is_valid_mac};
use crate::error::{BonprintError, Result};
use crate::printer::PrinterProfile;
use crate::printer::config::MAJOR_CLASS_IMAGING;

/// An open RFCOMM tty.
pub struct RfcommTransport {
    file: File,
    chunk_delay: Duration,
}

impl RfcommTransport {
    /// Open an RFCOMM device such as `/dev/rfcomm0` in raw mode.
    ///
    /// Fails if the device is missing, permission is denied (root or the
    /// dialout group is usually required) or the tty cannot be configured.
    #[instrument(skip(profile), fields(profile = %profile.name))]
    pub fn open<P: AsRef<Path> + std::fmt::Debug>(
        device: P,
        profile: &PrinterProfile,
    ) -> Result<Self> {
        let path = device.as_ref();

        let file = OpenOptions::new().write(true).open(path).map_err(|e| {
            BonprintError::transport(format!("failed to open {}: {}", path.display(), e))
        })?;

        configure_tty_raw(file.as_raw_fd())?;
        debug!("tty configured");

        Ok(Self {
            file,
            chunk_delay: Duration::from_millis(profile.chunk_delay_ms),
        })
    }
}

impl Transport for RfcommTransport {
    fn link_kind(&self) -> LinkKind {
        LinkKind::Unacknowledged
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.file
            .write_all(chunk)
            .map_err(|e| BonprintError::transport(format!("write failed: {}", e)))?;

        // Let the printer's small receive buffer drain between chunks
        if !self.chunk_delay.is_zero() {
            thread::sleep(self.chunk_delay);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.file
            .flush()
            .map_err(|e| BonprintError::transport(format!("flush failed: {}", e)))
    }
}

/// Adapter backed by BlueZ command-line tools.
///
/// Discovery is not available; the printer is given by MAC address and
/// registered as already bonded.
pub struct RfcommAdapter {
    channel: u8,
    known: Vec<DiscoveredDevice>,
}

impl RfcommAdapter {
    /// `channel` is the `N` in `/dev/rfcommN` used when a binding is created.
    pub fn new(channel: u8) -> Self {
        Self {
            channel,
            known: Vec::new(),
        }
    }

    /// Register a paired printer by MAC address.
    pub fn with_printer(mut self, mac: &str, name: impl Into<String>) -> Result<Self> {
        if !is_valid_mac(mac) {
            return Err(BonprintError::InvalidInput(format!(
                "invalid MAC address: {}",
                mac
            )));
        }
        self.known
            .push(DiscoveredDevice::new(mac, name, MAJOR_CLASS_IMAGING).bonded());
        Ok(self)
    }
}

impl Adapter for RfcommAdapter {
    fn is_enabled(&self) -> bool {
        fs::read_dir("/sys/class/bluetooth")
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
    }

    fn supports_discovery(&self) -> bool {
        false
    }

    fn create_bond(&self, id: &DeviceId) -> Result<()> {
        Err(BonprintError::Unsupported(format!(
            "pair {} with bluetoothctl first",
            id
        )))
    }

    fn bonded_devices(&self) -> Vec<DiscoveredDevice> {
        self.known.clone()
    }

    #[instrument(skip(self, device, profile), fields(device = %device.id))]
    fn open_link(
        &self,
        device: &DiscoveredDevice,
        profile: &PrinterProfile,
    ) -> Result<Box<dyn Transport>> {
        let mac = device.id.as_str();
        if !is_valid_mac(mac) {
            return Err(BonprintError::InvalidInput(format!(
                "invalid MAC address: {}",
                mac
            )));
        }

        let path = match find_rfcomm_for_mac(mac)? {
            Some(path) => {
                info!(path = %path, "reusing rfcomm binding");
                path
            }
            None => setup_rfcomm(mac, self.channel)?,
        };
        Ok(Box::new(RfcommTransport::open(&path, profile)?))
    }
}

/// Configure a file descriptor for raw TTY mode.
///
/// IXON/IXOFF/IXANY are cleared too: 0x11 and 0x13 occur in GBK text and
/// raster data and must not be eaten as XON/XOFF.
#[cfg(unix)]
fn configure_tty_raw(fd: i32) -> Result<()> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(BonprintError::transport(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
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

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(BonprintError::transport(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_fd: i32) -> Result<()> {
    Ok(())
}

// ============================================================================
// RFCOMM SETUP HELPERS
// ============================================================================

/// Device names (`rfcomm0`, ...) bound to `mac` in an `rfcomm -a` or
/// `/proc/net/rfcomm` listing.
fn bound_devices<'a>(listing: &'a str, mac: &str) -> Vec<&'a str> {
    let mac_upper = mac.to_uppercase();
    listing
        .lines()
        .filter(|line| line.to_uppercase().contains(&mac_upper))
        .filter_map(|line| line.split(':').next())
        .map(str::trim)
        .filter(|name| name.starts_with("rfcomm"))
        .collect()
}

fn first_existing(names: &[&str]) -> Option<String> {
    names
        .iter()
        .map(|name| format!("/dev/{}", name))
        .find(|path| Path::new(path).exists())
}

/// Find an existing RFCOMM device bound to the given MAC address.
///
/// Checks `/proc/net/rfcomm` and falls back to `rfcomm -a`.
#[cfg(unix)]
pub fn find_rfcomm_for_mac(mac: &str) -> Result<Option<String>> {
    if let Ok(contents) = fs::read_to_string("/proc/net/rfcomm") {
        if let Some(path) = first_existing(&bound_devices(&contents, mac)) {
            return Ok(Some(path));
        }
    }

    let output = Command::new("rfcomm")
        .arg("-a")
        .output()
        .map_err(|e| BonprintError::transport(format!("failed to run 'rfcomm -a': {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(first_existing(&bound_devices(&stdout, mac)))
}

#[cfg(not(unix))]
pub fn find_rfcomm_for_mac(_mac: &str) -> Result<Option<String>> {
    Ok(None)
}

/// Connect to `mac` and bind it to `/dev/rfcomm<channel>`.
///
/// Runs `bluetoothctl connect`, `l2ping -c 1` and `rfcomm bind`.
/// **Requires root privileges** for the bind.
#[cfg(unix)]
#[instrument]
pub fn setup_rfcomm(mac: &str, channel: u8) -> Result<String> {
    let mac_upper = mac.to_uppercase();
    let device_path = format!("/dev/rfcomm{}", channel);

    // May fail when already connected; l2ping is the real check
    let output = Command::new("bluetoothctl")
        .arg("connect")
        .arg(&mac_upper)
        .output()
        .map_err(|e| BonprintError::transport(format!("failed to run bluetoothctl: {}", e)))?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.contains("Connection successful") || stdout.contains("already connected") {
        debug!("bluetoothctl connected");
    } else {
        warn!(output = %stdout.trim(), "bluetoothctl connect did not confirm");
    }

    thread::sleep(Duration::from_millis(500));

    let output = Command::new("l2ping")
        .arg("-c")
        .arg("1")
        .arg(&mac_upper)
        .output()
        .map_err(|e| BonprintError::transport(format!("failed to run l2ping: {}", e)))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BonprintError::transport(format!(
            "device {} not reachable: {}",
            mac_upper,
            stderr.trim()
        )));
    }

    let output = Command::new("rfcomm")
        .arg("bind")
        .arg(channel.to_string())
        .arg(&mac_upper)
        .arg("1") // SPP is on RFCOMM channel 1
        .output()
        .map_err(|e| BonprintError::transport(format!("failed to run rfcomm bind: {}", e)))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BonprintError::transport(format!(
            "rfcomm bind failed: {}",
            stderr.trim()
        )));
    }

    thread::sleep(Duration::from_millis(500));

    if !Path::new(&device_path).exists() {
        return Err(BonprintError::transport(format!(
            "device {} was not created",
            device_path
        )));
    }

    info!(path = %device_path, "rfcomm bound");
    Ok(device_path)
}

#[cfg(not(unix))]
pub fn setup_rfcomm(_mac: &str, _channel: u8) -> Result<String> {
    Err(BonprintError::Unsupported(
        "RFCOMM setup on this platform".to_string(),
    ))
}

// ============================================================================
// TESTS
// ============================================================================
