//! # Printer Transport Layer
//!
//! The platform seam. An [`Adapter`] is the local radio: it discovers,
//! bonds, and opens links. A [`Transport`] is one open link that accepts
//! chunks no larger than the profile's `chunk_limit`.
//!
//! ## Available Transports
//!
//! - [`bluetooth`]: RFCOMM tty device for classic Bluetooth printers (Linux)
//! - [`memory`]: recording adapter for dry runs and tests
//!
//! Adapters report asynchronous happenings (device found, bond changes,
//! write acknowledgments) by feeding
//! [`LinkEvent`](crate::connection::LinkEvent)s into
//! [`Session::handle_event`](crate::session::Session::handle_event).
//! Blocking calls (`open_link`, `write_chunk`, `close`) only ever run on the
//! session's worker thread.

pub mod bluetooth;
pub mod memory;

use crate::connection::{DeviceId, DiscoveredDevice};
use crate::error::{BonprintError, Result};
use crate::printer::PrinterProfile;

pub use bluetooth::{RfcommAdapter, RfcommTransport};
pub use memory::{MemoryAdapter, MemoryLog, MemoryTransport};

/// Whether the peer confirms each written chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkKind {
    /// Stream links (RFCOMM). A write is done once every chunk is issued.
    #[default]
    Unacknowledged,
    /// GATT write-with-response. A write is done once every chunk is confirmed.
    Acknowledged,
}

/// One open link to a printer.
pub trait Transport: Send {
    fn link_kind(&self) -> LinkKind;

    /// Write one chunk. Blocks until the platform accepted it.
    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// The local Bluetooth adapter.
pub trait Adapter: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// Ask the platform to power the adapter on. The result arrives later as
    /// an adapter state event.
    fn request_enable(&self) -> Result<()> {
        Err(BonprintError::Unsupported("enabling bluetooth".into()))
    }

    /// Whether this platform can run device discovery at all.
    fn supports_discovery(&self) -> bool {
        true
    }

    fn start_discovery(&self) -> Result<()> {
        Err(BonprintError::Unsupported("discovery".into()))
    }

    fn cancel_discovery(&self) -> Result<()> {
        Ok(())
    }

    /// Request pairing. The outcome arrives later as a bond state event.
    fn create_bond(&self, id: &DeviceId) -> Result<()>;

    /// Devices paired before the session started.
    fn bonded_devices(&self) -> Vec<DiscoveredDevice> {
        Vec::new()
    }

    /// Open a link to `device`. Blocking; called from the worker thread.
    fn open_link(
        &self,
        device: &DiscoveredDevice,
        profile: &PrinterProfile,
    ) -> Result<Box<dyn Transport>>;
}
