//! In-memory adapter that records everything written to it.
//!
//! Used by the session tests. Links open instantly; failures can be
//! injected per adapter, and paced links hold each write until the test
//! releases it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use super::{Adapter, LinkKind, Transport};
use crate::connection::{DeviceId, DiscoveredDevice};
use crate::error::{BonprintError, Result};
use crate::printer::PrinterProfile;

/// How long a paced write waits for [`MemoryLog::release`].
const PACE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct Recorded {
    chunks: Vec<Vec<u8>>,
    opened: Vec<DeviceId>,
    closed: Vec<DeviceId>,
    bonds: Vec<DeviceId>,
    enable_requests: usize,
    discovery_starts: usize,
    discovery_cancels: usize,
    /// Writes a paced link may still make.
    permits: usize,
}

/// Shared record of adapter activity. Clones observe the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    inner: Arc<(Mutex<Recorded>, Condvar)>,
}

impl MemoryLog {
    fn record(&self, f: impl FnOnce(&mut Recorded)) {
        let (lock, changed) = &*self.inner;
        f(&mut lock.lock());
        changed.notify_all();
    }

    /// Every chunk written so far, in order.
    pub fn chunks(&self) -> Vec<Vec<u8>> {
        self.inner.0.lock().chunks.clone()
    }

    /// All written bytes concatenated.
    pub fn bytes(&self) -> Vec<u8> {
        self.inner.0.lock().chunks.concat()
    }

    pub fn opened(&self) -> Vec<DeviceId> {
        self.inner.0.lock().opened.clone()
    }

    pub fn closed(&self) -> Vec<DeviceId> {
        self.inner.0.lock().closed.clone()
    }

    pub fn bond_requests(&self) -> Vec<DeviceId> {
        self.inner.0.lock().bonds.clone()
    }

    pub fn enable_requests(&self) -> usize {
        self.inner.0.lock().enable_requests
    }

    pub fn discovery_starts(&self) -> usize {
        self.inner.0.lock().discovery_starts
    }

    pub fn discovery_cancels(&self) -> usize {
        self.inner.0.lock().discovery_cancels
    }

    /// Let a paced link make `count` more writes.
    pub fn release(&self, count: usize) {
        self.record(|r| r.permits += count);
    }

    fn take_permit(&self, timeout: Duration) -> bool {
        let (lock, changed) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut recorded = lock.lock();
        while recorded.permits == 0 {
            if changed.wait_until(&mut recorded, deadline).timed_out() && recorded.permits == 0 {
                return false;
            }
        }
        recorded.permits -= 1;
        true
    }

    /// Block until at least `count` chunks were written or `timeout` passes.
    pub fn wait_for_chunks(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |r| r.chunks.len() >= count)
    }

    /// Block until `chunk` was written or `timeout` passes.
    pub fn wait_for_chunk(&self, chunk: &[u8], timeout: Duration) -> bool {
        self.wait_until(timeout, |r| r.chunks.iter().any(|c| c.as_slice() == chunk))
    }

    /// Block until at least `count` links were closed or `timeout` passes.
    pub fn wait_for_closes(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |r| r.closed.len() >= count)
    }

    fn wait_until(&self, timeout: Duration, done: impl Fn(&Recorded) -> bool) -> bool {
        let (lock, changed) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut recorded = lock.lock();
        while !done(&recorded) {
            if changed.wait_until(&mut recorded, deadline).timed_out() {
                return done(&recorded);
            }
        }
        true
    }
}

/// Adapter whose links write into a [`MemoryLog`].
#[derive(Debug)]
pub struct MemoryAdapter {
    log: MemoryLog,
    enabled: bool,
    discovery: bool,
    kind: LinkKind,
    bonded: Vec<DiscoveredDevice>,
    open_failure: Option<String>,
    fail_chunk: Option<usize>,
    paced: bool,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self {
            log: MemoryLog::default(),
            enabled: true,
            discovery: true,
            kind: LinkKind::Unacknowledged,
            bonded: Vec::new(),
            open_failure: None,
            fail_chunk: None,
            paced: false,
        }
    }

    /// Links wait for `WriteConfirmed` events, like GATT writes.
    pub fn acknowledged(mut self) -> Self {
        self.kind = LinkKind::Acknowledged;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn without_discovery(mut self) -> Self {
        self.discovery = false;
        self
    }

    pub fn with_bonded(mut self, device: DiscoveredDevice) -> Self {
        self.bonded.push(device.bonded());
        self
    }

    /// Every `open_link` fails with `reason`.
    pub fn fail_open(mut self, reason: impl Into<String>) -> Self {
        self.open_failure = Some(reason.into());
        self
    }

    /// The chunk with this zero-based index on each link fails to write.
    pub fn fail_chunk(mut self, index: usize) -> Self {
        self.fail_chunk = Some(index);
        self
    }

    /// Each write waits for a permit from [`MemoryLog::release`].
    pub fn paced(mut self) -> Self {
        self.paced = true;
        self
    }

    pub fn log(&self) -> MemoryLog {
        self.log.clone()
    }
}

impl Adapter for MemoryAdapter {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn request_enable(&self) -> Result<()> {
        self.log.record(|r| r.enable_requests += 1);
        Ok(())
    }

    fn supports_discovery(&self) -> bool {
        self.discovery
    }

    fn start_discovery(&self) -> Result<()> {
        if !self.discovery {
            return Err(BonprintError::Unsupported("discovery".into()));
        }
        self.log.record(|r| r.discovery_starts += 1);
        Ok(())
    }

    fn cancel_discovery(&self) -> Result<()> {
        self.log.record(|r| r.discovery_cancels += 1);
        Ok(())
    }

    fn create_bond(&self, id: &DeviceId) -> Result<()> {
        self.log.record(|r| r.bonds.push(id.clone()));
        Ok(())
    }

    fn bonded_devices(&self) -> Vec<DiscoveredDevice> {
        self.bonded.clone()
    }

    fn open_link(
        &self,
        device: &DiscoveredDevice,
        _profile: &PrinterProfile,
    ) -> Result<Box<dyn Transport>> {
        if let Some(reason) = &self.open_failure {
            return Err(BonprintError::transport(reason.clone()));
        }
        debug!(device = %device.id, kind = ?self.kind, "memory link opened");
        self.log.record(|r| r.opened.push(device.id.clone()));
        Ok(Box::new(MemoryTransport {
            id: device.id.clone(),
            kind: self.kind,
            log: self.log.clone(),
            written: 0,
            fail_chunk: self.fail_chunk,
            paced: self.paced,
        }))
    }
}

/// One link opened by a [`MemoryAdapter`].
#[derive(Debug)]
pub struct MemoryTransport {
    id: DeviceId,
    kind: LinkKind,
    log: MemoryLog,
    written: usize,
    fail_chunk: Option<usize>,
    paced: bool,
}

impl Transport for MemoryTransport {
    fn link_kind(&self) -> LinkKind {
        self.kind
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        if self.paced && !self.log.take_permit(PACE_TIMEOUT) {
            return Err(BonprintError::transport("paced write never released"));
        }
        if self.fail_chunk == Some(self.written) {
            return Err(BonprintError::transport(format!(
                "injected failure at chunk {}",
                self.written
            )));
        }
        self.written += 1;
        let chunk = chunk.to_vec();
        self.log.record(|r| r.chunks.push(chunk));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let id = self.id.clone();
        self.log.record(|r| r.closed.push(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn open(adapter: &MemoryAdapter) -> Box<dyn Transport> {
        let device = DiscoveredDevice::new("A", "Printer", 0x0600);
        adapter.open_link(&device, &PrinterProfile::default()).unwrap()
    }

    #[test]
    fn test_records_chunks_and_close() {
        let adapter = MemoryAdapter::new();
        let log = adapter.log();
        let mut link = open(&adapter);
        link.write_chunk(b"ab").unwrap();
        link.write_chunk(b"c").unwrap();
        link.close().unwrap();

        assert_eq!(log.chunks(), vec![b"ab".to_vec(), b"c".to_vec()]);
        assert_eq!(log.bytes(), b"abc".to_vec());
        assert_eq!(log.opened(), vec![DeviceId::from("A")]);
        assert_eq!(log.closed(), vec![DeviceId::from("A")]);
        assert!(log.wait_for_chunks(2, Duration::ZERO));
        assert!(!log.wait_for_chunks(3, Duration::from_millis(10)));
    }

    #[test]
    fn test_injected_failures() {
        let adapter = MemoryAdapter::new().fail_chunk(1);
        let mut link = open(&adapter);
        assert!(link.write_chunk(b"a").is_ok());
        assert!(link.write_chunk(b"b").is_err());

        let adapter = MemoryAdapter::new().fail_open("refused");
        let device = DiscoveredDevice::new("A", "Printer", 0x0600);
        let err = adapter
            .open_link(&device, &PrinterProfile::default())
            .err()
            .unwrap();
        assert_eq!(err.description(), "refused");
    }

    #[test]
    fn test_paced_writes_wait_for_release() {
        let adapter = MemoryAdapter::new().paced();
        let log = adapter.log();
        let mut link = open(&adapter);

        log.release(1);
        link.write_chunk(b"a").unwrap();
        assert!(log.wait_for_chunk(b"a", Duration::ZERO));

        let writer = std::thread::spawn(move || link.write_chunk(b"b"));
        assert!(!log.wait_for_chunk(b"b", Duration::from_millis(20)));
        log.release(1);
        assert!(writer.join().unwrap().is_ok());
        assert_eq!(log.chunks(), vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_enable_requests_are_recorded() {
        let adapter = MemoryAdapter::new().disabled();
        assert!(!adapter.is_enabled());
        adapter.request_enable().unwrap();
        assert_eq!(adapter.log().enable_requests(), 1);
    }

    #[test]
    fn test_acknowledged_kind() {
        let adapter = MemoryAdapter::new().acknowledged();
        assert_eq!(open(&adapter).link_kind(), LinkKind::Acknowledged);
    }

    #[test]
    fn test_discovery_capability() {
        let adapter = MemoryAdapter::new().without_discovery();
        assert!(matches!(
            adapter.start_discovery(),
            Err(BonprintError::Unsupported(_))
        ));
        assert_eq!(adapter.log().discovery_starts(), 0);
    }
}
