//! # Printer Session
//!
//! The caller-facing handle. A session owns one [`ConnectionMachine`], one
//! background worker thread (`bonprint-io`) and at most one outstanding
//! print.
//!
//! ```text
//!  caller ──► Session ──(lock)──► State { machine, pending write, options }
//!                │                     │ effects
//!                │                     ▼
//!                │          Job queue (tokio mpsc) ──► bonprint-io worker
//!                │                                       │ open/close/write
//!                ◄──────── LinkEvent (handle_event) ◄────┘
//! ```
//!
//! Platform callbacks (device found, bond changes, write confirmations) go
//! through [`Session::handle_event`]. Lifecycle events come out on the
//! channel returned by [`Session::new`].
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bonprint::document::*;
//! use bonprint::session::{Session, SessionOptions};
//! use bonprint::transport::RfcommAdapter;
//!
//! # async fn run() -> bonprint::error::Result<()> {
//! let adapter = RfcommAdapter::new(0).with_printer("66:22:B3:1C:07:9A", "MPT-II")?;
//! let (session, mut events) = Session::new(Arc::new(adapter));
//! session.open(SessionOptions::default())?;
//! session.connect_by_address("66:22:B3:1C:07:9A")?;
//!
//! while let Some(event) = events.recv().await {
//!     if matches!(event, bonprint::connection::PrinterEvent::DeviceConnected(_)) {
//!         break;
//!     }
//! }
//!
//! session.print(&[Title::new("Thank you").into()]).await?;
//! session.close();
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::connection::{
    BondState, Command, ConnectPolicy, ConnectionMachine, ConnectionState, DeviceId, DiscoveredDevice,
    Effect, LinkEvent, PrinterEvent,
};
use crate::document::PrintElement;
use crate::error::{BonprintError, Result};
use crate::json_api::parse_descriptors;
use crate::pipeline;
use crate::printer::{AbsoluteFontSize, PrinterProfile};
use crate::transport::{Adapter, LinkKind, Transport};
use crate::writer::{ChunkedWriter, PendingWrite, WriteProgress};

/// Settings fixed when the session is opened.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub profile: PrinterProfile,
    /// Base size every element's relative size is added to.
    pub base_size: AbsoluteFontSize,
    /// Start discovery as part of [`Session::open`], so the first printer
    /// found is connected without a separate [`Session::start_scan`].
    pub scan_on_open: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            profile: PrinterProfile::default(),
            base_size: AbsoluteFontSize::default(),
            scan_on_open: true,
        }
    }
}

/// Handle to one submitted print.
#[derive(Debug)]
pub struct PrintJob {
    id: u64,
    receiver: oneshot::Receiver<Result<()>>,
}

impl PrintJob {
    fn ready(id: u64, result: Result<()>) -> Self {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(result);
        Self { id, receiver }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the write to complete.
    pub async fn wait(self) -> Result<()> {
        self.receiver.await.unwrap_or_else(|_| Err(closed()))
    }

    /// Blocking variant of [`wait`](Self::wait). Must not be called from
    /// inside an async runtime.
    pub fn blocking_wait(self) -> Result<()> {
        self.receiver.blocking_recv().unwrap_or_else(|_| Err(closed()))
    }
}

fn closed() -> BonprintError {
    BonprintError::transport("session closed")
}

/// Work for the `bonprint-io` thread.
enum Job {
    Open {
        device: DiscoveredDevice,
        profile: PrinterProfile,
    },
    Close(DeviceId),
    Write {
        job: u64,
        bytes: Vec<u8>,
        chunk_limit: usize,
    },
    Shutdown,
}

struct State {
    adapter: Arc<dyn Adapter>,
    events: mpsc::UnboundedSender<PrinterEvent>,
    options: SessionOptions,
    machine: ConnectionMachine,
    /// Kind of the link the machine holds as connected.
    link: Option<(DeviceId, LinkKind)>,
    pending: Option<PendingWrite>,
    /// Confirmations still owed for writes that ended early on this link.
    stale_acks: usize,
    next_job: u64,
    /// `None` while the session is closed.
    jobs: Option<mpsc::UnboundedSender<Job>>,
}

impl State {
    fn ensure_open(&self) -> Result<()> {
        match self.jobs {
            Some(_) => Ok(()),
            None => Err(BonprintError::NotReady("session is not open".into())),
        }
    }

    fn emit(&self, event: PrinterEvent) {
        debug!(event = event.channel_method(), "event");
        // A dropped receiver just means nobody is listening
        let _ = self.events.send(event);
    }

    fn enqueue(&self, job: Job) {
        let Some(jobs) = &self.jobs else {
            warn!("job dropped: session closed");
            return;
        };
        if jobs.send(job).is_err() {
            warn!("job dropped: worker stopped");
        }
    }

    /// Start discovery. While the adapter is off, ask for it to be enabled;
    /// the machine starts discovery once it reports on.
    fn start_scan(&mut self) -> Result<()> {
        if !self.adapter.supports_discovery() {
            debug!("discovery unsupported, scan ignored");
            return Ok(());
        }
        let enabled = self.adapter.is_enabled();
        self.machine.set_powered(enabled);
        if !enabled {
            match self.adapter.request_enable() {
                Ok(()) => info!("bluetooth is off, enable requested"),
                Err(BonprintError::Unsupported(_)) => debug!("bluetooth is off, scan deferred"),
                Err(e) => warn!(error = %e, "enable request failed"),
            }
        }
        self.command(Command::StartScan)
    }

    fn command(&mut self, command: Command) -> Result<()> {
        let effects = self.machine.command(command)?;
        self.drive(effects);
        Ok(())
    }

    fn feed(&mut self, event: LinkEvent) {
        if let LinkEvent::WriteConfirmed { ok } = event {
            self.confirm(ok);
            return;
        }
        let effects = self.machine.event(event);
        self.drive(effects);
    }

    /// Apply effects in order. Adapter failures turn into events that are
    /// fed back before the remaining effects.
    fn drive(&mut self, effects: Vec<Effect>) {
        let mut effects = VecDeque::from(effects);
        while let Some(effect) = effects.pop_front() {
            if let Some(event) = self.apply(effect) {
                let follow = self.machine.event(event);
                for effect in follow.into_iter().rev() {
                    effects.push_front(effect);
                }
            }
        }
        self.sync_link();
    }

    fn apply(&mut self, effect: Effect) -> Option<LinkEvent> {
        match effect {
            Effect::Emit(event) => self.emit(event),
            Effect::StartDiscovery => match self.adapter.start_discovery() {
                Ok(()) => {}
                Err(BonprintError::Unsupported(what)) => debug!(what = %what, "discovery unsupported"),
                Err(e) => warn!(error = %e, "start discovery failed"),
            },
            Effect::CancelDiscovery => {
                if let Err(e) = self.adapter.cancel_discovery() {
                    warn!(error = %e, "cancel discovery failed");
                }
            }
            Effect::CreateBond(id) => {
                if let Err(e) = self.adapter.create_bond(&id) {
                    warn!(device = %id, error = %e, "bond request failed");
                    return Some(LinkEvent::BondStateChanged {
                        id,
                        state: BondState::None,
                    });
                }
            }
            Effect::OpenLink(device) => self.enqueue(Job::Open {
                device,
                profile: self.options.profile.clone(),
            }),
            Effect::CloseLink(id) => self.enqueue(Job::Close(id)),
        }
        None
    }

    /// Drop link details once the machine no longer holds that link, and
    /// fail a write that lost its link.
    fn sync_link(&mut self) {
        let connected = self.machine.connected_device();
        if self.link.as_ref().map(|(id, _)| id) != connected {
            self.link = None;
        }
        if self.link.is_none() {
            if self.pending.is_some() {
                self.complete(Err(BonprintError::transport("connection lost")));
            }
            self.stale_acks = 0;
        }
    }

    fn link_opened(&mut self, id: DeviceId, kind: LinkKind) {
        let effects = self.machine.event(LinkEvent::LinkOpened(id.clone()));
        if self.machine.connected_device() == Some(&id) {
            self.link = Some((id, kind));
            self.stale_acks = 0;
        }
        self.drive(effects);
    }

    fn confirm(&mut self, ok: bool) {
        if self.stale_acks > 0 {
            self.stale_acks -= 1;
            debug!(ok, remaining = self.stale_acks, "confirmation for an abandoned write");
            return;
        }
        let Some(pending) = self.pending.as_mut() else {
            debug!(ok, "write confirmation without a pending write");
            return;
        };
        match pending.record_ack(ok) {
            WriteProgress::InFlight => {}
            WriteProgress::Complete => self.complete(Ok(())),
            WriteProgress::Failed(reason) => self.complete(Err(BonprintError::transport(reason))),
        }
    }

    /// Count the next chunk of `job`. `false` once the job is no longer the
    /// pending write, so the worker stops issuing it.
    fn chunk_sent(&mut self, job: u64) -> bool {
        match self.pending.as_mut().filter(|p| p.job() == job) {
            Some(pending) => {
                pending.record_sent();
                true
            }
            None => false,
        }
    }

    fn write_finished(&mut self, job: u64, result: Result<usize>) {
        let Some(pending) = self.pending.as_mut().filter(|p| p.job() == job) else {
            debug!(job, "write finished for a cancelled job");
            return;
        };
        match result {
            Ok(_) => {
                if pending.record_issued() == WriteProgress::Complete {
                    self.complete(Ok(()));
                }
            }
            Err(e) => {
                pending.record_unsent();
                self.complete(Err(e));
            }
        }
    }

    /// Take the pending write, remembering the confirmations it still owes.
    fn take_pending(&mut self) -> Option<PendingWrite> {
        let pending = self.pending.take()?;
        self.stale_acks += pending.outstanding();
        Some(pending)
    }

    /// Resolve the pending write and report it.
    fn complete(&mut self, result: Result<()>) {
        let Some(pending) = self.take_pending() else {
            return;
        };
        match &result {
            Ok(()) => {
                info!(job = pending.job(), chunks = pending.expected(), "print complete");
                self.emit(PrinterEvent::PrintSuccess);
            }
            Err(e) => {
                warn!(job = pending.job(), error = %e, "print failed");
                self.emit(PrinterEvent::PrintFailure {
                    title: e.title().to_string(),
                    description: e.description(),
                });
            }
        }
        pending.finish(result);
    }

    /// Resolve the pending write without reporting it.
    fn cancel(&mut self) {
        if let Some(pending) = self.take_pending() {
            info!(job = pending.job(), "print cancelled by disconnect");
            pending.fail("cancelled");
        }
    }
}

/// A printer session. See the [module docs](self).
pub struct Session {
    state: Arc<Mutex<State>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Create a closed session and the receiver for its events.
    pub fn new(adapter: Arc<dyn Adapter>) -> (Self, mpsc::UnboundedReceiver<PrinterEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let options = SessionOptions::default();
        let state = State {
            adapter,
            events,
            machine: ConnectionMachine::new(ConnectPolicy::from(&options.profile)),
            options,
            link: None,
            pending: None,
            stale_acks: 0,
            next_job: 1,
            jobs: None,
        };
        let session = Self {
            state: Arc::new(Mutex::new(state)),
            worker: Mutex::new(None),
        };
        (session, receiver)
    }

    /// Open the session: fix the options, load bonded devices, start the
    /// worker and (with `scan_on_open`) discovery. Opening an open session
    /// only replaces the layout options; the connection policy stays until
    /// [`close`](Self::close).
    ///
    /// Fails with `InvalidInput` for a profile that cannot lay out a line.
    pub fn open(&self, options: SessionOptions) -> Result<()> {
        options.profile.validate()?;
        let mut state = self.state.lock();
        if state.jobs.is_some() {
            debug!(profile = %options.profile.name, "session already open, updating options");
            state.options = options;
            return Ok(());
        }

        let mut machine = ConnectionMachine::new(ConnectPolicy::from(&options.profile));
        machine.set_powered(state.adapter.is_enabled());
        for device in state.adapter.bonded_devices() {
            machine.remember(device);
        }

        let (jobs, queue) = mpsc::unbounded_channel();
        let worker_state = Arc::clone(&self.state);
        let adapter = Arc::clone(&state.adapter);
        let handle = thread::Builder::new()
            .name("bonprint-io".into())
            .spawn(move || run_worker(worker_state, adapter, queue))?;

        info!(
            profile = %options.profile.name,
            base_size = ?options.base_size,
            known = machine.registry().len(),
            "session opened"
        );
        let scan = options.scan_on_open;
        state.machine = machine;
        state.options = options;
        state.link = None;
        state.stale_acks = 0;
        state.jobs = Some(jobs);
        *self.worker.lock() = Some(handle);

        if scan {
            state.start_scan()?;
        }
        Ok(())
    }

    /// Disconnect, stop the worker and forget discovered devices.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if state.jobs.is_none() {
                return;
            }
            state.cancel();
            if let Err(e) = state.command(Command::Disconnect) {
                warn!(error = %e, "disconnect on close failed");
            }
            state.enqueue(Job::Shutdown);
        }

        // The worker still reports the final close while we wait
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                warn!("worker thread panicked");
            }
        }

        let mut state = self.state.lock();
        state.jobs = None;
        state.link = None;
        state.machine = ConnectionMachine::new(ConnectPolicy::from(&state.options.profile));
        info!("session closed");
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().adapter.is_enabled()
    }

    pub fn is_connected(&self) -> bool {
        let state = self.state.lock();
        state.machine.is_connected() && state.link.is_some()
    }

    pub fn state(&self) -> ConnectionState {
        self.state.lock().machine.state()
    }

    /// Devices seen so far, in first-seen order.
    pub fn devices(&self) -> Vec<DiscoveredDevice> {
        self.state.lock().machine.registry().iter().cloned().collect()
    }

    /// Start (or restart) discovery. A platform without discovery is not an
    /// error. With the adapter off, enabling is requested and discovery
    /// starts once the adapter reports on.
    pub fn start_scan(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.start_scan()
    }

    pub fn stop_scan(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.command(Command::StopScan)
    }

    /// Connect to a device discovery reported (or the adapter listed as
    /// bonded). Connecting to the current device is a no-op.
    pub fn connect_by_address(&self, address: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        info!(device = %address, "connect requested");
        state.command(Command::Connect(DeviceId::from(address)))
    }

    /// Drop the link. An in-flight print resolves as cancelled without a
    /// failure event.
    pub fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.cancel();
        state.command(Command::Disconnect)
    }

    /// Feed a platform event.
    pub fn handle_event(&self, event: LinkEvent) {
        let mut state = self.state.lock();
        if state.ensure_open().is_err() {
            debug!(?event, "event ignored: session closed");
            return;
        }
        state.feed(event);
    }

    /// Render `elements` and queue the write.
    ///
    /// Fails with `NotReady` when not connected (also reported as a
    /// `PrintFailure` event) or while another print is outstanding.
    pub fn submit(&self, elements: &[PrintElement]) -> Result<PrintJob> {
        let mut state = self.state.lock();
        state.ensure_open()?;

        let Some((_, kind)) = state.link.clone() else {
            let err = BonprintError::NotReady("not connected".into());
            state.emit(PrinterEvent::PrintFailure {
                title: err.title().to_string(),
                description: err.description(),
            });
            return Err(err);
        };
        if state.pending.is_some() {
            return Err(BonprintError::NotReady("busy: a print is in progress".into()));
        }

        let job = state.next_job;
        state.next_job += 1;

        let bytes = pipeline::render(elements, state.options.base_size, &state.options.profile);
        if bytes.is_empty() {
            debug!(job, "nothing to print");
            state.emit(PrinterEvent::PrintSuccess);
            return Ok(PrintJob::ready(job, Ok(())));
        }

        let chunk_limit = state.options.profile.chunk_limit;
        let expected = ChunkedWriter::new(chunk_limit).chunk_count(bytes.len());
        let (pending, receiver) = PendingWrite::new(job, kind, expected);
        state.pending = Some(pending);
        info!(job, bytes = bytes.len(), chunks = expected, "print submitted");
        state.enqueue(Job::Write {
            job,
            bytes,
            chunk_limit,
        });

        Ok(PrintJob { id: job, receiver })
    }

    /// Print `elements` and wait for the write to complete.
    pub async fn print(&self, elements: &[PrintElement]) -> Result<()> {
        self.submit(elements)?.wait().await
    }

    /// Parse JSON descriptors and print them. Malformed input fails before
    /// anything is sent.
    pub async fn print_descriptors(&self, json: &str) -> Result<()> {
        let elements = parse_descriptors(json)?;
        self.print(&elements).await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// WORKER
// ============================================================================

fn run_worker(
    state: Arc<Mutex<State>>,
    adapter: Arc<dyn Adapter>,
    mut queue: mpsc::UnboundedReceiver<Job>,
) {
    let mut active: Option<(DeviceId, Box<dyn Transport>)> = None;

    while let Some(job) = queue.blocking_recv() {
        match job {
            Job::Open { device, profile } => {
                if let Some((id, mut transport)) = active.take() {
                    warn!(device = %id, "closing stale link before open");
                    if let Err(e) = transport.close() {
                        warn!(device = %id, error = %e, "close failed");
                    }
                }
                match adapter.open_link(&device, &profile) {
                    Ok(transport) => {
                        let kind = transport.link_kind();
                        info!(device = %device.id, ?kind, "link open");
                        active = Some((device.id.clone(), transport));
                        state.lock().link_opened(device.id, kind);
                    }
                    Err(e) => {
                        warn!(device = %device.id, error = %e, "link open failed");
                        state.lock().feed(LinkEvent::LinkFailed {
                            id: device.id,
                            reason: e.description(),
                        });
                    }
                }
            }
            Job::Close(id) => {
                if let Some((current, mut transport)) = active.take() {
                    if current == id {
                        if let Err(e) = transport.close() {
                            warn!(device = %id, error = %e, "close failed");
                        }
                    } else {
                        active = Some((current, transport));
                    }
                }
                state.lock().feed(LinkEvent::LinkClosed(id));
            }
            Job::Write {
                job,
                bytes,
                chunk_limit,
            } => {
                let result = match active.as_mut() {
                    Some((_, transport)) => ChunkedWriter::new(chunk_limit)
                        .issue_with(transport.as_mut(), &bytes, |_| state.lock().chunk_sent(job)),
                    None => Err(BonprintError::transport("no open link")),
                };
                state.lock().write_finished(job, result);
            }
            Job::Shutdown => break,
        }
    }

    if let Some((id, mut transport)) = active.take() {
        debug!(device = %id, "closing link on shutdown");
        if let Err(e) = transport.close() {
            warn!(device = %id, error = %e, "close failed");
        }
    }
    debug!("worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryAdapter;

    #[test]
    fn test_closed_session_rejects_commands() {
        let (session, _events) = Session::new(Arc::new(MemoryAdapter::new()));
        assert!(matches!(session.start_scan(), Err(BonprintError::NotReady(_))));
        assert!(matches!(session.submit(&[]), Err(BonprintError::NotReady(_))));
        assert_eq!(session.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_ready_job() {
        let job = PrintJob::ready(3, Ok(()));
        assert_eq!(job.id(), 3);
        assert!(job.blocking_wait().is_ok());
    }

    #[test]
    fn test_print_while_disconnected_reports_failure() {
        let (session, mut events) = Session::new(Arc::new(MemoryAdapter::new()));
        session.open(SessionOptions::default()).unwrap();

        let err = session.submit(&[]).unwrap_err();
        assert!(matches!(err, BonprintError::NotReady(_)));
        assert_eq!(
            events.try_recv().unwrap(),
            PrinterEvent::PrintFailure {
                title: "Print failed".into(),
                description: "not connected".into(),
            }
        );
        session.close();
    }
}
