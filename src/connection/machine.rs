//! # Connection State Machine
//!
//! Sans-IO lifecycle of the single printer link. Commands from the caller
//! and events from the platform go in; [`Effect`]s come out. The machine
//! never performs I/O itself, so every transition is testable without a
//! radio.
//!
//! ```text
//!            start-scan           matching device found
//!   Idle ───────────────► Discovering ─────────────────► Bonding(d)
//!    ▲                                                    │ bonded
//!    │ closed                                             ▼
//! Disconnecting(d) ◄──── Connected(d) ◄────────────── Connecting(d)
//!            disconnect                 link opened
//! ```
//!
//! Already-bonded devices skip `Bonding`. Connecting to a second device while
//! one is connected closes the first and queues the second.

use tracing::{debug, info, warn};

use super::event::{DevicePayload, PrinterEvent};
use super::state::{BondState, ConnectionState, DeviceId, DeviceRegistry, DiscoveredDevice};
use crate::error::{BonprintError, Result};
use crate::printer::PrinterProfile;

/// Caller requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartScan,
    StopScan,
    Connect(DeviceId),
    Disconnect,
}

/// Adapter power states as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    TurningOn,
    On,
    TurningOff,
    Off,
}

/// Platform notifications, delivered serially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    AdapterStateChanged(AdapterState),
    DeviceFound(DiscoveredDevice),
    DiscoveryFinished,
    BondStateChanged { id: DeviceId, state: BondState },
    LinkOpened(DeviceId),
    LinkFailed { id: DeviceId, reason: String },
    LinkClosed(DeviceId),
    /// Acknowledgment of one written chunk on acknowledged links.
    WriteConfirmed { ok: bool },
}

/// Work the machine asks its driver to perform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Emit(PrinterEvent),
    StartDiscovery,
    CancelDiscovery,
    CreateBond(DeviceId),
    OpenLink(DiscoveredDevice),
    CloseLink(DeviceId),
}

/// Auto-connect settings taken from the printer profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectPolicy {
    pub auto_connect: bool,
    pub printer_classes: Vec<u16>,
    pub stop_scan_after_connect: bool,
}

impl ConnectPolicy {
    fn wants(&self, device: &DiscoveredDevice) -> bool {
        self.auto_connect && self.printer_classes.contains(&device.class)
    }
}

impl From<&PrinterProfile> for ConnectPolicy {
    fn from(profile: &PrinterProfile) -> Self {
        Self {
            auto_connect: profile.auto_connect,
            printer_classes: profile.printer_classes.clone(),
            stop_scan_after_connect: profile.stop_scan_after_connect,
        }
    }
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self::from(&PrinterProfile::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Link {
    Idle,
    Bonding(DeviceId),
    /// `abandoned`: a disconnect arrived before the link opened.
    Connecting { id: DeviceId, abandoned: bool },
    Connected(DeviceId),
    /// `announced`: the caller saw this device connect.
    Disconnecting { id: DeviceId, announced: bool },
}

/// The connection lifecycle for one printer.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    policy: ConnectPolicy,
    registry: DeviceRegistry,
    link: Link,
    /// Scan requested. Discovery runs only while the adapter is powered.
    scanning: bool,
    powered: bool,
    queued: Option<DeviceId>,
}

impl ConnectionMachine {
    pub fn new(policy: ConnectPolicy) -> Self {
        Self {
            policy,
            registry: DeviceRegistry::new(),
            link: Link::Idle,
            scanning: false,
            powered: true,
            queued: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        match &self.link {
            Link::Idle if self.scanning && self.powered => ConnectionState::Discovering,
            Link::Idle => ConnectionState::Idle,
            Link::Bonding(id) => ConnectionState::Bonding(id.clone()),
            Link::Connecting { id, .. } => ConnectionState::Connecting(id.clone()),
            Link::Connected(id) => ConnectionState::Connected(id.clone()),
            Link::Disconnecting { id, .. } => ConnectionState::Disconnecting(id.clone()),
        }
    }

    pub fn connected_device(&self) -> Option<&DeviceId> {
        match &self.link {
            Link::Connected(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected_device().is_some()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Seed the adapter power state, e.g. from `Adapter::is_enabled` at open.
    /// Later changes arrive as [`LinkEvent::AdapterStateChanged`].
    pub fn set_powered(&mut self, powered: bool) {
        self.powered = powered;
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Record a device without running auto-connect (e.g. already-bonded
    /// devices listed by the adapter at startup).
    pub fn remember(&mut self, device: DiscoveredDevice) {
        self.registry.upsert(device);
    }

    // ========================================================================
    // COMMANDS
    // ========================================================================

    /// Apply a caller command.
    ///
    /// Fails only for `Connect` to an id discovery has not reported.
    pub fn command(&mut self, command: Command) -> Result<Vec<Effect>> {
        debug!(?command, link = ?self.link, "connection command");
        let effects = match command {
            Command::StartScan => {
                self.scanning = true;
                if self.powered {
                    vec![Effect::CancelDiscovery, Effect::StartDiscovery]
                } else {
                    debug!("scan deferred until the adapter is on");
                    vec![]
                }
            }
            Command::StopScan => {
                self.scanning = false;
                vec![Effect::CancelDiscovery]
            }
            Command::Connect(id) => self.connect(id)?,
            Command::Disconnect => self.disconnect(),
        };
        Ok(effects)
    }

    fn connect(&mut self, id: DeviceId) -> Result<Vec<Effect>> {
        let device = self
            .registry
            .get(&id)
            .cloned()
            .ok_or_else(|| BonprintError::InvalidInput(format!("unknown device {}", id)))?;

        match &mut self.link {
            Link::Idle => Ok(self.begin(device)),
            Link::Connected(current) | Link::Bonding(current) if *current == id => Ok(vec![]),
            Link::Connecting { id: current, abandoned } if *current == id => {
                *abandoned = false;
                self.queued = None;
                Ok(vec![])
            }
            Link::Connected(current) => {
                let current = current.clone();
                info!(from = %current, to = %id, "switching printer");
                self.queued = Some(id);
                self.link = Link::Disconnecting {
                    id: current.clone(),
                    announced: true,
                };
                Ok(vec![Effect::CloseLink(current)])
            }
            Link::Bonding(current) => {
                debug!(abandoned = %current, "bonding abandoned for another device");
                self.link = Link::Idle;
                Ok(self.begin(device))
            }
            Link::Connecting { abandoned, .. } => {
                *abandoned = true;
                self.queued = Some(id);
                Ok(vec![])
            }
            Link::Disconnecting { .. } => {
                self.queued = Some(id);
                Ok(vec![])
            }
        }
    }

    fn disconnect(&mut self) -> Vec<Effect> {
        self.queued = None;
        match &mut self.link {
            Link::Idle | Link::Disconnecting { .. } => vec![],
            Link::Bonding(_) => {
                self.link = Link::Idle;
                vec![]
            }
            Link::Connecting { abandoned, .. } => {
                *abandoned = true;
                vec![]
            }
            Link::Connected(id) => {
                let id = id.clone();
                self.link = Link::Disconnecting {
                    id: id.clone(),
                    announced: true,
                };
                vec![Effect::CloseLink(id)]
            }
        }
    }

    /// Bond first if needed, otherwise open the link straight away.
    fn begin(&mut self, device: DiscoveredDevice) -> Vec<Effect> {
        if device.is_bonded() {
            debug!(device = %device.id, "connecting");
            self.link = Link::Connecting {
                id: device.id.clone(),
                abandoned: false,
            };
            vec![Effect::OpenLink(device)]
        } else {
            debug!(device = %device.id, "bonding");
            self.link = Link::Bonding(device.id.clone());
            vec![Effect::CreateBond(device.id)]
        }
    }

    fn start_queued(&mut self) -> Vec<Effect> {
        let Some(id) = self.queued.take() else {
            return vec![];
        };
        match self.registry.get(&id).cloned() {
            Some(device) => self.begin(device),
            None => vec![],
        }
    }

    fn payload(&self, id: &DeviceId) -> DevicePayload {
        match self.registry.get(id) {
            Some(device) => DevicePayload::from(device),
            None => DevicePayload::from(&DiscoveredDevice::new(id.clone(), "", 0)),
        }
    }

    // ========================================================================
    // PLATFORM EVENTS
    // ========================================================================

    /// Apply a platform event.
    pub fn event(&mut self, event: LinkEvent) -> Vec<Effect> {
        debug!(?event, link = ?self.link, "connection event");
        match event {
            LinkEvent::AdapterStateChanged(state) => self.on_adapter(state),
            LinkEvent::DeviceFound(device) => self.on_found(device),
            LinkEvent::DiscoveryFinished => {
                self.scanning = false;
                vec![Effect::Emit(PrinterEvent::ScanFinished)]
            }
            LinkEvent::BondStateChanged { id, state } => self.on_bond(id, state),
            LinkEvent::LinkOpened(id) => self.on_opened(id),
            LinkEvent::LinkFailed { id, reason } => self.on_failed(id, reason),
            LinkEvent::LinkClosed(id) => self.on_closed(id),
            LinkEvent::WriteConfirmed { .. } => vec![],
        }
    }

    fn on_adapter(&mut self, state: AdapterState) -> Vec<Effect> {
        match state {
            AdapterState::TurningOn => vec![Effect::Emit(PrinterEvent::BluetoothOn)],
            AdapterState::On => {
                self.powered = true;
                let mut effects = vec![Effect::Emit(PrinterEvent::BluetoothReady)];
                if self.scanning {
                    effects.extend([Effect::CancelDiscovery, Effect::StartDiscovery]);
                }
                effects
            }
            AdapterState::TurningOff => vec![],
            AdapterState::Off => {
                self.powered = false;
                let mut effects = vec![Effect::Emit(PrinterEvent::BluetoothOff)];
                self.queued = None;
                match std::mem::replace(&mut self.link, Link::Idle) {
                    Link::Connected(id)
                    | Link::Disconnecting {
                        id,
                        announced: true,
                    } => {
                        warn!(device = %id, "adapter off, link lost");
                        effects.push(Effect::Emit(PrinterEvent::DeviceDisconnected(
                            self.payload(&id),
                        )));
                        effects.push(Effect::CloseLink(id));
                    }
                    Link::Disconnecting { id, .. } => effects.push(Effect::CloseLink(id)),
                    Link::Idle | Link::Bonding(_) | Link::Connecting { .. } => {}
                }
                effects
            }
        }
    }

    fn on_found(&mut self, device: DiscoveredDevice) -> Vec<Effect> {
        if device.name.is_empty() {
            return vec![];
        }
        self.registry.upsert(device.clone());
        let mut effects = vec![Effect::Emit(PrinterEvent::DeviceFound(DevicePayload::from(
            &device,
        )))];

        if self.link == Link::Idle && self.queued.is_none() && self.policy.wants(&device) {
            info!(device = %device.id, name = %device.name, "auto-connecting printer");
            effects.extend(self.begin(device));
        }
        effects
    }

    fn on_bond(&mut self, id: DeviceId, state: BondState) -> Vec<Effect> {
        self.registry.set_bond_state(&id, state);
        let payload = self.payload(&id);
        let mut effects = vec![Effect::Emit(match state {
            BondState::Bonding => PrinterEvent::DeviceBonding(payload),
            BondState::Bonded => PrinterEvent::DeviceBonded(payload),
            BondState::None => PrinterEvent::DeviceBondFailed(payload),
        })];

        if self.link == Link::Bonding(id.clone()) {
            match state {
                BondState::Bonding => {}
                BondState::Bonded => {
                    if let Some(device) = self.registry.get(&id).cloned() {
                        effects.extend(self.begin(device));
                    }
                }
                BondState::None => {
                    warn!(device = %id, "bonding rejected");
                    self.link = Link::Idle;
                }
            }
        }
        effects
    }

    fn on_opened(&mut self, id: DeviceId) -> Vec<Effect> {
        match &self.link {
            Link::Connecting {
                id: current,
                abandoned: false,
            } if *current == id => {
                info!(device = %id, "printer connected");
                self.link = Link::Connected(id.clone());
                let mut effects = vec![Effect::Emit(PrinterEvent::DeviceConnected(
                    self.payload(&id),
                ))];
                if self.policy.stop_scan_after_connect && self.scanning {
                    self.scanning = false;
                    effects.push(Effect::CancelDiscovery);
                }
                effects
            }
            Link::Connecting {
                id: current,
                abandoned: true,
            } if *current == id => {
                self.link = Link::Disconnecting {
                    id: id.clone(),
                    announced: false,
                };
                vec![Effect::CloseLink(id)]
            }
            Link::Connected(current) if *current == id => vec![],
            _ => {
                debug!(device = %id, "closing stale link");
                vec![Effect::CloseLink(id)]
            }
        }
    }

    fn on_failed(&mut self, id: DeviceId, reason: String) -> Vec<Effect> {
        let Link::Connecting {
            id: current,
            abandoned,
        } = &self.link
        else {
            return vec![];
        };
        if *current != id {
            return vec![];
        }

        let abandoned = *abandoned;
        self.link = Link::Idle;
        let mut effects = Vec::new();
        if !abandoned {
            warn!(device = %id, %reason, "connect failed");
            effects.push(Effect::Emit(PrinterEvent::ConnectFailed {
                address: id.to_string(),
                description: reason,
            }));
        }
        effects.extend(self.start_queued());
        effects
    }

    fn on_closed(&mut self, id: DeviceId) -> Vec<Effect> {
        let announced = match &self.link {
            Link::Connected(current) if *current == id => {
                warn!(device = %id, "link closed by peer");
                true
            }
            Link::Disconnecting {
                id: current,
                announced,
            } if *current == id => *announced,
            _ => return vec![],
        };

        self.link = Link::Idle;
        let mut effects = Vec::new();
        if announced {
            info!(device = %id, "printer disconnected");
            effects.push(Effect::Emit(PrinterEvent::DeviceDisconnected(
                self.payload(&id),
            )));
        }
        effects.extend(self.start_queued());
        effects
    }
}

impl Default for ConnectionMachine {
    fn default() -> Self {
        Self::new(ConnectPolicy::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
