//! # Connection Lifecycle
//!
//! Discovery, bonding and the single active printer link.
//!
//! - [`state`]: device records, registry and externally visible state
//! - [`machine`]: the sans-IO state machine
//! - [`event`]: events delivered to the caller

pub mod event;
pub mod machine;
pub mod state;

pub use event::{DevicePayload, PrinterEvent};
pub use machine::{AdapterState, Command, ConnectPolicy, ConnectionMachine, Effect, LinkEvent};
pub use state::{
    BondState, ConnectionState, DeviceId, DeviceKind, DeviceRegistry, DiscoveredDevice, is_valid_mac,
};
