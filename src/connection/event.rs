//! Outbound lifecycle events.
//!
//! Events serialize as flat JSON objects tagged with `"event"`:
//!
//! ```json
//! {"event": "device-found", "kind": 1, "name": "MPT-II", "address": "00:11:22:33:44:55", "bondState": 10}
//! {"event": "print-failure", "title": "Print failed", "description": "not connected"}
//! ```

use serde::{Deserialize, Serialize};

use super::state::DiscoveredDevice;

/// Device fields carried by device events, using Android integer codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePayload {
    pub kind: u8,
    pub name: String,
    pub address: String,
    pub bond_state: u8,
}

impl From<&DiscoveredDevice> for DevicePayload {
    fn from(device: &DiscoveredDevice) -> Self {
        Self {
            kind: device.kind.code(),
            name: device.name.clone(),
            address: device.id.to_string(),
            bond_state: device.bond_state.code(),
        }
    }
}

/// Events delivered to the caller's event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum PrinterEvent {
    BluetoothOn,
    BluetoothOff,
    BluetoothReady,
    DeviceBonding(DevicePayload),
    DeviceBonded(DevicePayload),
    DeviceBondFailed(DevicePayload),
    DeviceFound(DevicePayload),
    ScanFinished,
    DeviceConnected(DevicePayload),
    DeviceDisconnected(DevicePayload),
    ConnectFailed { address: String, description: String },
    PrintSuccess,
    PrintFailure { title: String, description: String },
}

impl PrinterEvent {
    /// Method name used by the mobile bridge for this event.
    pub fn channel_method(&self) -> &'static str {
        match self {
            PrinterEvent::BluetoothOn => "onBltTurnOn",
            PrinterEvent::BluetoothOff => "onBltTurnOff",
            PrinterEvent::BluetoothReady => "onBltStateOn",
            PrinterEvent::DeviceBonding(_) => "onBltBonding",
            PrinterEvent::DeviceBonded(_) => "onBltBondEnd",
            PrinterEvent::DeviceBondFailed(_) => "onBltBondNone",
            PrinterEvent::DeviceFound(_) => "onBltFindDevice",
            PrinterEvent::ScanFinished => "onBltFindFinish",
            PrinterEvent::DeviceConnected(_) => "onBltDeviceCon",
            PrinterEvent::DeviceDisconnected(_) => "onBltDeviceDisCon",
            PrinterEvent::ConnectFailed { .. } => "onBltConnectFailed",
            PrinterEvent::PrintSuccess => "onPrintSuccess",
            PrinterEvent::PrintFailure { .. } => "onPrintFailure",
        }
    }

    /// Address of the device an event refers to, if any.
    pub fn address(&self) -> Option<&str> {
        match self {
            PrinterEvent::DeviceBonding(d)
            | PrinterEvent::DeviceBonded(d)
            | PrinterEvent::DeviceBondFailed(d)
            | PrinterEvent::DeviceFound(d)
            | PrinterEvent::DeviceConnected(d)
            | PrinterEvent::DeviceDisconnected(d) => Some(&d.address),
            PrinterEvent::ConnectFailed { address, .. } => Some(address),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::state::BondState;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_device_event_json() {
        let device = DiscoveredDevice::new("00:11:22:33:44:55", "MPT-II", 0x0600);
        let event = PrinterEvent::DeviceFound(DevicePayload::from(&device));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "device-found",
                "kind": 1,
                "name": "MPT-II",
                "address": "00:11:22:33:44:55",
                "bondState": 10
            })
        );
    }

    #[test]
    fn test_unit_and_failure_events_json() {
        assert_eq!(
            serde_json::to_value(PrinterEvent::ScanFinished).unwrap(),
            json!({"event": "scan-finished"})
        );
        let failure = PrinterEvent::PrintFailure {
            title: "Print failed".into(),
            description: "not connected".into(),
        };
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({"event": "print-failure", "title": "Print failed", "description": "not connected"})
        );
    }

    #[test]
    fn test_bond_failed_name() {
        let mut device = DiscoveredDevice::new("A", "P", 0x0600);
        device.bond_state = BondState::None;
        let event = PrinterEvent::DeviceBondFailed((&device).into());
        assert_eq!(
            serde_json::to_value(&event).unwrap()["event"],
            json!("device-bond-failed")
        );
        assert_eq!(event.channel_method(), "onBltBondNone");
        assert_eq!(event.address(), Some("A"));
    }
}
