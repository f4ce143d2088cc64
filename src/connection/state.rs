//! Device records and connection state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Platform identifier of a device: a MAC address on classic Bluetooth, a
/// UUID string on platforms that hide addresses.
///
/// MAC addresses are stored upper-case so `aa:bb:..` and `AA:BB:..` name the
/// same device. Other identifiers are kept as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        if is_valid_mac(&id) {
            Self(id.to_ascii_uppercase())
        } else {
            Self(id)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

/// `XX:XX:XX:XX:XX:XX` with hex digits in either case.
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return false;
    }
    parts
        .iter()
        .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Radio technology of a device. Discriminants are the Android codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceKind {
    #[default]
    Unknown = 0,
    Classic = 1,
    Le = 2,
    Dual = 3,
}

impl DeviceKind {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Pairing state. Discriminants are the Android codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BondState {
    #[default]
    None = 10,
    Bonding = 11,
    Bonded = 12,
}

impl BondState {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// A device reported by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub id: DeviceId,
    pub name: String,
    pub kind: DeviceKind,
    /// Major device class (e.g. 0x0600 imaging).
    pub class: u16,
    pub bond_state: BondState,
}

impl DiscoveredDevice {
    pub fn new(id: impl Into<DeviceId>, name: impl Into<String>, class: u16) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: DeviceKind::Classic,
            class,
            bond_state: BondState::None,
        }
    }

    pub fn bonded(mut self) -> Self {
        self.bond_state = BondState::Bonded;
        self
    }

    pub fn kind(mut self, kind: DeviceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_bonded(&self) -> bool {
        self.bond_state == BondState::Bonded
    }
}

/// Discovered devices in first-seen order, one entry per id.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<DiscoveredDevice>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a device or update the existing entry in place.
    ///
    /// Returns `true` if the id was not known before.
    pub fn upsert(&mut self, device: DiscoveredDevice) -> bool {
        match self.devices.iter_mut().find(|d| d.id == device.id) {
            Some(existing) => {
                *existing = device;
                false
            }
            None => {
                self.devices.push(device);
                true
            }
        }
    }

    pub fn get(&self, id: &DeviceId) -> Option<&DiscoveredDevice> {
        self.devices.iter().find(|d| &d.id == id)
    }

    /// Record a bond state change. Unknown ids are ignored.
    pub fn set_bond_state(&mut self, id: &DeviceId, state: BondState) -> Option<&DiscoveredDevice> {
        let device = self.devices.iter_mut().find(|d| &d.id == id)?;
        device.bond_state = state;
        Some(device)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiscoveredDevice> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Externally visible connection state.
///
/// `Discovering` is reported only while no link is being set up or held;
/// scanning while connected still reads as `Connected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Discovering,
    Bonding(DeviceId),
    Connecting(DeviceId),
    Connected(DeviceId),
    Disconnecting(DeviceId),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_dedupes_and_keeps_order() {
        let mut registry = DeviceRegistry::new();
        assert!(registry.upsert(DiscoveredDevice::new("A", "Printer A", 0x0600)));
        assert!(registry.upsert(DiscoveredDevice::new("B", "Phone", 0x0200)));
        assert!(!registry.upsert(DiscoveredDevice::new("A", "Printer A2", 0x0600).bonded()));

        let ids: Vec<_> = registry.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        let a = registry.get(&DeviceId::from("A")).unwrap();
        assert_eq!(a.name, "Printer A2");
        assert!(a.is_bonded());
    }

    #[test]
    fn test_mac_ids_ignore_case() {
        assert_eq!(DeviceId::from("66:22:b3:1c:07:9a"), DeviceId::from("66:22:B3:1C:07:9A"));
        assert_eq!(DeviceId::from("66:22:b3:1c:07:9a").as_str(), "66:22:B3:1C:07:9A");
        // Platform UUIDs are opaque
        assert_eq!(DeviceId::from("e2c56db5-dffb").as_str(), "e2c56db5-dffb");

        let id: DeviceId = serde_json::from_str(r#""aa:bb:cc:dd:ee:ff""#).unwrap();
        assert_eq!(id.as_str(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_set_bond_state() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(DiscoveredDevice::new("A", "Printer", 0x0600));
        let id = DeviceId::from("A");
        assert_eq!(
            registry.set_bond_state(&id, BondState::Bonding).map(|d| d.bond_state),
            Some(BondState::Bonding)
        );
        assert!(registry.set_bond_state(&DeviceId::from("Z"), BondState::Bonded).is_none());
    }

    #[test]
    fn test_android_codes() {
        assert_eq!(DeviceKind::Dual.code(), 3);
        assert_eq!(BondState::None.code(), 10);
        assert_eq!(BondState::Bonded.code(), 12);
    }
}
