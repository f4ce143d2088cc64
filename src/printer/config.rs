//! # Printer Profile
//!
//! This module defines the hardware and link characteristics of a supported
//! printer family.
//!
//! ## Reference Profile
//!
//! | Property | Value |
//! |----------|-------|
//! | Paper | 58mm |
//! | Line budget | 32 columns (Font A, 12×24) |
//! | Chunk limit | 32 bytes per transport write |
//! | Device class | 0x0600 (Imaging) |
//! | Encoding | GBK |
//!
//! ## Usage
//!
//! ```
//! use bonprint::printer::PrinterProfile;
//! use bonprint::protocol::commands::CharSize;
//!
//! let profile = PrinterProfile::default();
//! assert_eq!(profile.columns_for(CharSize::Normal), 32);
//! assert_eq!(profile.columns_for(CharSize::DoubleBoth), 16);
//! ```
//!
//! Profiles are plain serde structs, so a partial JSON file overrides only
//! the fields it names:
//!
//! ```json
//! { "name": "80mm kitchen", "line_budget": 48, "supports_bitmap": true }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BonprintError, Result};
use crate::protocol::commands::CharSize;

/// Bluetooth major device class for imaging devices (printers, scanners).
pub const MAJOR_CLASS_IMAGING: u16 = 0x0600;

/// # Printer Profile
///
/// Layout, encoding and link parameters for one printer family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterProfile {
    /// Human-readable name
    pub name: String,

    /// Columns on one physical line at normal width
    pub line_budget: usize,

    /// Maximum bytes accepted by one transport write
    pub chunk_limit: usize,

    /// Major device classes that auto-connect treats as printers
    pub printer_classes: Vec<u16>,

    /// Start bonding/connecting with the first matching discovery
    pub auto_connect: bool,

    /// Cancel discovery once a printer is connected
    pub stop_scan_after_connect: bool,

    /// Whether raster images are encoded or dropped
    pub supports_bitmap: bool,

    /// Prefix every print job with `ESC @`
    pub reset_before_print: bool,

    /// `/dev/rfcommN` index used when binding a classic link
    pub rfcomm_channel: u8,

    /// Pause between chunks on unacknowledged links (milliseconds)
    pub chunk_delay_ms: u64,
}

impl PrinterProfile {
    /// # Reference Profile
    ///
    /// The 58mm Bluetooth printers shipped with Android POS handsets.
    pub fn reference() -> Self {
        Self {
            name: "reference".to_string(),
            line_budget: 32,
            chunk_limit: 32,
            printer_classes: vec![MAJOR_CLASS_IMAGING],
            auto_connect: true,
            stop_scan_after_connect: true,
            supports_bitmap: false,
            reset_before_print: false,
            rfcomm_channel: 0,
            chunk_delay_ms: 2,
        }
    }

    /// # Reference Profile over BLE
    ///
    /// Same printers reached over GATT: jobs start with `ESC @` and raster
    /// images are forwarded.
    pub fn reference_ble() -> Self {
        Self {
            name: "reference-ble".to_string(),
            supports_bitmap: true,
            reset_before_print: true,
            chunk_delay_ms: 0,
            ..Self::reference()
        }
    }

    /// Columns available on one line at the given character size.
    #[inline]
    pub fn columns_for(&self, size: CharSize) -> usize {
        self.line_budget / size.width_scale()
    }

    /// Parse a profile from JSON. Missing fields keep reference values.
    pub fn from_json(json: &str) -> Result<Self> {
        let profile: Self = serde_json::from_str(json)
            .map_err(|e| BonprintError::InvalidInput(format!("profile: {}", e)))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load a JSON profile from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Resolve a built-in profile name or a path to a JSON profile.
    pub fn parse(s: &str) -> Result<Self> {
        if let Some(profile) = Self::built_in().into_iter().find(|p| p.name == s) {
            return Ok(profile);
        }
        if Path::new(s).exists() {
            return Self::load(s);
        }
        Err(BonprintError::InvalidInput(format!(
            "Unknown profile '{}'. Use 'reference', 'reference-ble' or a JSON file",
            s
        )))
    }

    /// List all built-in profiles.
    pub fn built_in() -> Vec<Self> {
        vec![Self::reference(), Self::reference_ble()]
    }

    /// Reject profiles that cannot lay out a line or chunk a write.
    pub fn validate(&self) -> Result<()> {
        if self.line_budget < 2 {
            return Err(BonprintError::InvalidInput(
                "profile: line_budget must be at least 2".to_string(),
            ));
        }
        if self.chunk_limit == 0 {
            return Err(BonprintError::InvalidInput(
                "profile: chunk_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PrinterProfile {
    fn default() -> Self {
        Self::reference()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_dimensions() {
        let profile = PrinterProfile::reference();
        assert_eq!(profile.line_budget, 32);
        assert_eq!(profile.chunk_limit, 32);
        assert_eq!(profile.printer_classes, vec![MAJOR_CLASS_IMAGING]);
    }

    #[test]
    fn test_columns_for_sizes() {
        let profile = PrinterProfile::reference();
        assert_eq!(profile.columns_for(CharSize::Normal), 32);
        assert_eq!(profile.columns_for(CharSize::DoubleHeight), 32);
        assert_eq!(profile.columns_for(CharSize::DoubleWidth), 16);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let profile =
            PrinterProfile::from_json(r#"{"name": "wide", "line_budget": 48}"#).unwrap();
        assert_eq!(profile.name, "wide");
        assert_eq!(profile.line_budget, 48);
        assert_eq!(profile.chunk_limit, 32);
        assert_eq!(profile.printer_classes, vec![MAJOR_CLASS_IMAGING]);
    }

    #[test]
    fn test_invalid_json_profile() {
        assert!(matches!(
            PrinterProfile::from_json(r#"{"chunk_limit": 0}"#),
            Err(BonprintError::InvalidInput(_))
        ));
        assert!(PrinterProfile::from_json("not json").is_err());
    }

    #[test]
    fn test_parse_built_in() {
        assert_eq!(
            PrinterProfile::parse("reference-ble").unwrap(),
            PrinterProfile::reference_ble()
        );
        assert!(PrinterProfile::parse("no-such-profile").is_err());
    }
}
