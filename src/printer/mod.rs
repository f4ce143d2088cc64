//! # Printer Module
//!
//! This module provides printer-specific configuration.
//!
//! ## Modules
//!
//! - [`config`]: Printer profile (line budget, chunk limit, link parameters)
//! - [`font`]: Relative/absolute font sizes and their character sizes

pub mod config;
pub mod font;

pub use config::PrinterProfile;
pub use font::{AbsoluteFontSize, RelativeFontSize};
