//! # ESC/POS Protocol Implementation
//!
//! This module provides low-level command builders for the ESC/POS dialect
//! spoken by small Bluetooth receipt printers, plus the GBK text encoding
//! those printers expect.
//!
//! ## Module Structure
//!
//! - [`commands`]: Initialization, alignment, emphasis, character size
//! - [`graphics`]: Left margin and raster bit images
//! - [`encoding`]: GBK encoding, column measurement, padding, splitting
//!
//! ## Usage Example
//!
//! ```
//! use bonprint::protocol::{commands, encoding};
//! use bonprint::protocol::commands::{Alignment, CharSize};
//!
//! let mut data = Vec::new();
//! data.extend(commands::init());
//! data.extend(commands::align(Alignment::Center));
//! data.extend(commands::char_size(CharSize::DoubleBoth));
//! data.extend(encoding::encode("收银小票"));
//! data.push(commands::LF);
//! ```

pub mod commands;
pub mod encoding;
pub mod graphics;
