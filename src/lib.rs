//! # bonprint - Bluetooth Receipt Printer Driver
//!
//! bonprint drives small ESC/POS thermal printers over Bluetooth. It
//! provides:
//!
//! - **Layout**: receipt elements laid out on a fixed column budget, with
//!   GBK-aware width measurement (CJK characters take two columns)
//! - **Encoding**: ESC/POS byte generation through a single command table
//! - **Connection**: a sans-IO discovery/bond/connect state machine
//! - **Session**: chunked writes on a background worker with success and
//!   failure events
//!
//! ## Quick Start
//!
//! ```
//! use bonprint::document::*;
//! use bonprint::pipeline;
//! use bonprint::printer::{AbsoluteFontSize, PrinterProfile};
//!
//! let receipt: Vec<PrintElement> = vec![
//!     Title::new("收银小票").into(),
//!     Separator::default().into(),
//!     Table::new(vec!["Item".into(), "Qty".into(), "Price".into()], vec![2, 1, 1])?.into(),
//!     LeftRight::new("Total", "12.00").into(),
//!     Blank::new(3).into(),
//! ];
//!
//! let bytes = pipeline::render(&receipt, AbsoluteFontSize::S0, &PrinterProfile::default());
//! assert!(!bytes.is_empty());
//! # Ok::<(), bonprint::BonprintError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | ESC/POS command builders and GBK encoding |
//! | [`document`] | Print elements and the layout engine |
//! | [`ir`] | Line directives and byte encoding |
//! | [`json_api`] | JSON element descriptors |
//! | [`pipeline`] | Elements to bytes |
//! | [`connection`] | Connection state machine and events |
//! | [`writer`] | Chunked writes and completion tracking |
//! | [`transport`] | Adapter/transport traits, RFCOMM and in-memory backends |
//! | [`session`] | The caller-facing printer session |
//! | [`printer`] | Printer profiles and font sizes |
//! | [`error`] | Error types |

pub mod connection;
pub mod document;
pub mod error;
pub mod ir;
pub mod json_api;
pub mod pipeline;
pub mod printer;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod writer;

// Re-exports for convenience
pub use connection::{LinkEvent, PrinterEvent};
pub use document::PrintElement;
pub use error::BonprintError;
pub use printer::PrinterProfile;
pub use session::{PrintJob, Session, SessionOptions};
