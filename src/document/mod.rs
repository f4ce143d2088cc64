//! # Receipt Document Model
//!
//! Printable elements and the layout engine that turns them into printer
//! lines.
//!
//! ```
//! use bonprint::document::*;
//! use bonprint::printer::{AbsoluteFontSize, PrinterProfile};
//!
//! let receipt: Vec<PrintElement> = vec![
//!     Title::new("Order #42").into(),
//!     Separator::default().into(),
//!     LeftRight::new("Total", "12.00").into(),
//! ];
//!
//! let profile = PrinterProfile::default();
//! let lines: Vec<_> = receipt
//!     .iter()
//!     .flat_map(|e| e.layout(AbsoluteFontSize::S0, &profile))
//!     .collect();
//! assert_eq!(lines.len(), 3);
//! ```

pub mod layout;
pub mod types;

pub use layout::{LayoutContext, column_widths};
pub use types::*;
