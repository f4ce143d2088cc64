//! # Intermediate Representation (IR)
//!
//! This module provides the IR layer between laid-out receipt elements and
//! raw ESC/POS bytes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────┐
//! │ PrintElement │ ──► │  Vec<Line>   │ ──► │ Codegen  │
//! │   (layout)   │     │ (Ops + term) │     │ (bytes)  │
//! └──────────────┘     └──────────────┘     └──────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use bonprint::ir::{Control, Line, Program};
//! use bonprint::printer::PrinterProfile;
//!
//! let mut program = Program::new();
//! program.push(Line::new().control(Control::AlignCenter).text("HELLO"));
//!
//! // Inspect the IR
//! println!("{:#?}", program);
//!
//! let bytes = program.to_bytes(&PrinterProfile::default());
//! assert_eq!(&bytes[..3], &[0x1B, 0x61, 0x01]);
//! ```

mod codegen;
mod ops;

// Re-export the ops types (codegen adds methods to Program and Line via impl)
pub use ops::*;
