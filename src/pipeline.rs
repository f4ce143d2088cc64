//! # Print Pipeline
//!
//! Elements in, bytes out. Each element is laid out into lines, the lines
//! are collected into one [`Program`] in input order, and the program is
//! encoded once. Nothing here touches a transport.
//!
//! ```
//! use bonprint::document::*;
//! use bonprint::pipeline;
//! use bonprint::printer::{AbsoluteFontSize, PrinterProfile};
//!
//! let elements: Vec<PrintElement> = vec![LeftRight::new("Total", "12.00").into()];
//! let bytes = pipeline::render(&elements, AbsoluteFontSize::S0, &PrinterProfile::default());
//!
//! // font normal, bold off, align left, then the padded 32-column line
//! assert!(bytes.starts_with(&[0x1D, 0x21, 0x00, 0x1B, 0x45, 0x00, 0x1B, 0x61, 0x00]));
//! ```

use tracing::debug;

use crate::document::PrintElement;
use crate::error::Result;
use crate::ir::Program;
use crate::json_api::parse_descriptors;
use crate::printer::{AbsoluteFontSize, PrinterProfile};

/// Lay out every element into one program.
pub fn compile(
    elements: &[PrintElement],
    base: AbsoluteFontSize,
    profile: &PrinterProfile,
) -> Program {
    elements
        .iter()
        .flat_map(|element| element.layout(base, profile))
        .collect()
}

/// Render elements to the byte stream sent to the printer.
pub fn render(elements: &[PrintElement], base: AbsoluteFontSize, profile: &PrinterProfile) -> Vec<u8> {
    let program = compile(elements, base, profile);
    let bytes = program.to_bytes(profile);
    debug!(
        elements = elements.len(),
        lines = program.len(),
        bytes = bytes.len(),
        "rendered"
    );
    bytes
}

/// Parse JSON descriptors and render them.
pub fn render_descriptors(
    json: &str,
    base: AbsoluteFontSize,
    profile: &PrinterProfile,
) -> Result<Vec<u8>> {
    let elements = parse_descriptors(json)?;
    Ok(render(&elements, base, profile))
}
