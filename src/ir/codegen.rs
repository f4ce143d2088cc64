//! # Code Generation
//!
//! Converts IR programs to ESC/POS bytes.

use super::ops::{Control, Line, Op, Program};
use crate::printer::PrinterProfile;
use crate::protocol::{commands, encoding, graphics};

/// Ops appended to every terminated line.
static TERMINATOR: [Op; 4] = [
    Op::Newline,
    Op::Control(Control::FontNormal),
    Op::Control(Control::AlignLeft),
    Op::Flush,
];

impl Program {
    /// Compile the program to ESC/POS bytes for a printer profile.
    ///
    /// A job is prefixed with `ESC @` when the profile asks for it.
    pub fn to_bytes(&self, profile: &PrinterProfile) -> Vec<u8> {
        let mut out = Vec::new();
        if profile.reset_before_print && !self.is_empty() {
            out.extend_from_slice(Control::Reset.bytes());
        }
        for line in &self.lines {
            line.encode_into(&mut out, profile);
        }
        out
    }
}

impl Line {
    /// Append this line's bytes, terminator included.
    pub fn encode_into(&self, out: &mut Vec<u8>, profile: &PrinterProfile) {
        let tail: &[Op] = if self.terminated { &TERMINATOR } else { &[] };
        for op in self.ops.iter().chain(tail) {
            encode_op(op, out, profile);
        }
    }

    /// This line's bytes.
    pub fn to_bytes(&self, profile: &PrinterProfile) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out, profile);
        out
    }
}

fn encode_op(op: &Op, out: &mut Vec<u8>, profile: &PrinterProfile) {
    match op {
        Op::Control(control) => out.extend_from_slice(control.bytes()),
        Op::Text(s) => out.extend(encoding::encode(s)),
        Op::Newline => out.push(commands::LF),
        Op::Flush => {}
        Op::Image { image, left_offset } => {
            // Bitmaps are dropped on printers that cannot take them.
            if !profile.supports_bitmap {
                return;
            }
            out.extend(graphics::left_margin(*left_offset));
            out.extend(graphics::raster(
                image.width_bytes(),
                image.height(),
                image.data(),
            ));
            out.extend(graphics::left_margin(0));
        }
    }
}
