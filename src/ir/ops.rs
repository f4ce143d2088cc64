//! # IR Opcodes
//!
//! This module defines the intermediate representation between laid-out
//! receipt elements and ESC/POS bytes.
//!
//! ## Design Philosophy
//!
//! ```text
//! PrintElement → Layout → Lines of Ops (inspectable) → Codegen → Bytes
//! ```
//!
//! Fixed printer controls are plain [`Control`] values whose bytes come from
//! a single table ([`Control::bytes`]). A [`Line`] is the unit the layout
//! engine produces: the ops for exactly one physical printer line, plus
//! whether the standard line terminator follows.

use crate::document::ImageHandle;
use crate::protocol::commands::{self, Alignment, CharSize};

// ============================================================================
// CONTROL TABLE
// ============================================================================

const RESET: [u8; 2] = commands::init();
const ALIGN_LEFT: [u8; 3] = commands::align(Alignment::Left);
const ALIGN_CENTER: [u8; 3] = commands::align(Alignment::Center);
const ALIGN_RIGHT: [u8; 3] = commands::align(Alignment::Right);
const BOLD_ON: [u8; 3] = commands::bold(true);
const BOLD_OFF: [u8; 3] = commands::bold(false);
const FONT_NORMAL: [u8; 3] = commands::char_size(CharSize::Normal);
const FONT_DOUBLE_HEIGHT: [u8; 3] = commands::char_size(CharSize::DoubleHeight);
const FONT_DOUBLE_WIDTH: [u8; 3] = commands::char_size(CharSize::DoubleWidth);
const FONT_DOUBLE_BOTH: [u8; 3] = commands::char_size(CharSize::DoubleBoth);

/// Fixed-byte printer controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Reset,
    AlignLeft,
    AlignCenter,
    AlignRight,
    BoldOn,
    BoldOff,
    FontNormal,
    FontDoubleHeight,
    FontDoubleWidth,
    FontDoubleBoth,
}

impl Control {
    /// Exact bytes for this control.
    ///
    /// | Control | Bytes |
    /// |---------|-------|
    /// | Reset | `1B 40` |
    /// | AlignLeft / Center / Right | `1B 61 00` / `01` / `02` |
    /// | BoldOn / BoldOff | `1B 45 01` / `00` |
    /// | FontNormal / DoubleHeight / DoubleWidth / DoubleBoth | `1D 21 00` / `01` / `10` / `11` |
    pub const fn bytes(self) -> &'static [u8] {
        match self {
            Control::Reset => &RESET,
            Control::AlignLeft => &ALIGN_LEFT,
            Control::AlignCenter => &ALIGN_CENTER,
            Control::AlignRight => &ALIGN_RIGHT,
            Control::BoldOn => &BOLD_ON,
            Control::BoldOff => &BOLD_OFF,
            Control::FontNormal => &FONT_NORMAL,
            Control::FontDoubleHeight => &FONT_DOUBLE_HEIGHT,
            Control::FontDoubleWidth => &FONT_DOUBLE_WIDTH,
            Control::FontDoubleBoth => &FONT_DOUBLE_BOTH,
        }
    }

    pub const fn align(alignment: Alignment) -> Self {
        match alignment {
            Alignment::Left => Control::AlignLeft,
            Alignment::Center => Control::AlignCenter,
            Alignment::Right => Control::AlignRight,
        }
    }

    pub const fn font(size: CharSize) -> Self {
        match size {
            CharSize::Normal => Control::FontNormal,
            CharSize::DoubleHeight => Control::FontDoubleHeight,
            CharSize::DoubleWidth => Control::FontDoubleWidth,
            CharSize::DoubleBoth => Control::FontDoubleBoth,
        }
    }

    pub const fn bold(enabled: bool) -> Self {
        if enabled {
            Control::BoldOn
        } else {
            Control::BoldOff
        }
    }
}

// ============================================================================
// OPS
// ============================================================================

/// IR opcodes for one printer line.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Fixed control sequence from the table.
    Control(Control),

    /// Text, GBK-encoded at codegen.
    Text(String),

    /// Line feed.
    Newline,

    /// Line boundary marker. Contributes no bytes.
    Flush,

    /// Raster image at a left offset in dots.
    Image { image: ImageHandle, left_offset: u16 },
}

impl From<Control> for Op {
    fn from(control: Control) -> Self {
        Op::Control(control)
    }
}

/// Ops for one physical line.
///
/// `terminated` lines are followed by newline, normal font, left alignment
/// and a flush marker when encoded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Line {
    pub ops: Vec<Op>,
    pub terminated: bool,
}

impl Line {
    /// Empty terminated line.
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            terminated: true,
        }
    }

    /// Line that is not followed by the terminator (images).
    pub fn unterminated(ops: Vec<Op>) -> Self {
        Self {
            ops,
            terminated: false,
        }
    }

    pub fn control(mut self, control: Control) -> Self {
        self.ops.push(Op::Control(control));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.ops.push(Op::Text(text.into()));
        self
    }

    pub fn push(&mut self, op: impl Into<Op>) {
        self.ops.push(op.into());
    }

    /// Concatenated text of the line, ignoring controls.
    pub fn plain_text(&self) -> String {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// An ordered print job: the lines of every element in input order.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub lines: Vec<Line>,
}

impl Program {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    pub fn push(&mut self, line: Line) {
        self.lines.push(line);
    }

    pub fn extend(&mut self, lines: impl IntoIterator<Item = Line>) {
        self.lines.extend(lines);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }
}

impl FromIterator<Line> for Program {
    fn from_iter<T: IntoIterator<Item = Line>>(iter: T) -> Self {
        Self {
            lines: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Line;
    type IntoIter = std::slice::Iter<'a, Line>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_table() {
        assert_eq!(Control::Reset.bytes(), &[0x1B, 0x40]);
        assert_eq!(Control::AlignLeft.bytes(), &[0x1B, 0x61, 0x00]);
        assert_eq!(Control::AlignCenter.bytes(), &[0x1B, 0x61, 0x01]);
        assert_eq!(Control::AlignRight.bytes(), &[0x1B, 0x61, 0x02]);
        assert_eq!(Control::BoldOn.bytes(), &[0x1B, 0x45, 0x01]);
        assert_eq!(Control::BoldOff.bytes(), &[0x1B, 0x45, 0x00]);
        assert_eq!(Control::FontNormal.bytes(), &[0x1D, 0x21, 0x00]);
        assert_eq!(Control::FontDoubleHeight.bytes(), &[0x1D, 0x21, 0x01]);
        assert_eq!(Control::FontDoubleWidth.bytes(), &[0x1D, 0x21, 0x10]);
        assert_eq!(Control::FontDoubleBoth.bytes(), &[0x1D, 0x21, 0x11]);
    }

    #[test]
    fn test_control_mapping() {
        assert_eq!(Control::align(Alignment::Center), Control::AlignCenter);
        assert_eq!(Control::font(CharSize::DoubleHeight), Control::FontDoubleHeight);
        assert_eq!(Control::bold(false), Control::BoldOff);
    }

    #[test]
    fn test_line_builder() {
        let line = Line::new()
            .control(Control::AlignLeft)
            .text("Hello")
            .text(" world");
        assert!(line.terminated);
        assert_eq!(line.ops.len(), 3);
        assert_eq!(line.plain_text(), "Hello world");
    }

    #[test]
    fn test_program_push() {
        let mut program = Program::new();
        assert!(program.is_empty());
        program.push(Line::new().text("a"));
        program.extend([Line::new(), Line::new()]);
        assert_eq!(program.len(), 3);
    }
}
