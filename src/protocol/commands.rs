//! # ESC/POS Protocol Commands
//!
//! This module implements the subset of the ESC/POS command set spoken by
//! small 58mm Bluetooth receipt printers (the "reference profile").
//!
//! ## Escape Sequence Structure
//!
//! Commands follow these patterns:
//! - Single byte: `LF`
//! - Two bytes: `ESC @`
//! - Three bytes with a parameter: `ESC a n`, `ESC E n`, `GS ! n`
//!
//! ## Byte Order
//!
//! Multi-byte integers use **little-endian** encoding:
//! - `u16` value 0x1234 is sent as bytes `[0x34, 0x12]`

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - Command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix
///
/// Used for character size, margins and raster graphics.
pub const GS: u8 = 0x1D;

/// LF (Line Feed) - Print the line buffer and advance one line
pub const LF: u8 = 0x0A;

// ============================================================================
// INITIALIZATION
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// Clears the print buffer and resets modes to power-on defaults.
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
///
/// ## Example
///
/// ```
/// use bonprint::protocol::commands;
///
/// assert_eq!(commands::init(), [0x1B, 0x40]);
/// ```
#[inline]
pub const fn init() -> [u8; 2] {
    [ESC, b'@']
}

// ============================================================================
// TEXT ALIGNMENT
// ============================================================================

/// Text alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// # Select Justification (ESC a n)
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | ESC a n  |
/// | Hex     | 1B 61 n  |
///
/// - `n = 0`: Left (default)
/// - `n = 1`: Center
/// - `n = 2`: Right
///
/// Takes effect at the start of a line and stays until changed or reset.
#[inline]
pub const fn align(alignment: Alignment) -> [u8; 3] {
    [ESC, b'a', alignment as u8]
}

// ============================================================================
// EMPHASIS
// ============================================================================

/// # Turn Emphasized Mode On/Off (ESC E n)
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | ESC E n  |
/// | Hex     | 1B 45 n  |
///
/// Only the lowest bit of `n` is significant.
#[inline]
pub const fn bold(enabled: bool) -> [u8; 3] {
    [ESC, b'E', enabled as u8]
}

// ============================================================================
// CHARACTER SIZE
// ============================================================================

/// Character size selected with `GS !`.
///
/// The high nibble of the parameter scales width, the low nibble scales
/// height. This profile only uses 1x and 2x in each direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharSize {
    #[default]
    Normal = 0x00,
    DoubleHeight = 0x01,
    DoubleWidth = 0x10,
    DoubleBoth = 0x11,
}

impl CharSize {
    /// Horizontal magnification (1 or 2).
    ///
    /// Line budgets are divided by this factor.
    pub const fn width_scale(self) -> usize {
        match self {
            CharSize::Normal | CharSize::DoubleHeight => 1,
            CharSize::DoubleWidth | CharSize::DoubleBoth => 2,
        }
    }
}

/// # Select Character Size (GS ! n)
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | GS ! n   |
/// | Hex     | 1D 21 n  |
///
/// ## Example
///
/// ```
/// use bonprint::protocol::commands::{char_size, CharSize};
///
/// assert_eq!(char_size(CharSize::DoubleBoth), [0x1D, 0x21, 0x11]);
/// ```
#[inline]
pub const fn char_size(size: CharSize) -> [u8; 3] {
    [GS, b'!', size as u8]
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Encode a u16 value as little-endian bytes [low, high]
#[inline]
pub const fn u16_le(value: u16) -> [u8; 2] {
    [value as u8, (value >> 8) as u8]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert_eq!(init(), [0x1B, 0x40]);
    }

    #[test]
    fn test_align() {
        assert_eq!(align(Alignment::Left), [0x1B, 0x61, 0x00]);
        assert_eq!(align(Alignment::Center), [0x1B, 0x61, 0x01]);
        assert_eq!(align(Alignment::Right), [0x1B, 0x61, 0x02]);
    }

    #[test]
    fn test_bold() {
        assert_eq!(bold(true), [0x1B, 0x45, 0x01]);
        assert_eq!(bold(false), [0x1B, 0x45, 0x00]);
    }

    #[test]
    fn test_char_size() {
        assert_eq!(char_size(CharSize::Normal), [0x1D, 0x21, 0x00]);
        assert_eq!(char_size(CharSize::DoubleHeight), [0x1D, 0x21, 0x01]);
        assert_eq!(char_size(CharSize::DoubleWidth), [0x1D, 0x21, 0x10]);
        assert_eq!(char_size(CharSize::DoubleBoth), [0x1D, 0x21, 0x11]);
    }

    #[test]
    fn test_width_scale() {
        assert_eq!(CharSize::Normal.width_scale(), 1);
        assert_eq!(CharSize::DoubleHeight.width_scale(), 1);
        assert_eq!(CharSize::DoubleWidth.width_scale(), 2);
        assert_eq!(CharSize::DoubleBoth.width_scale(), 2);
    }

    #[test]
    fn test_u16_le() {
        assert_eq!(u16_le(0x1234), [0x34, 0x12]);
        assert_eq!(u16_le(384), [0x80, 0x01]);
    }
}
