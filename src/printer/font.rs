//! # Font Sizes
//!
//! Elements name their size *relative* to a base size chosen when the
//! session opens. The effective absolute size is the clamped sum:
//!
//! ```text
//! absolute = min(base + relative, 3)
//! ```
//!
//! | Absolute | Character size | Budget scale |
//! |----------|----------------|--------------|
//! | S0 | normal | 1 |
//! | S1 | normal | 1 |
//! | S2 | double height | 1 |
//! | S3 | double width + height | 1/2 |

use serde::{Deserialize, Serialize};

use crate::protocol::commands::CharSize;

/// Absolute font size, also used as the session base size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum AbsoluteFontSize {
    #[default]
    S0 = 0,
    S1 = 1,
    S2 = 2,
    S3 = 3,
}

impl AbsoluteFontSize {
    /// Size for an ordinal, clamping anything above 3.
    pub const fn from_ordinal(n: u8) -> Self {
        match n {
            0 => Self::S0,
            1 => Self::S1,
            2 => Self::S2,
            _ => Self::S3,
        }
    }

    /// The `GS !` character size printed for this size.
    pub const fn char_size(self) -> CharSize {
        match self {
            Self::S0 | Self::S1 => CharSize::Normal,
            Self::S2 => CharSize::DoubleHeight,
            Self::S3 => CharSize::DoubleBoth,
        }
    }

    /// Glyph used to draw separator lines at this size.
    pub const fn separator_glyph(self) -> char {
        match self {
            Self::S0 => '-',
            Self::S1 => '_',
            Self::S2 => '*',
            Self::S3 => '#',
        }
    }
}

/// Font size relative to the session base size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum RelativeFontSize {
    R0 = 0,
    #[default]
    R1 = 1,
    R2 = 2,
    R3 = 3,
}

impl RelativeFontSize {
    /// Relative size for an ordinal, clamping anything above 3.
    pub const fn from_ordinal(n: u8) -> Self {
        match n {
            0 => Self::R0,
            1 => Self::R1,
            2 => Self::R2,
            _ => Self::R3,
        }
    }

    /// Resolve against the session base size. Saturates at [`AbsoluteFontSize::S3`].
    pub const fn resolve(self, base: AbsoluteFontSize) -> AbsoluteFontSize {
        AbsoluteFontSize::from_ordinal(base as u8 + self as u8)
    }
}
