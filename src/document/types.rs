//! Element types for receipt documents.
//!
//! Each printable element is its own struct wrapped by [`PrintElement`].
//! Plain elements expose public fields and a `new` plus builder setters;
//! [`Table`] and [`MultiFont`] validate their parallel inputs and keep their
//! fields private so an invalid value cannot be built.

use std::sync::Arc;

use crate::error::{BonprintError, Result};
use crate::printer::RelativeFontSize;

/// One printable element of a receipt.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintElement {
    Title(Title),
    LineCentered(LineCentered),
    Left(Left),
    Right(Right),
    MultiFont(MultiFont),
    LeftRight(LeftRight),
    Table(Table),
    Separator(Separator),
    Blank(Blank),
    RawImage(RawImage),
}

// ============================================================================
// TEXT ELEMENTS
// ============================================================================

/// Centered headline.
#[derive(Debug, Clone, PartialEq)]
pub struct Title {
    pub text: String,
    pub size: RelativeFontSize,
    pub bold: bool,
}

impl Title {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: RelativeFontSize::R2,
            bold: false,
        }
    }

    pub fn size(mut self, size: RelativeFontSize) -> Self {
        self.size = size;
        self
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }
}

/// Text centered between runs of a fill string, e.g. `****合计****`.
#[derive(Debug, Clone, PartialEq)]
pub struct LineCentered {
    pub text: String,
    pub fill: String,
    pub size: RelativeFontSize,
    pub bold: bool,
}

impl LineCentered {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fill: "*".to_string(),
            size: RelativeFontSize::R1,
            bold: false,
        }
    }

    pub fn fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = fill.into();
        self
    }

    pub fn size(mut self, size: RelativeFontSize) -> Self {
        self.size = size;
        self
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }
}

/// Left-aligned text.
#[derive(Debug, Clone, PartialEq)]
pub struct Left {
    pub text: String,
    pub size: RelativeFontSize,
}

impl Left {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: RelativeFontSize::R1,
        }
    }

    pub fn size(mut self, size: RelativeFontSize) -> Self {
        self.size = size;
        self
    }
}

/// Right-aligned text.
#[derive(Debug, Clone, PartialEq)]
pub struct Right {
    pub text: String,
    pub size: RelativeFontSize,
}

impl Right {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: RelativeFontSize::R1,
        }
    }

    pub fn size(mut self, size: RelativeFontSize) -> Self {
        self.size = size;
        self
    }
}

/// Right-aligned segments, each in its own size, printed on one line.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiFont {
    segments: Vec<(String, RelativeFontSize)>,
}

impl MultiFont {
    /// Pair texts with sizes. The two lists must have the same length.
    pub fn new(texts: Vec<String>, sizes: Vec<RelativeFontSize>) -> Result<Self> {
        if texts.len() != sizes.len() {
            return Err(BonprintError::InvalidInput(format!(
                "multi-font element has {} texts but {} font sizes",
                texts.len(),
                sizes.len()
            )));
        }
        Ok(Self {
            segments: texts.into_iter().zip(sizes).collect(),
        })
    }

    pub fn segments(&self) -> &[(String, RelativeFontSize)] {
        &self.segments
    }
}

/// Label on the left, value on the right, e.g. `Total ........ 12.00`.
#[derive(Debug, Clone, PartialEq)]
pub struct LeftRight {
    pub left: String,
    pub right: String,
    pub size: RelativeFontSize,
}

impl LeftRight {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            size: RelativeFontSize::R1,
        }
    }

    pub fn size(mut self, size: RelativeFontSize) -> Self {
        self.size = size;
        self
    }
}

// ============================================================================
// TABLE
// ============================================================================

/// One table cell with its relative column weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub text: String,
    pub weight: u32,
}

/// A row of weighted columns sharing the line budget.
///
/// Long cells wrap onto extra physical lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    size: RelativeFontSize,
}

impl Table {
    /// Build a table row from parallel text and weight lists.
    ///
    /// Rejects mismatched lengths, an empty row and an all-zero weight sum.
    pub fn new(texts: Vec<String>, weights: Vec<u32>) -> Result<Self> {
        if texts.len() != weights.len() {
            return Err(BonprintError::InvalidInput(format!(
                "table has {} texts but {} column weights",
                texts.len(),
                weights.len()
            )));
        }
        if texts.is_empty() {
            return Err(BonprintError::InvalidInput(
                "table needs at least one column".to_string(),
            ));
        }
        if weights.iter().map(|&w| u64::from(w)).sum::<u64>() == 0 {
            return Err(BonprintError::InvalidInput(
                "table column weights sum to zero".to_string(),
            ));
        }

        let columns = texts
            .into_iter()
            .zip(weights)
            .map(|(text, weight)| Column { text, weight })
            .collect();
        Ok(Self {
            columns,
            size: RelativeFontSize::R1,
        })
    }

    pub fn size(mut self, size: RelativeFontSize) -> Self {
        self.size = size;
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn font_size(&self) -> RelativeFontSize {
        self.size
    }
}

// ============================================================================
// RULES AND SPACING
// ============================================================================

/// Full-width separator line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separator {
    pub size: RelativeFontSize,
}

impl Separator {
    pub fn new(size: RelativeFontSize) -> Self {
        Self { size }
    }
}

impl Default for Separator {
    fn default() -> Self {
        Self::new(RelativeFontSize::R0)
    }
}

/// Blank lines, optionally carrying a fill string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blank {
    pub line_count: usize,
    pub fill: String,
}

impl Blank {
    pub fn new(line_count: usize) -> Self {
        Self {
            line_count,
            fill: String::new(),
        }
    }

    pub fn fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = fill.into();
        self
    }
}

impl Default for Blank {
    fn default() -> Self {
        Self::new(3)
    }
}

// ============================================================================
// IMAGES
// ============================================================================

/// Pre-rendered 1-bit raster, row-major, MSB = leftmost dot.
///
/// Conversion from pictures is done by the caller; the data is passed
/// through untouched. Cloning shares the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    width_bytes: u16,
    height: u16,
    data: Arc<[u8]>,
}

impl ImageHandle {
    /// Wrap raster data. `data` must hold exactly `width_bytes * height` bytes.
    pub fn new(width_bytes: u16, height: u16, data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let data = data.into();
        let expected = usize::from(width_bytes) * usize::from(height);
        if data.len() != expected {
            return Err(BonprintError::InvalidInput(format!(
                "image data is {} bytes, expected {} ({} x {})",
                data.len(),
                expected,
                width_bytes,
                height
            )));
        }
        Ok(Self {
            width_bytes,
            height,
            data,
        })
    }

    pub fn width_bytes(&self) -> u16 {
        self.width_bytes
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// A raster image printed at a left offset (in dots).
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub image: ImageHandle,
    pub left_offset: u16,
}

impl RawImage {
    pub fn new(image: ImageHandle, left_offset: u16) -> Self {
        Self { image, left_offset }
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

macro_rules! impl_from_element {
    ($($ty:ident),* $(,)?) => {
        $(
            impl From<$ty> for PrintElement {
                fn from(element: $ty) -> Self {
                    PrintElement::$ty(element)
                }
            }
        )*
    };
}

impl_from_element!(
    Title,
    LineCentered,
    Left,
    Right,
    MultiFont,
    LeftRight,
    Table,
    Separator,
    Blank,
    RawImage,
);
