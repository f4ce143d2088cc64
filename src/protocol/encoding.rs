//! # GBK Encoding and Column Measurement
//!
//! Chinese receipt printers expect text in GBK, a double-byte character set
//! where ASCII takes one byte and CJK takes two. On a monospaced thermal head
//! the byte count is also the rendered width: one byte, one printer column.
//! Everything the layout engine does is expressed in these columns.
//!
//! ```text
//! "Total"   → 5 bytes → 5 columns
//! "合计"     → 4 bytes → 4 columns
//! "A合B"     → 4 bytes → 4 columns
//! ```
//!
//! Characters that GBK cannot represent are sent as `?` and measured as one
//! column, so `measure` and `encode` never disagree.

use encoding_rs::{EncoderResult, GBK};

/// Byte written in place of characters GBK cannot represent.
pub const UNMAPPABLE: u8 = b'?';

/// Encode text to GBK.
///
/// ## Example
///
/// ```
/// use bonprint::protocol::encoding::encode;
///
/// assert_eq!(encode("A"), vec![0x41]);
/// assert_eq!(encode("中"), vec![0xD6, 0xD0]);
/// ```
pub fn encode(text: &str) -> Vec<u8> {
    let mut encoder = GBK.new_encoder();
    let worst_case = |encoder: &encoding_rs::Encoder, len: usize| {
        encoder
            .max_buffer_length_from_utf8_without_replacement(len)
            .unwrap_or(len.saturating_mul(2))
            .max(4)
    };

    let mut out = Vec::with_capacity(worst_case(&encoder, text.len()));
    let mut rest = text;
    loop {
        let (result, read) =
            encoder.encode_from_utf8_to_vec_without_replacement(rest, &mut out, true);
        rest = &rest[read..];
        match result {
            EncoderResult::InputEmpty => return out,
            EncoderResult::OutputFull => out.reserve(worst_case(&encoder, rest.len())),
            EncoderResult::Unmappable(_) => out.push(UNMAPPABLE),
        }
    }
}

/// Rendered width of text in printer columns (its GBK byte length).
pub fn measure(text: &str) -> usize {
    if text.is_ascii() {
        return text.len();
    }
    encode(text).len()
}

/// Width of a single character in printer columns.
pub fn char_width(c: char) -> usize {
    if c.is_ascii() {
        return 1;
    }
    let mut buf = [0u8; 4];
    measure(c.encode_utf8(&mut buf))
}

// ============================================================================
// PADDING
// ============================================================================

/// Where the original text sits after padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillAlign {
    /// Text first, fill appended.
    Start,
    /// Fill prepended, text last.
    End,
    /// Fill on both sides; the leading side gets the smaller half.
    Center,
}

/// Pad `text` with `fill` until it measures at least `target` columns.
///
/// Text that already reaches `target` is returned unchanged; nothing is ever
/// truncated.
///
/// ## Example
///
/// ```
/// use bonprint::protocol::encoding::{pad, FillAlign};
///
/// assert_eq!(pad("ab", 5, FillAlign::Start, ' '), "ab   ");
/// assert_eq!(pad("ab", 5, FillAlign::End, ' '), "   ab");
/// assert_eq!(pad("ab", 5, FillAlign::Center, '*'), "*ab**");
/// assert_eq!(pad("合计", 3, FillAlign::Start, ' '), "合计");
/// ```
pub fn pad(text: &str, target: usize, align: FillAlign, fill: char) -> String {
    let width = measure(text);
    if width >= target {
        return text.to_string();
    }

    let fill_width = char_width(fill).max(1);
    let copies = (target - width).div_ceil(fill_width);
    let (before, after) = match align {
        FillAlign::Start => (0, copies),
        FillAlign::End => (copies, 0),
        FillAlign::Center => (copies / 2, copies - copies / 2),
    };

    let mut out = String::with_capacity(text.len() + copies * fill.len_utf8());
    out.extend(std::iter::repeat_n(fill, before));
    out.push_str(text);
    out.extend(std::iter::repeat_n(fill, after));
    out
}

// ============================================================================
// SPLITTING
// ============================================================================

/// Split text into consecutive runs no wider than `max_columns`.
///
/// Each run except the last is as wide as possible without exceeding the
/// budget. Text that already fits comes back as a single run (including the
/// empty string). A character wider than the budget forms a run of its own
/// so the split always makes progress.
///
/// ## Example
///
/// ```
/// use bonprint::protocol::encoding::split_by_column_budget;
///
/// let runs: Vec<&str> = split_by_column_budget("红烧牛肉面", 4).collect();
/// assert_eq!(runs, vec!["红烧", "牛肉", "面"]);
/// ```
pub fn split_by_column_budget(text: &str, max_columns: usize) -> ColumnRuns<'_> {
    ColumnRuns::new(text, max_columns)
}

/// Iterator over the runs of [`split_by_column_budget`].
///
/// The iterator is `Clone`; cloning it before consumption restarts the split.
#[derive(Debug, Clone)]
pub struct ColumnRuns<'a> {
    text: &'a str,
    max_columns: usize,
    /// Per character: (byte offset just past it, cumulative width through it)
    bounds: Vec<(usize, usize)>,
    consumed: usize,
    fits: bool,
    done: bool,
}

impl<'a> ColumnRuns<'a> {
    fn new(text: &'a str, max_columns: usize) -> Self {
        let mut bounds = Vec::with_capacity(text.len());
        let mut total = 0;
        for (offset, c) in text.char_indices() {
            total += char_width(c);
            bounds.push((offset + c.len_utf8(), total));
        }

        Self {
            text,
            max_columns,
            bounds,
            consumed: 0,
            fits: total <= max_columns,
            done: false,
        }
    }
}

impl<'a> Iterator for ColumnRuns<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.fits {
            self.done = true;
            return Some(self.text);
        }
        if self.consumed >= self.bounds.len() {
            self.done = true;
            return None;
        }

        let (start, base) = match self.consumed {
            0 => (0, 0),
            n => self.bounds[n - 1],
        };

        // Cumulative widths are strictly increasing, so the fitting prefix is
        // found by binary search.
        let remaining = &self.bounds[self.consumed..];
        let fitting = remaining.partition_point(|&(_, cum)| cum - base <= self.max_columns);
        let end = self.consumed + fitting.max(1);

        self.consumed = end;
        Some(&self.text[start..self.bounds[end - 1].0])
    }
}
