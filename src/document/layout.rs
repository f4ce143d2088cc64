//! # Line Layout
//!
//! Turns each [`PrintElement`] into physical printer lines.
//!
//! All widths are printer columns as measured by
//! [`encoding::measure`](crate::protocol::encoding::measure). The budget for
//! an element is the profile's line budget divided by the horizontal scale of
//! the element's character size:
//!
//! | Effective size | Character size | Budget (reference) |
//! |----------------|----------------|--------------------|
//! | S0, S1 | normal | 32 |
//! | S2 | double height | 32 |
//! | S3 | double both | 16 |
//!
//! Every text element starts its line with a font pair (`GS !` size then
//! `ESC E` bold), so styles never leak between elements.

use super::types::*;
use crate::ir::{Control, Line, Op};
use crate::printer::{AbsoluteFontSize, PrinterProfile, RelativeFontSize};
use crate::protocol::commands::Alignment;
use crate::protocol::encoding::{self, FillAlign, pad, split_by_column_budget};

/// Layout state for one element: session base size, profile and the lines
/// produced so far.
pub struct LayoutContext<'a> {
    pub base: AbsoluteFontSize,
    pub profile: &'a PrinterProfile,
    pub lines: Vec<Line>,
}

impl<'a> LayoutContext<'a> {
    pub fn new(base: AbsoluteFontSize, profile: &'a PrinterProfile) -> Self {
        Self {
            base,
            profile,
            lines: Vec::new(),
        }
    }

    /// Effective size of an element.
    fn resolve(&self, size: RelativeFontSize) -> AbsoluteFontSize {
        size.resolve(self.base)
    }

    /// Column budget at an effective size. At least 1, even for an
    /// unvalidated profile.
    fn budget(&self, size: AbsoluteFontSize) -> usize {
        self.profile.columns_for(size.char_size()).max(1)
    }

    fn push(&mut self, line: Line) {
        self.lines.push(line);
    }
}

/// Start a terminated line with the font pair for `size`.
fn styled(size: AbsoluteFontSize, bold: bool) -> Line {
    Line::new()
        .control(Control::font(size.char_size()))
        .control(Control::bold(bold))
}

trait Layout {
    fn lay_out(&self, ctx: &mut LayoutContext);
}

impl PrintElement {
    /// Lay out this element for a base size and profile.
    ///
    /// ## Example
    ///
    /// ```
    /// use bonprint::document::{Left, PrintElement};
    /// use bonprint::printer::{AbsoluteFontSize, PrinterProfile};
    ///
    /// let element = PrintElement::from(Left::new("Table 12"));
    /// let lines = element.layout(AbsoluteFontSize::S0, &PrinterProfile::default());
    /// assert_eq!(lines.len(), 1);
    /// assert_eq!(lines[0].plain_text(), "Table 12");
    /// ```
    pub fn layout(&self, base: AbsoluteFontSize, profile: &PrinterProfile) -> Vec<Line> {
        let mut ctx = LayoutContext::new(base, profile);
        self.lay_out(&mut ctx);
        ctx.lines
    }
}

impl Layout for PrintElement {
    fn lay_out(&self, ctx: &mut LayoutContext) {
        match self {
            PrintElement::Title(e) => e.lay_out(ctx),
            PrintElement::LineCentered(e) => e.lay_out(ctx),
            PrintElement::Left(e) => e.lay_out(ctx),
            PrintElement::Right(e) => e.lay_out(ctx),
            PrintElement::MultiFont(e) => e.lay_out(ctx),
            PrintElement::LeftRight(e) => e.lay_out(ctx),
            PrintElement::Table(e) => e.lay_out(ctx),
            PrintElement::Separator(e) => e.lay_out(ctx),
            PrintElement::Blank(e) => e.lay_out(ctx),
            PrintElement::RawImage(e) => e.lay_out(ctx),
        }
    }
}

// ============================================================================
// TEXT ELEMENTS
// ============================================================================

fn aligned(ctx: &mut LayoutContext, text: &str, size: RelativeFontSize, bold: bool, align: Alignment) {
    let size = ctx.resolve(size);
    ctx.push(
        styled(size, bold)
            .control(Control::align(align))
            .text(text),
    );
}

impl Layout for Title {
    fn lay_out(&self, ctx: &mut LayoutContext) {
        aligned(ctx, &self.text, self.size, self.bold, Alignment::Center);
    }
}

impl Layout for Left {
    fn lay_out(&self, ctx: &mut LayoutContext) {
        aligned(ctx, &self.text, self.size, false, Alignment::Left);
    }
}

impl Layout for Right {
    fn lay_out(&self, ctx: &mut LayoutContext) {
        aligned(ctx, &self.text, self.size, false, Alignment::Right);
    }
}

impl Layout for LineCentered {
    fn lay_out(&self, ctx: &mut LayoutContext) {
        let size = ctx.resolve(self.size);
        let text_columns = encoding::measure(&self.text) * size.char_size().width_scale();
        let fill_width = encoding::measure(&self.fill);
        let copies = match fill_width {
            0 => 0,
            w => ctx.profile.line_budget.saturating_sub(text_columns) / 2 / w,
        };
        let side = self.fill.repeat(copies);

        let line = Line::new()
            .control(Control::AlignLeft)
            .control(Control::FontNormal)
            .control(Control::BoldOff)
            .text(side.clone())
            .control(Control::font(size.char_size()))
            .control(Control::bold(self.bold))
            .text(self.text.as_str())
            .control(Control::FontNormal)
            .control(Control::BoldOff)
            .text(side);
        ctx.push(line);
    }
}

impl Layout for MultiFont {
    fn lay_out(&self, ctx: &mut LayoutContext) {
        let mut line = Line::new().control(Control::AlignRight);
        for (text, size) in self.segments() {
            let size = ctx.resolve(*size);
            line = line
                .control(Control::font(size.char_size()))
                .control(Control::BoldOff)
                .text(text.as_str());
        }
        ctx.push(line);
    }
}

impl Layout for LeftRight {
    fn lay_out(&self, ctx: &mut LayoutContext) {
        let size = ctx.resolve(self.size);
        let budget = ctx.budget(size);
        let left = encoding::measure(&self.left);
        let right = encoding::measure(&self.right);

        // Right text ends on a line boundary; overflow spills onto the next line.
        let right_part = (left + right).div_ceil(budget) * budget - left;
        let text = format!("{}{}", self.left, pad(&self.right, right_part, FillAlign::End, ' '));

        ctx.push(styled(size, false).control(Control::AlignLeft).text(text));
    }
}

// ============================================================================
// TABLE
// ============================================================================

/// Split `budget` columns by weight. The last column takes the remainder.
pub fn column_widths(budget: usize, weights: &[u32]) -> Vec<usize> {
    let sum: u64 = weights.iter().map(|&w| u64::from(w)).sum();
    if weights.is_empty() || sum == 0 {
        return Vec::new();
    }

    let mut widths = Vec::with_capacity(weights.len());
    let mut remaining = budget;
    for &weight in &weights[..weights.len() - 1] {
        let width = (budget as u64 * u64::from(weight) / sum) as usize;
        widths.push(width);
        remaining = remaining.saturating_sub(width);
    }
    widths.push(remaining);
    widths
}

impl Layout for Table {
    fn lay_out(&self, ctx: &mut LayoutContext) {
        let size = ctx.resolve(self.font_size());
        let budget = ctx.budget(size);
        let weights: Vec<u32> = self.columns().iter().map(|c| c.weight).collect();
        let widths = column_widths(budget, &weights);

        // One column of gap is reserved inside each cell.
        let cells: Vec<Vec<&str>> = self
            .columns()
            .iter()
            .zip(&widths)
            .map(|(column, &width)| {
                split_by_column_budget(&column.text, width.saturating_sub(1)).collect()
            })
            .collect();
        let rows = cells.iter().map(Vec::len).max().unwrap_or(0);

        for row in 0..rows {
            let mut text = String::new();
            for (index, (runs, &width)) in cells.iter().zip(&widths).enumerate() {
                let run = runs.get(row).copied().unwrap_or("");
                let align = if index == 0 {
                    FillAlign::Start
                } else {
                    FillAlign::End
                };
                text.push_str(&pad(run, width, align, ' '));
            }
            // A glyph wider than its cell overflows; end the row on a line
            // boundary so the next row starts in column 0.
            let used = encoding::measure(&text);
            if used > budget {
                text = pad(&text, used.div_ceil(budget) * budget, FillAlign::Start, ' ');
            }
            ctx.push(styled(size, false).control(Control::AlignLeft).text(text));
        }
    }
}

// ============================================================================
// RULES, SPACING, IMAGES
// ============================================================================

impl Layout for Separator {
    fn lay_out(&self, ctx: &mut LayoutContext) {
        let glyph = ctx.resolve(self.size).separator_glyph();
        let print_size = ctx.resolve(RelativeFontSize::R0);
        let rule: String = std::iter::repeat_n(glyph, ctx.budget(print_size)).collect();
        ctx.push(styled(print_size, false).control(Control::AlignLeft).text(rule));
    }
}

impl Layout for Blank {
    fn lay_out(&self, ctx: &mut LayoutContext) {
        for _ in 0..self.line_count {
            let mut line = Line::new().control(Control::FontNormal);
            if !self.fill.is_empty() {
                line = line.text(self.fill.as_str());
            }
            ctx.push(line);
        }
    }
}

impl Layout for RawImage {
    fn lay_out(&self, ctx: &mut LayoutContext) {
        ctx.push(Line::unterminated(vec![Op::Image {
            image: self.image.clone(),
            left_offset: self.left_offset,
        }]));
    }
}

// ============================================================================
// TESTS
// ============================================================================
