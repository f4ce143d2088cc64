//! Conversion from JSON descriptors to print elements.

use std::fmt;

use tracing::debug;

use crate::document::*;
use crate::error::BonprintError;
use crate::printer::RelativeFontSize;

use super::schema::*;

/// Errors from descriptor → element conversion.
#[derive(Debug)]
pub enum JsonApiError {
    /// The input is not a JSON array of descriptor objects.
    Malformed(String),
    /// A field value is invalid.
    InvalidField {
        element: &'static str,
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for JsonApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonApiError::Malformed(message) => write!(f, "malformed descriptors: {}", message),
            JsonApiError::InvalidField {
                element,
                field,
                message,
            } => write!(f, "{}: invalid {}: {}", element, field, message),
        }
    }
}

impl std::error::Error for JsonApiError {}

impl From<JsonApiError> for BonprintError {
    fn from(err: JsonApiError) -> Self {
        BonprintError::InvalidInput(err.to_string())
    }
}

/// Parse a JSON array of descriptors into print elements.
///
/// ## Example
///
/// ```
/// use bonprint::json_api::parse_descriptors;
///
/// let elements = parse_descriptors(r#"[
///     {"type": "Title", "value": "收银小票"},
///     {"type": "LeftRight", "left": "Total", "right": "12.00"},
///     {"type": "Line"}
/// ]"#).unwrap();
/// assert_eq!(elements.len(), 3);
/// ```
pub fn parse_descriptors(json: &str) -> Result<Vec<PrintElement>, JsonApiError> {
    let descriptors: Vec<JsonElement> =
        serde_json::from_str(json).map_err(|e| JsonApiError::Malformed(e.to_string()))?;
    descriptors.iter().map(JsonElement::to_element).collect()
}

/// Relative size from an optional descriptor field.
///
/// Anything but `0..=3`, a missing field included, means `R1`. Element
/// constructor defaults (Title at `R2`) apply only to the Rust API.
fn font_size(field: &Option<Lenient>) -> RelativeFontSize {
    match field.as_ref().and_then(Lenient::as_i64) {
        Some(n @ 0..=3) => RelativeFontSize::from_ordinal(n as u8),
        _ => RelativeFontSize::R1,
    }
}

fn line_count(
    element: &'static str,
    field: &Option<Lenient>,
    default: usize,
) -> Result<usize, JsonApiError> {
    let Some(raw) = field else {
        return Ok(default);
    };
    raw.as_i64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| JsonApiError::InvalidField {
            element,
            field: "count",
            message: format!("expected a non-negative integer, got {:?}", raw),
        })
}

fn invalid(element: &'static str, field: &'static str) -> impl FnOnce(BonprintError) -> JsonApiError {
    move |err| JsonApiError::InvalidField {
        element,
        field,
        message: err.description(),
    }
}

impl JsonElement {
    /// Convert to a print element.
    pub fn to_element(&self) -> Result<PrintElement, JsonApiError> {
        let element: PrintElement = match self {
            JsonElement::Title(t) => Title::new(t.value.as_str())
                .size(font_size(&t.font_size))
                .bold(t.bold)
                .into(),
            JsonElement::LineText(t) => LineCentered::new(t.value.as_str())
                .fill(t.space.as_deref().unwrap_or("*"))
                .size(font_size(&t.font_size))
                .bold(t.bold)
                .into(),
            JsonElement::Left(t) => Left::new(t.value.as_str())
                .size(font_size(&t.font_size))
                .into(),
            JsonElement::Right(t) => Right::new(t.value.as_str())
                .size(font_size(&t.font_size))
                .into(),
            JsonElement::FontsRight(f) => {
                let sizes = f
                    .font_sizes
                    .iter()
                    .map(|s| font_size(&Some(s.clone())))
                    .collect();
                MultiFont::new(f.values.clone(), sizes)
                    .map_err(invalid("FontsRight", "fontSizes"))?
                    .into()
            }
            JsonElement::LeftRight(lr) => LeftRight::new(lr.left.as_str(), lr.right.as_str())
                .size(font_size(&lr.font_size))
                .into(),
            JsonElement::MultiPart(m) => Table::new(m.values.clone(), m.lengths.clone())
                .map_err(invalid("MultiPart", "lengths"))?
                .size(font_size(&m.font_size))
                .into(),
            JsonElement::Line(l) => Separator::new(font_size(&l.font_size)).into(),
            JsonElement::BreakLine(b) => Blank::new(line_count("BreakLine", &b.count, 3)?)
                .fill(b.space.as_deref().unwrap_or_default())
                .into(),
            JsonElement::Unknown { kind, blank } => {
                debug!(kind = %kind, "unknown element type, printing blank line");
                Blank::new(line_count("BreakLine", &blank.count, 1)?)
                    .fill(blank.space.as_deref().unwrap_or_default())
                    .into()
            }
        };
        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn one(json: &str) -> PrintElement {
        let mut elements = parse_descriptors(json).unwrap();
        assert_eq!(elements.len(), 1);
        elements.remove(0)
    }

    #[test]
    fn test_title_without_font_size_is_r1() {
        let element = one(r#"[{"type": "Title", "value": "收银小票"}]"#);
        assert_eq!(element, PrintElement::from(Title::new("收银小票").size(RelativeFontSize::R1)));

        let element = one(r#"[{"type": "Title", "value": "收银小票", "fontSize": 2}]"#);
        assert_eq!(element, PrintElement::from(Title::new("收银小票")));
    }

    #[test]
    fn test_title_bold_and_string_size() {
        let element = one(r#"[{"type": "Title", "value": "A", "fontSize": "0", "bold": true}]"#);
        assert_eq!(element, PrintElement::from(Title::new("A").size(RelativeFontSize::R0).bold(true)));
    }

    #[test]
    fn test_out_of_range_font_size_falls_back() {
        let element = one(r#"[{"type": "Left", "value": "x", "fontSize": 7}]"#);
        assert_eq!(element, PrintElement::from(Left::new("x").size(RelativeFontSize::R1)));
        let element = one(r#"[{"type": "Title", "value": "x", "fontSize": "big"}]"#);
        assert_eq!(element, PrintElement::from(Title::new("x").size(RelativeFontSize::R1)));
    }

    #[test]
    fn test_line_text_default_fill() {
        let element = one(r#"[{"type": "LineText", "value": "合计"}]"#);
        assert_eq!(element, PrintElement::from(LineCentered::new("合计").fill("*")));
    }

    #[test]
    fn test_multi_part() {
        let element = one(
            r#"[{"type": "MultiPart", "values": ["Item", "Qty"], "lengths": [3, 1], "fontSize": 0}]"#,
        );
        let PrintElement::Table(table) = element else {
            panic!("expected table");
        };
        assert_eq!(table.columns().len(), 2);
        assert_eq!(table.font_size(), RelativeFontSize::R0);
    }

    #[test]
    fn test_multi_part_length_mismatch() {
        let err = parse_descriptors(
            r#"[{"type": "MultiPart", "values": ["a", "b"], "lengths": [1]}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, JsonApiError::InvalidField { field: "lengths", .. }));
        assert!(matches!(BonprintError::from(err), BonprintError::InvalidInput(_)));
    }

    #[test]
    fn test_fonts_right_mismatch() {
        let result = parse_descriptors(
            r#"[{"type": "FontsRight", "values": ["a", "b"], "fontSizes": [1]}]"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_line_defaults_to_r1() {
        let element = one(r#"[{"type": "Line"}]"#);
        assert_eq!(element, PrintElement::from(Separator::new(RelativeFontSize::R1)));
    }

    #[test]
    fn test_break_line_default_count() {
        assert_eq!(one(r#"[{"type": "BreakLine"}]"#), PrintElement::from(Blank::new(3)));
        assert_eq!(
            one(r#"[{"type": "BreakLine", "count": "2", "space": "."}]"#),
            PrintElement::from(Blank::new(2).fill("."))
        );
    }

    #[test]
    fn test_unknown_type_is_single_blank() {
        assert_eq!(one(r#"[{"type": "Barcode", "value": "123"}]"#), PrintElement::from(Blank::new(1)));
        assert_eq!(one(r#"[{"value": "no type"}]"#), PrintElement::from(Blank::new(1)));
        assert_eq!(one(r#"[{"type": "Qr", "count": 4}]"#), PrintElement::from(Blank::new(4)));
    }

    #[test]
    fn test_missing_required_field() {
        assert!(parse_descriptors(r#"[{"type": "Title"}]"#).is_err());
        assert!(parse_descriptors(r#"[{"type": "LeftRight", "left": "x"}]"#).is_err());
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            parse_descriptors("{not json"),
            Err(JsonApiError::Malformed(_))
        ));
        assert!(matches!(
            parse_descriptors(r#"{"type": "Title"}"#),
            Err(JsonApiError::Malformed(_))
        ));
    }

    #[test]
    fn test_negative_count_rejected() {
        assert!(parse_descriptors(r#"[{"type": "BreakLine", "count": -1}]"#).is_err());
    }
}
