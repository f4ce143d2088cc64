//! JSON schema types for element descriptors.
//!
//! Field names follow the mobile bridge that produces these maps
//! (`value`, `fontSize`, `values`, ...). Numeric fields accept either a
//! number or a numeric string.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// A number that may arrive as a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Lenient {
    Int(i64),
    Text(String),
}

impl Lenient {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Lenient::Int(n) => Some(*n),
            Lenient::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// A single element descriptor, dispatched on its `"type"` field.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonElement {
    Title(JsonTitle),
    LineText(JsonLineText),
    Left(JsonText),
    Right(JsonText),
    FontsRight(JsonFontsRight),
    LeftRight(JsonLeftRight),
    MultiPart(JsonMultiPart),
    Line(JsonLine),
    BreakLine(JsonBreakLine),
    /// Any other `type`; printed as blank lines.
    Unknown { kind: String, blank: JsonBreakLine },
}

impl<'de> Deserialize<'de> for JsonElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let element = match kind.as_str() {
            "Title" => serde_json::from_value(value).map(JsonElement::Title),
            "LineText" => serde_json::from_value(value).map(JsonElement::LineText),
            "Left" => serde_json::from_value(value).map(JsonElement::Left),
            "Right" => serde_json::from_value(value).map(JsonElement::Right),
            "FontsRight" => serde_json::from_value(value).map(JsonElement::FontsRight),
            "LeftRight" => serde_json::from_value(value).map(JsonElement::LeftRight),
            "MultiPart" => serde_json::from_value(value).map(JsonElement::MultiPart),
            "Line" => serde_json::from_value(value).map(JsonElement::Line),
            "BreakLine" => serde_json::from_value(value).map(JsonElement::BreakLine),
            _ => serde_json::from_value(value).map(|blank| JsonElement::Unknown { kind, blank }),
        };
        element.map_err(de::Error::custom)
    }
}

/// `{"type": "Title", "value": ..., "fontSize"?: 1, "bold"?: false}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonTitle {
    pub value: String,
    #[serde(default)]
    pub font_size: Option<Lenient>,
    #[serde(default)]
    pub bold: bool,
}

/// `{"type": "LineText", "value": ..., "space"?: "*", "fontSize"?: 1}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonLineText {
    pub value: String,
    #[serde(default)]
    pub space: Option<String>,
    #[serde(default)]
    pub font_size: Option<Lenient>,
    #[serde(default)]
    pub bold: bool,
}

/// `Left` and `Right`: `{"value": ..., "fontSize"?: 1}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonText {
    pub value: String,
    #[serde(default)]
    pub font_size: Option<Lenient>,
}

/// `{"type": "FontsRight", "values": [...], "fontSizes": [...]}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonFontsRight {
    pub values: Vec<String>,
    pub font_sizes: Vec<Lenient>,
}

/// `{"type": "LeftRight", "left": ..., "right": ..., "fontSize"?: 1}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonLeftRight {
    pub left: String,
    pub right: String,
    #[serde(default)]
    pub font_size: Option<Lenient>,
}

/// `{"type": "MultiPart", "values": [...], "lengths": [...], "fontSize"?: 1}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonMultiPart {
    pub values: Vec<String>,
    pub lengths: Vec<u32>,
    #[serde(default)]
    pub font_size: Option<Lenient>,
}

/// `{"type": "Line", "fontSize"?: 1}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonLine {
    #[serde(default)]
    pub font_size: Option<Lenient>,
}

/// `{"type": "BreakLine", "count"?: 3, "space"?: ""}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonBreakLine {
    #[serde(default)]
    pub count: Option<Lenient>,
    #[serde(default)]
    pub space: Option<String>,
}
