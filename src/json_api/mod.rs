//! # JSON API
//!
//! Deserialize element descriptors, the list of `{"type": ...}` maps sent
//! by a mobile bridge, into [`PrintElement`](crate::document::PrintElement)s.
//!
//! | `type` | Element | Fields |
//! |--------|---------|--------|
//! | `Title` | Title | `value`, `fontSize` (1), `bold` |
//! | `LineText` | LineCentered | `value`, `space` (`*`), `fontSize` (1), `bold` |
//! | `Left` / `Right` | Left / Right | `value`, `fontSize` (1) |
//! | `FontsRight` | MultiFont | `values`, `fontSizes` |
//! | `LeftRight` | LeftRight | `left`, `right`, `fontSize` (1) |
//! | `MultiPart` | Table | `values`, `lengths`, `fontSize` (1) |
//! | `Line` | Separator | `fontSize` (1) |
//! | `BreakLine` | Blank | `count` (3), `space` (empty) |
//! | anything else | Blank | `count` (1), `space` (empty) |
//!
//! ## Example
//!
//! ```
//! use bonprint::json_api::parse_descriptors;
//!
//! let json = r#"[
//!     {"type": "Title", "value": "HELLO"},
//!     {"type": "MultiPart", "values": ["Tea", "2", "6.00"], "lengths": [2, 1, 1]},
//!     {"type": "BreakLine", "count": 2}
//! ]"#;
//!
//! let elements = parse_descriptors(json).unwrap();
//! assert_eq!(elements.len(), 3);
//! ```

mod convert;
mod schema;

pub use convert::{JsonApiError, parse_descriptors};
pub use schema::{JsonElement, Lenient};
