//! Slide Content Items
//!
//! Nested content model shared by slides, templates and overlays: an
//! [`Item`] holds [`Line`]s which hold [`TextRun`]s. Styles are inline CSS
//! declaration strings (`"color: red;font-size: 80px;"`) and are treated as
//! opaque except for the few properties the composition engine inspects.

use serde::{Deserialize, Serialize};

/// Item type used when an item does not declare one
pub const DEFAULT_ITEM_KIND: &str = "text";

/// Text color assumed when a run does not set one
pub const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";

/// A run of text with a single style
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextRun {
    /// Inline style declarations
    pub style: String,
    /// Literal text (may contain `{placeholder}` values)
    pub value: String,
    /// Special run marker (e.g. `"disableTemplate"`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_type: Option<String>,
}

impl TextRun {
    /// Create a run from a style and value
    pub fn new(style: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            value: value.into(),
            custom_type: None,
        }
    }

    /// Whether this run opted out of template styling
    #[must_use]
    pub fn disables_template(&self) -> bool {
        self.custom_type
            .as_deref()
            .is_some_and(|t| t.contains("disableTemplate"))
    }
}

/// A line of text runs
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Line {
    /// Line alignment style
    pub align: String,
    /// Runs making up the line
    pub text: Vec<TextRun>,
}

impl Line {
    /// Create a line from runs
    #[must_use]
    pub fn new(text: Vec<TextRun>) -> Self {
        Self {
            align: String::new(),
            text,
        }
    }
}

/// Auxiliary style facets copied wholesale from a template item
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemFacets {
    /// Chord annotations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chords: Option<serde_json::Value>,
    /// Text fit mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_fit: Option<serde_json::Value>,
    /// Item actions (transitions etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<serde_json::Value>,
    /// Special per-type styling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_style: Option<serde_json::Value>,
    /// Scrolling behaviour
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrolling: Option<serde_json::Value>,
    /// Item-level output bindings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bindings: Option<serde_json::Value>,
    /// Display conditions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<serde_json::Value>,
}

/// A content item on a slide, template or overlay
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Item {
    /// Item type, `"text"` when absent
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Inline box style
    pub style: String,
    /// Content alignment style
    pub align: String,
    /// Automatic font sizing enabled
    pub auto: bool,
    /// Cached automatic font size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_font_size: Option<f64>,
    /// Text lines (text items only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<Line>>,
    /// Media source for non-text items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Item originates from a template rather than the slide
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub from_template: bool,
    /// Auxiliary facets
    #[serde(flatten)]
    pub facets: ItemFacets,
}

impl Item {
    /// Create a text item with one line per entry
    #[must_use]
    pub fn text(lines: Vec<Line>) -> Self {
        Self {
            lines: Some(lines),
            ..Self::default()
        }
    }

    /// Create a non-text item of the given type
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    /// Builder: set the box style
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Effective item type
    #[must_use]
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(DEFAULT_ITEM_KIND)
    }

    /// Whether this is a text item
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.kind() == DEFAULT_ITEM_KIND
    }

    /// Concatenated text of every run of every line
    #[must_use]
    pub fn text_content(&self) -> String {
        let Some(lines) = &self.lines else {
            return String::new();
        };

        lines
            .iter()
            .map(|line| line.text.iter().map(|run| run.value.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of lines
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.as_ref().map_or(0, Vec::len)
    }
}

/// Parse an inline style string into ordered `(property, value)` pairs
///
/// Later declarations of the same property win when read through
/// [`style_value`].
#[must_use]
pub fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (key, value) = declaration.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Read a single property from an inline style string
#[must_use]
pub fn style_value(style: &str, property: &str) -> Option<String> {
    parse_style(style)
        .into_iter()
        .rev()
        .find(|(key, _)| key == property)
        .map(|(_, value)| value)
}

/// Text color of a style string, defaulting to white
#[must_use]
pub fn text_color(style: &str) -> String {
    style_value(style, "color")
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_TEXT_COLOR.to_string())
}
