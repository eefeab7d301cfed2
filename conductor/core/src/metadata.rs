//! Metadata Overlay Content
//!
//! Computes what the metadata overlay of an output shows for the current
//! show: its text, the template styling it is drawn with, and the styling of
//! the message overlay next to it.
//!
//! Template resolution order for the metadata overlay:
//!
//! ```text
//!   show.metadata.override ? show.metadata.template
//!                          : style.metadata_template ?? "metadata"
//! ```

use serde::{Deserialize, Serialize};

use crate::ids::TemplateId;
use crate::model::OutSlide;
use crate::show::{Show, Template};
use crate::style::Style;

/// Style of the metadata overlay when no template provides one
pub const DEFAULT_METADATA_STYLE: &str = "top: 910px;left: 50px;width: 1820px;height: 150px;opacity: 0.8;font-size: 30px;text-shadow: 2px 2px 4px rgb(0 0 0 / 80%);";

/// Style of the message overlay when no template provides one
pub const DEFAULT_MESSAGE_STYLE: &str = "top: 50px;left: 50px;width: 1820px;height: 150px;opacity: 0.8;font-size: 50px;text-shadow: 2px 2px 4px rgb(0 0 0 / 80%);";

/// Layout of metadata text built from placeholders
pub const DEFAULT_META_LAYOUT: &str =
    "Title: {meta_title?No title}; {meta_artist}; {meta_author}; {meta_year};\n{meta_copyright}";

/// Divider between joined metadata fields
pub const DEFAULT_DIVIDER: &str = "; ";

/// Template used for metadata when the style names none
pub const METADATA_TEMPLATE: &str = "metadata";

/// Template used for messages when the style names none
pub const MESSAGE_TEMPLATE: &str = "message";

/// Metadata overlay content of an output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputMetadata {
    /// Metadata fields of the show, in display order
    pub message: Vec<(String, String)>,
    /// When the overlay is displayed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// Overlay style
    pub style: String,
    /// Overlay transition from the template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<serde_json::Value>,
    /// Rendered text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Show media metadata instead of show fields
    pub media: bool,
    /// Message overlay style
    pub message_style: String,
    /// Message overlay transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_transition: Option<serde_json::Value>,
}

impl Default for OutputMetadata {
    fn default() -> Self {
        Self {
            message: Vec::new(),
            display: None,
            style: DEFAULT_METADATA_STYLE.to_string(),
            transition: None,
            value: None,
            media: false,
            message_style: DEFAULT_MESSAGE_STYLE.to_string(),
            message_transition: None,
        }
    }
}

/// Values available to `{placeholder}` substitution
#[derive(Clone, Copy, Debug, Default)]
pub struct DynamicContext<'a> {
    /// Show being displayed
    pub show: Option<&'a Show>,
    /// Zero-based slide position in the layout
    pub slide_index: Option<usize>,
    /// Number of slides in the layout
    pub slide_count: Option<usize>,
}

impl<'a> DynamicContext<'a> {
    /// Context for a displayed slide of a show
    #[must_use]
    pub fn for_slide(show: &'a Show, slide: &OutSlide) -> Self {
        Self {
            show: Some(show),
            slide_index: Some(slide.index),
            slide_count: Some(show.layout_ref(&slide.layout).len()),
        }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        if let Some(field) = name.strip_prefix("meta_") {
            let meta = &self.show?.meta;
            return meta
                .get(field)
                .or_else(|| meta.get(&field.to_lowercase()))
                .cloned();
        }

        match name {
            "show_name" => self.show.map(|show| show.name.clone()),
            "slide_number" => self.slide_index.map(|i| (i + 1).to_string()),
            "slide_count" => self.slide_count.map(|n| n.to_string()),
            _ => None,
        }
    }
}

/// Substitute `{name}` and `{name?fallback}` placeholders
///
/// Unknown or empty values fall back to the text after `?`, or to nothing.
/// An unclosed `{` is kept literally.
#[must_use]
pub fn replace_dynamic_values(text: &str, context: &DynamicContext<'_>) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('{') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let Some(end) = after.find('}') else {
            result.push_str(&rest[start..]);
            return result;
        };

        let placeholder = &after[..end];
        let (name, fallback) = placeholder
            .split_once('?')
            .unwrap_or((placeholder, ""));

        let value = context
            .lookup(name.trim())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        result.push_str(&value);

        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

/// Join non-empty metadata values with a divider (`"; "` when `None`)
#[must_use]
pub fn join_metadata(fields: &[(String, String)], divider: Option<&str>) -> String {
    fields
        .iter()
        .map(|(_, value)| value.as_str())
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(divider.unwrap_or(DEFAULT_DIVIDER))
}

fn template_style(template: Option<&Template>) -> Option<String> {
    template
        .map(Template::first_item_style)
        .filter(|style| !style.is_empty())
}

/// Compute the metadata overlay content for an output
///
/// `previous` supplies the value kept while media metadata is shown, and
/// `templates` looks templates up by id.
pub fn compute_metadata(
    previous: &OutputMetadata,
    show: Option<&Show>,
    style: &Style,
    templates: impl Fn(&TemplateId) -> Option<Template>,
    out_slide: Option<&OutSlide>,
) -> OutputMetadata {
    let default_template = templates(&TemplateId::new(METADATA_TEMPLATE));
    let mut metadata = OutputMetadata {
        style: template_style(default_template.as_ref())
            .unwrap_or_else(|| DEFAULT_METADATA_STYLE.to_string()),
        ..OutputMetadata::default()
    };

    let Some(show) = show else {
        return metadata;
    };

    let settings = &show.metadata;
    let override_output = settings.override_output;

    let template_id = if override_output {
        settings.template.clone().unwrap_or_default()
    } else {
        style
            .metadata_template
            .clone()
            .unwrap_or_else(|| TemplateId::new(METADATA_TEMPLATE))
    };
    let template = templates(&template_id);

    metadata.media = settings.auto_media;
    if !metadata.media {
        metadata.message = show.ordered_meta();
    }
    metadata.display = if override_output {
        settings.display.clone()
    } else {
        style.display_metadata.clone()
    };
    metadata.style = template_style(template.as_ref())
        .unwrap_or_else(|| DEFAULT_METADATA_STYLE.to_string());
    metadata.transition = template.as_ref().and_then(Template::first_item_transition);

    let template_value = template
        .as_ref()
        .map(Template::first_text_value)
        .unwrap_or_default();

    metadata.value = if metadata.media {
        previous.value.clone().or_else(|| Some(String::new()))
    } else if template_value.contains('{') {
        out_slide.map(|slide| {
            replace_dynamic_values(template_value, &DynamicContext::for_slide(show, slide))
        })
    } else {
        Some(join_metadata(&metadata.message, style.metadata_divider.as_deref()))
    };

    let message_template = if override_output {
        show.message
            .as_ref()
            .and_then(|m| m.template.clone())
            .unwrap_or_default()
    } else {
        style
            .message_template
            .clone()
            .unwrap_or_else(|| TemplateId::new(MESSAGE_TEMPLATE))
    };
    let message = if message_template.is_empty() {
        None
    } else {
        templates(&message_template)
    };
    metadata.message_style = template_style(message.as_ref())
        .unwrap_or_else(|| DEFAULT_MESSAGE_STYLE.to_string());
    metadata.message_transition = message.as_ref().and_then(Template::first_item_transition);

    tracing::trace!(
        template = %template_id,
        media = metadata.media,
        "Metadata computed"
    );
    metadata
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::ids::{LayoutId, SlideId};
    use crate::items::{Item, Line, TextRun};
    use crate::show::{Layout, LayoutSlide, ShowMetadataSettings};

    fn song() -> Show {
        let mut show = Show::named("Amazing Grace");
        show.meta.insert("title".into(), "Amazing Grace".into());
        show.meta.insert("author".into(), "John Newton".into());
        show.meta.insert("year".into(), String::new());
        show.layouts.insert(
            LayoutId::new("main"),
            Layout {
                name: "Default".into(),
                slides: (0..4)
                    .map(|i| LayoutSlide {
                        id: SlideId::new(format!("s{i}")),
                        ..LayoutSlide::default()
                    })
                    .collect(),
            },
        );
        show
    }

    fn template(style: &str, run_style: &str, value: &str) -> Template {
        Template {
            items: vec![Item::text(vec![Line::new(vec![TextRun::new(run_style, value)])])
                .with_style(style)],
            ..Template::default()
        }
    }

    #[test]
    fn test_replace_dynamic_values() {
        let show = song();
        let slide = OutSlide::new("song", "main", 1);
        let context = DynamicContext::for_slide(&show, &slide);

        assert_eq!(
            replace_dynamic_values("{meta_title} ({slide_number}/{slide_count})", &context),
            "Amazing Grace (2/4)"
        );
        assert_eq!(
            replace_dynamic_values("{meta_year?Unknown year} {meta_CCLI}", &context),
            "Unknown year "
        );
        assert_eq!(replace_dynamic_values("{show_name}", &context), "Amazing Grace");
        assert_eq!(replace_dynamic_values("open { brace", &context), "open { brace");
    }

    #[test]
    fn test_default_layout_without_show() {
        let context = DynamicContext::default();
        assert_eq!(
            replace_dynamic_values(DEFAULT_META_LAYOUT, &context),
            "Title: No title; ; ; ;\n"
        );
    }

    #[test]
    fn test_join_metadata_skips_empty() {
        let fields = vec![
            ("title".to_string(), "Song".to_string()),
            ("artist".to_string(), String::new()),
            ("year".to_string(), "1779".to_string()),
        ];
        assert_eq!(join_metadata(&fields, None), "Song; 1779");
        assert_eq!(join_metadata(&fields, Some(" | ")), "Song | 1779");
    }

    #[test]
    fn test_no_show_uses_default_style() {
        let metadata = compute_metadata(
            &OutputMetadata::default(),
            None,
            &Style::default(),
            |_| None,
            None,
        );
        assert_eq!(metadata.style, DEFAULT_METADATA_STYLE);
        assert!(metadata.value.is_none());
    }

    #[test]
    fn test_joined_metadata_with_style_divider() {
        let show = song();
        let style = Style {
            metadata_divider: Some(" - ".into()),
            display_metadata: Some("always".into()),
            ..Style::default()
        };
        let metadata = compute_metadata(
            &OutputMetadata::default(),
            Some(&show),
            &style,
            |_| None,
            None,
        );

        assert_eq!(metadata.value.as_deref(), Some("Amazing Grace - John Newton"));
        assert_eq!(metadata.display.as_deref(), Some("always"));
        assert_eq!(metadata.message_style, DEFAULT_MESSAGE_STYLE);
    }

    #[test]
    fn test_placeholder_template_uses_slide() {
        let show = song();
        let mut templates = HashMap::new();
        templates.insert(
            TemplateId::new("metadata"),
            template("top: 0px;", "font-size: 20px;", "{meta_title} {slide_number}"),
        );
        let slide = OutSlide::new("song", "main", 2);

        let metadata = compute_metadata(
            &OutputMetadata::default(),
            Some(&show),
            &Style::default(),
            |id| templates.get(id).cloned(),
            Some(&slide),
        );

        assert_eq!(metadata.value.as_deref(), Some("Amazing Grace 3"));
        assert_eq!(metadata.style, "top: 0px;font-size: 20px;");
    }

    #[test]
    fn test_show_override_and_media() {
        let mut show = song();
        show.metadata = ShowMetadataSettings {
            override_output: true,
            template: Some(TemplateId::new("custom")),
            display: Some("first".into()),
            auto_media: true,
        };
        let mut templates = HashMap::new();
        templates.insert(TemplateId::new("custom"), template("left: 5px;", "", "x"));

        let previous = OutputMetadata {
            value: Some("photo.jpg".into()),
            ..OutputMetadata::default()
        };
        let metadata = compute_metadata(
            &previous,
            Some(&show),
            &Style::default(),
            |id| templates.get(id).cloned(),
            None,
        );

        assert!(metadata.media);
        assert!(metadata.message.is_empty());
        assert_eq!(metadata.value.as_deref(), Some("photo.jpg"));
        assert_eq!(metadata.display.as_deref(), Some("first"));
        assert_eq!(metadata.style, "left: 5px;");
    }
}
