//! Show, Layout and Template Data
//!
//! Read-only content supplied by the external show/template store. The output
//! core never mutates stored shows; the only writers are the explicit
//! template materialization helpers in [`crate::compose`], which operate on
//! caller-owned copies.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::ids::{ActionId, CategoryId, LayoutId, OutputId, OverlayId, SlideId, TemplateId};
use crate::items::Item;
use crate::model::Transition;

/// Metadata fields in their canonical display order
pub const META_FIELDS: &[&str] = &[
    "number",
    "title",
    "artist",
    "author",
    "composer",
    "publisher",
    "copyright",
    "CCLI",
    "year",
    "key",
];

/// A slide action attached to a layout slide or template
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideAction {
    /// Action id
    pub id: String,
    /// Triggers, first one identifies the action kind
    pub triggers: Vec<String>,
    /// Trigger payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl SlideAction {
    fn same_action(&self, other: &Self) -> bool {
        self.id == other.id || (self.triggers.first().is_some() && self.triggers.first() == other.triggers.first())
    }
}

/// Actions of a layout slide
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlideActions {
    /// Actions run when the slide is shown
    pub slide_actions: Vec<SlideAction>,
}

impl SlideActions {
    /// Replace actions matching any of `incoming` and append the incoming set
    pub fn merge(&mut self, incoming: &[SlideAction]) {
        self.slide_actions
            .retain(|existing| !incoming.iter().any(|a| a.same_action(existing)));
        self.slide_actions.extend(incoming.iter().cloned());
    }
}

/// Per-slide data stored on a layout
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutSlide {
    /// Slide id
    pub id: SlideId,
    /// Outputs this slide is pinned to
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<OutputId>,
    /// Text transition override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
    /// Media transition override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_transition: Option<Transition>,
    /// Background media id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Slide actions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<SlideActions>,
    /// CSS filter applied to the background
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// CSS backdrop filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backdrop_filter: Option<String>,
}

/// A show layout: an ordered selection of slides
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Layout name
    pub name: String,
    /// Slides in display order
    pub slides: Vec<LayoutSlide>,
}

/// Slide-level settings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideSettings {
    /// Template assigned to this slide
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateId>,
    /// Background color
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A slide's content
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Slide {
    /// Group label (`None` for child slides)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Content items
    pub items: Vec<Item>,
    /// Child slides shown after this one
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SlideId>,
    /// Settings
    pub settings: SlideSettings,
}

/// Whether a layout reference points at a parent or a child slide
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideRefKind {
    /// Top-level layout slide
    Parent,
    /// Child slide expanded from a parent
    Child,
}

/// One displayable position in a layout
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlideRef {
    /// Slide id
    pub id: SlideId,
    /// Parent or child
    #[serde(rename = "type")]
    pub kind: SlideRefKind,
    /// Index of the owning layout slide
    pub index: usize,
    /// Layout data of the owning layout slide
    pub data: LayoutSlide,
}

/// Scripture or other source reference of a show
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShowReference {
    /// Reference type (`"scripture"`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Attribution text required by the translation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution_string: Option<String>,
    /// Number of parallel translations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translations: Option<u32>,
    /// Translation version(s), `+` separated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ShowReference {
    /// Whether this show is a scripture lookup
    #[must_use]
    pub fn is_scripture(&self) -> bool {
        self.kind == "scripture"
    }

    /// Number of translations shown side by side
    #[must_use]
    pub fn translation_count(&self) -> u32 {
        self.translations
            .or_else(|| {
                self.version
                    .as_deref()
                    .map(|v| u32::try_from(v.split('+').count()).unwrap_or(1))
            })
            .unwrap_or(1)
    }
}

/// Metadata display settings of a show
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShowMetadataSettings {
    /// Use these settings instead of the output style's
    #[serde(rename = "override")]
    pub override_output: bool,
    /// Metadata template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateId>,
    /// When to display metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// Show media metadata instead of show fields
    pub auto_media: bool,
}

/// Message template settings of a show
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowMessage {
    /// Message template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateId>,
}

/// A media entry of a show
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Media {
    /// File path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Source id (non-file media)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name
    pub name: String,
}

/// A show
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Show {
    /// Show name
    pub name: String,
    /// Category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
    /// Metadata fields (title, artist, ...)
    pub meta: BTreeMap<String, String>,
    /// Source reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<ShowReference>,
    /// Layouts
    pub layouts: HashMap<LayoutId, Layout>,
    /// Slides
    pub slides: HashMap<SlideId, Slide>,
    /// Media used by the layouts
    pub media: HashMap<String, Media>,
    /// Metadata display settings
    pub metadata: ShowMetadataSettings,
    /// Message settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<ShowMessage>,
}

impl Show {
    /// Create an empty show
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Expand a layout into its displayable slide references
    ///
    /// Each parent slide is followed by its children, which share the
    /// parent's layout data. Unknown layouts yield an empty list.
    #[must_use]
    pub fn layout_ref(&self, layout: &LayoutId) -> Vec<SlideRef> {
        let Some(layout) = self.layouts.get(layout) else {
            return Vec::new();
        };

        let mut refs = Vec::new();
        for (index, layout_slide) in layout.slides.iter().enumerate() {
            refs.push(SlideRef {
                id: layout_slide.id.clone(),
                kind: SlideRefKind::Parent,
                index,
                data: layout_slide.clone(),
            });

            if let Some(slide) = self.slides.get(&layout_slide.id) {
                for child in &slide.children {
                    refs.push(SlideRef {
                        id: child.clone(),
                        kind: SlideRefKind::Child,
                        index,
                        data: layout_slide.clone(),
                    });
                }
            }
        }
        refs
    }

    /// Slide shown at a layout position
    #[must_use]
    pub fn slide_at(&self, layout: &LayoutId, index: usize) -> Option<&Slide> {
        let refs = self.layout_ref(layout);
        refs.get(index).and_then(|r| self.slides.get(&r.id))
    }

    /// Non-empty metadata fields in canonical order
    ///
    /// Known fields come first in [`META_FIELDS`] order, any others follow
    /// alphabetically.
    #[must_use]
    pub fn ordered_meta(&self) -> Vec<(String, String)> {
        let known = META_FIELDS
            .iter()
            .filter_map(|key| self.meta.get(*key).map(|v| ((*key).to_string(), v.clone())));
        let custom = self
            .meta
            .iter()
            .filter(|(key, _)| !META_FIELDS.contains(&key.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()));

        known.chain(custom).filter(|(_, v)| !v.is_empty()).collect()
    }
}

/// A category of shows, optionally bound to an action
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    /// Category name
    pub name: String,
    /// Action triggered when a show of this category goes live
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionId>,
}

/// Template settings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateSettings {
    /// Background media path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_path: Option<String>,
    /// Background color
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Template used for the first slide of a show
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_slide_template: Option<TemplateId>,
    /// Actions added to slides using this template
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<SlideAction>,
    /// Overlay whose items are added to slides using this template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_id: Option<OverlayId>,
}

/// A reusable visual layout
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    /// Template name
    pub name: String,
    /// Template items
    pub items: Vec<Item>,
    /// Settings
    pub settings: TemplateSettings,
}

impl Template {
    /// Inline style of the first item plus the style of its first text run
    #[must_use]
    pub fn first_item_style(&self) -> String {
        let Some(first) = self.items.first() else {
            return String::new();
        };
        let run_style = first
            .lines
            .as_ref()
            .and_then(|lines| lines.first())
            .and_then(|line| line.text.first())
            .map(|run| run.style.as_str())
            .unwrap_or_default();

        format!("{}{}", first.style, run_style)
    }

    /// Value of the first text run of the first item
    #[must_use]
    pub fn first_text_value(&self) -> &str {
        self.items
            .first()
            .and_then(|item| item.lines.as_ref())
            .and_then(|lines| lines.first())
            .and_then(|line| line.text.first())
            .map_or("", |run| run.value.as_str())
    }

    /// Transition configured on the first item's actions
    #[must_use]
    pub fn first_item_transition(&self) -> Option<serde_json::Value> {
        self.items
            .first()
            .and_then(|item| item.facets.actions.as_ref())
            .and_then(|actions| actions.get("transition"))
            .filter(|t| !t.is_null())
            .cloned()
    }
}
