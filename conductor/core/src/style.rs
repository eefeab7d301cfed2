//! Output Styles
//!
//! A style is the per-output presentation profile: which layers are
//! rendered, which templates apply and what aspect ratio the output uses.

use serde::{Deserialize, Serialize};

use crate::ids::TemplateId;
use crate::model::Transition;

/// A renderable layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Background media
    Background,
    /// Slide content
    Slide,
    /// Overlays
    Overlays,
}

/// Layers rendered when a style does not list its own
pub const DEFAULT_LAYERS: &[Layer] = &[Layer::Background, Layer::Slide, Layer::Overlays];

/// Aspect ratio or resolution declared by a style
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AspectRatio {
    /// Width component
    pub width: u32,
    /// Height component
    pub height: u32,
    /// Use the physical output bounds as the ratio
    pub output_resolution_as_ratio: bool,
}

/// Transition overrides of a style
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleTransitions {
    /// Text transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Transition>,
    /// Media transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Transition>,
}

/// Output style
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Style {
    /// Style name
    pub name: String,
    /// Rendered layers, [`DEFAULT_LAYERS`] when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<Layer>>,
    /// Template applied to show slides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateId>,
    /// Template applied to scripture slides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_scripture: Option<TemplateId>,
    /// Template for two parallel scripture translations
    #[serde(rename = "templateScripture_2", skip_serializing_if = "Option::is_none")]
    pub template_scripture_2: Option<TemplateId>,
    /// Template for three parallel scripture translations
    #[serde(rename = "templateScripture_3", skip_serializing_if = "Option::is_none")]
    pub template_scripture_3: Option<TemplateId>,
    /// Template for four parallel scripture translations
    #[serde(rename = "templateScripture_4", skip_serializing_if = "Option::is_none")]
    pub template_scripture_4: Option<TemplateId>,
    /// Metadata overlay template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_template: Option<TemplateId>,
    /// Message overlay template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_template: Option<TemplateId>,
    /// When to display metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_metadata: Option<String>,
    /// Divider between joined metadata fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_divider: Option<String>,
    /// Aspect ratio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    /// Legacy fixed resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<AspectRatio>,
    /// Transition overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<StyleTransitions>,
    /// Text lines shown at once, the whole slide when absent or 0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<usize>,
}

impl Style {
    /// Layers this style renders
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        self.layers.as_deref().unwrap_or(DEFAULT_LAYERS)
    }

    /// Whether this style renders a background layer
    #[must_use]
    pub fn renders_background(&self) -> bool {
        self.layers().contains(&Layer::Background)
    }

    /// Template for scripture with the given number of translations
    #[must_use]
    pub fn scripture_template(&self, translations: u32) -> Option<&TemplateId> {
        let specific = match translations {
            2 => self.template_scripture_2.as_ref(),
            3 => self.template_scripture_3.as_ref(),
            4 => self.template_scripture_4.as_ref(),
            _ => None,
        };
        specific.or(self.template_scripture.as_ref())
    }

    /// Declared ratio, aspect ratio first
    #[must_use]
    pub fn declared_ratio(&self) -> Option<AspectRatio> {
        self.aspect_ratio.or(self.resolution)
    }
}
