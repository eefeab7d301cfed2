//! Output Data Model
//!
//! Types describing a configured output and the layers it currently shows.
//!
//! # Layers
//!
//! ```text
//!   Output.out
//!   ┌───────────────────────────────┐
//!   │ transition  Option<Transition>│
//!   │ overlays    Vec<OverlayId>    │  top (stacking order = list order)
//!   │ slide       Option<OutSlide>  │
//!   │ background  Option<Background>│  bottom
//!   └───────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::ids::{LayoutId, OverlayId, ShowId, StyleId};
use crate::items::Item;

/// File extensions treated as video backgrounds
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "webm", "mkv", "m4v", "avi", "wmv", "ogv", "mpg", "mpeg", "3gp", "flv",
];

/// Position and size of an output window
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Bounds {
    /// Create bounds
    #[must_use]
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(0, 0, 1920, 1080)
    }
}

/// What kind of content a displayed slide is
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideKind {
    /// Regular show slide
    #[default]
    Show,
    /// Page of a PDF document
    Pdf,
    /// Externally driven slideshow capture
    Presentation,
}

impl SlideKind {
    /// Paged content is driven by something other than the show layout
    #[must_use]
    pub fn is_paged(self) -> bool {
        matches!(self, Self::Pdf | Self::Presentation)
    }
}

/// Reference to the slide currently on an output
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutSlide {
    /// Show id (`"temp"` for ad-hoc content)
    pub id: ShowId,
    /// Layout inside the show
    pub layout: LayoutId,
    /// Slide index inside the layout
    pub index: usize,
    /// Active line offset when lines are split across outputs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Content kind
    #[serde(rename = "type")]
    pub kind: SlideKind,
    /// Attribution text shown with the slide (scripture translations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    /// Items of ad-hoc content
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub temp_items: Vec<Item>,
    /// Number of parallel translations in ad-hoc scripture content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translations: Option<u32>,
}

impl OutSlide {
    /// Reference a slide in a show layout
    pub fn new(show: impl Into<ShowId>, layout: impl Into<LayoutId>, index: usize) -> Self {
        Self {
            id: show.into(),
            layout: layout.into(),
            index,
            ..Self::default()
        }
    }

    /// Builder: set the content kind
    #[must_use]
    pub fn with_kind(mut self, kind: SlideKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Source of a background layer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundKind {
    /// Image or video file
    #[default]
    Media,
    /// Live camera input
    Camera,
    /// Screen capture
    Screen,
    /// NDI source
    Ndi,
}

/// Background layer value
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Background {
    /// Source id (camera/screen id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Media file path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Display name
    pub name: String,
    /// Source kind
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
    /// Audio muted on this output
    pub muted: bool,
    /// Loop playback
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Playback start offset in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<f64>,
    /// Camera group for camera sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_group: Option<String>,
}

impl Background {
    /// Background showing a media file
    pub fn media(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Background showing a live camera
    pub fn camera(id: impl Into<String>, name: impl Into<String>, group: Option<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            kind: BackgroundKind::Camera,
            camera_group: group,
            ..Self::default()
        }
    }

    /// Whether the background plays a video file
    #[must_use]
    pub fn is_video(&self) -> bool {
        self.path.as_deref().is_some_and(is_video_path)
    }

    /// Identifier used to match this background against content ids
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.path.as_deref().or(self.id.as_deref())
    }
}

/// Whether a path has a video file extension
#[must_use]
pub fn is_video_path(path: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

/// Transition layer value or a transition setting
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transition {
    /// Transition type (`"fade"`, `"none"`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Duration in milliseconds
    pub duration: u32,
    /// Easing function name
    pub easing: String,
}

impl Transition {
    /// A transition that does nothing
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            kind: "none".to_string(),
            duration: 0,
            easing: String::new(),
        }
    }

    /// Whether a transition type is set
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.kind.is_empty()
    }
}

/// An overlay graphic from the overlay store
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Overlay {
    /// Display name
    pub name: String,
    /// Overlay content
    pub items: Vec<Item>,
    /// Automatic removal after this many seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_duration: Option<f64>,
    /// Locked overlays survive "clear overlays"
    pub locked: bool,
}

impl Overlay {
    /// Expiry delay when the overlay is timed
    #[must_use]
    pub fn expiry(&self) -> Option<std::time::Duration> {
        self.display_duration
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(std::time::Duration::from_secs_f64)
    }
}

/// Current displayed state of an output
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutLayers {
    /// Slide layer
    pub slide: Option<OutSlide>,
    /// Background layer
    pub background: Option<Background>,
    /// Overlay stack, bottom first
    pub overlays: Vec<OverlayId>,
    /// Transition layer
    pub transition: Option<Transition>,
    /// One-shot refresh flag for renderers
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub refresh: bool,
}

/// Edge blending of a projector output
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Blending {
    /// Left blend width in percent
    pub left: f64,
    /// Right blend width in percent
    pub right: f64,
    /// Opacity at the blend edge in percent, 50 when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    /// Center offset in percent
    pub offset: f64,
    /// Blend around the center instead of the edges
    pub centered: bool,
    /// Gradient angle in degrees, 90 when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate: Option<f64>,
}

/// A configured rendering target
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Output {
    /// Display name
    pub name: String,
    /// Output is configured to show content
    pub enabled: bool,
    /// Output takes part in updates when any output is active
    pub active: bool,
    /// Alpha key companion output
    pub is_key_output: bool,
    /// Stage output with its stage layout id (possibly empty)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_output: Option<String>,
    /// Window bounds may not be moved
    pub bounds_locked: bool,
    /// Output may cover the main screen
    pub allow_main_screen: bool,
    /// Highlight color used in the UI
    pub color: String,
    /// Output style
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleId>,
    /// Window bounds
    pub bounds: Bounds,
    /// NDI capture enabled
    pub ndi: bool,
    /// Edge blending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blending: Option<Blending>,
    /// Current layers
    pub out: OutLayers,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            name: "Output".to_string(),
            enabled: true,
            active: true,
            is_key_output: false,
            stage_output: None,
            bounds_locked: false,
            allow_main_screen: false,
            color: "#F0008C".to_string(),
            style: None,
            bounds: Bounds::default(),
            ndi: false,
            blending: None,
            out: OutLayers::default(),
        }
    }
}

impl Output {
    /// Create an output with a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether this is a stage output
    #[must_use]
    pub fn is_stage(&self) -> bool {
        self.stage_output.is_some()
    }
}
