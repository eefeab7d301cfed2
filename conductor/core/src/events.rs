//! Output Events
//!
//! Everything the output core wants the outside world to do is expressed as
//! an [`OutputEvent`] pushed onto an unbounded channel. The mutation path
//! never waits on a collaborator; the [`crate::dispatch::EffectDispatcher`]
//! drains the channel and delivers events out of band.
//!
//! # Design Philosophy
//!
//! Events are plain values in the order they were decided. A state
//! transaction that both stops a presentation and stores a new slide emits
//! `StopPresentation` before the `State` event of the same output, so
//! consumers observe effects in causal order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::ids::{ActionId, OutputId};
use crate::model::{OutLayers, Output};

/// Transport channel an event is delivered on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputChannel {
    /// Output windows
    Output,
    /// Main control window
    Main,
    /// Stage displays
    Stage,
    /// Scaled-down previews
    Preview,
}

impl std::fmt::Display for OutputChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Output => "OUTPUT",
            Self::Main => "MAIN",
            Self::Stage => "STAGE",
            Self::Preview => "PREVIEW",
        };
        write!(f, "{name}")
    }
}

/// Automation triggers raised by background changes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomTrigger {
    /// A video background started on the primary output
    VideoStart,
    /// A video background on the primary output ended
    VideoEnd,
}

/// Direction of an audio fade
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeDirection {
    /// Fade other audio out
    Out,
    /// Fade other audio back in
    In,
}

/// Usage log entry recorded when a show goes live
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UsageEntry {
    /// Show name
    pub name: String,
    /// When the show went live
    pub time: DateTime<Utc>,
    /// Non-empty metadata fields of the show
    pub metadata: Vec<(String, String)>,
}

/// A message for the output transport
#[derive(Clone, Debug, PartialEq)]
pub struct TransportMessage {
    /// Channel
    pub channel: OutputChannel,
    /// Message path
    pub path: &'static str,
    /// JSON payload
    pub payload: serde_json::Value,
}

/// Outbound event of the output core
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutputEvent {
    // ============================================
    // Output windows
    // ============================================
    /// Current layers of an output after a state change
    State {
        /// Output
        output_id: OutputId,
        /// Snapshot of the output's layers
        layers: OutLayers,
    },

    /// An output was created
    Created {
        /// Output
        output_id: OutputId,
        /// Output configuration
        output: Output,
    },

    /// An output was removed
    Removed {
        /// Output
        output_id: OutputId,
    },

    /// Show or hide an output window
    Display {
        /// Output
        output_id: OutputId,
        /// Output configuration
        output: Output,
        /// Window should be shown
        enabled: bool,
        /// Re-create the window even if it is in the requested state
        force: bool,
    },

    /// Playback flags of a video background
    VideoData {
        /// Output
        output_id: OutputId,
        /// Audio muted
        muted: bool,
        /// Loop playback
        looping: bool,
    },

    /// Playback start offset of a video background
    VideoTime {
        /// Output
        output_id: OutputId,
        /// Offset in seconds
        start_at: f64,
    },

    // ============================================
    // Other windows
    // ============================================
    /// Stop the externally driven slideshow
    StopPresentation,

    /// Mirror an output's background to stage displays
    StageMirror {
        /// Output
        output_id: OutputId,
    },

    /// Refresh the scaled-down preview of an output
    Preview {
        /// Output
        output_id: OutputId,
    },

    // ============================================
    // Automation
    // ============================================
    /// Run an automation action
    RunAction {
        /// Action
        action_id: ActionId,
    },

    /// Raise a custom trigger
    Activate {
        /// Trigger
        trigger: CustomTrigger,
    },

    /// Fade other audio
    FadeAudio {
        /// Fade direction
        direction: FadeDirection,
    },

    /// A usage entry was recorded
    UsageLogged {
        /// Entry
        entry: UsageEntry,
    },
}

fn output_payload(output_id: &OutputId, output: &Output) -> serde_json::Value {
    let mut payload = json!(output);
    if let Some(map) = payload.as_object_mut() {
        map.insert("id".to_string(), json!(output_id));
    }
    payload
}

impl OutputEvent {
    /// Short name for logging
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::State { .. } => "state",
            Self::Created { .. } => "created",
            Self::Removed { .. } => "removed",
            Self::Display { .. } => "display",
            Self::VideoData { .. } => "video_data",
            Self::VideoTime { .. } => "video_time",
            Self::StopPresentation => "stop_presentation",
            Self::StageMirror { .. } => "stage_mirror",
            Self::Preview { .. } => "preview",
            Self::RunAction { .. } => "run_action",
            Self::Activate { .. } => "activate",
            Self::FadeAudio { .. } => "fade_audio",
            Self::UsageLogged { .. } => "usage_logged",
        }
    }

    /// Output the event concerns, if any
    #[must_use]
    pub fn output_id(&self) -> Option<&OutputId> {
        match self {
            Self::State { output_id, .. }
            | Self::Created { output_id, .. }
            | Self::Removed { output_id }
            | Self::Display { output_id, .. }
            | Self::VideoData { output_id, .. }
            | Self::VideoTime { output_id, .. }
            | Self::StageMirror { output_id }
            | Self::Preview { output_id } => Some(output_id),
            _ => None,
        }
    }

    /// Transport message for events delivered through the output transport
    ///
    /// Returns `None` for automation events, which go to other collaborators.
    #[must_use]
    pub fn transport_message(&self) -> Option<TransportMessage> {
        let (channel, path, payload) = match self {
            Self::State { output_id, layers } => (
                OutputChannel::Output,
                "OUTPUTS",
                json!({ "id": output_id, "out": layers }),
            ),
            Self::Created { output_id, output } => (
                OutputChannel::Output,
                "CREATE",
                output_payload(output_id, output),
            ),
            Self::Removed { output_id } => {
                (OutputChannel::Output, "REMOVE", json!({ "id": output_id }))
            }
            Self::Display {
                output_id,
                output,
                enabled,
                force,
            } => (
                OutputChannel::Output,
                "DISPLAY",
                json!({
                    "enabled": enabled,
                    "force": force,
                    "output": output_payload(output_id, output),
                }),
            ),
            Self::VideoData {
                output_id,
                muted,
                looping,
            } => (
                OutputChannel::Output,
                "DATA",
                json!({ "id": output_id, "muted": muted, "loop": looping }),
            ),
            Self::VideoTime {
                output_id,
                start_at,
            } => (
                OutputChannel::Output,
                "TIME",
                json!({ "id": output_id, "time": start_at }),
            ),
            Self::StopPresentation => (
                OutputChannel::Main,
                "PRESENTATION_CONTROL",
                json!({ "action": "stop" }),
            ),
            Self::StageMirror { output_id } => {
                (OutputChannel::Stage, "BACKGROUND", json!({ "id": output_id }))
            }
            Self::Preview { output_id } => {
                (OutputChannel::Preview, "REFRESH", json!({ "id": output_id }))
            }
            Self::RunAction { .. }
            | Self::Activate { .. }
            | Self::FadeAudio { .. }
            | Self::UsageLogged { .. } => return None,
        };

        Some(TransportMessage {
            channel,
            path,
            payload,
        })
    }
}
