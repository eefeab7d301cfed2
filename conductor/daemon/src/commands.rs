//! Control Commands
//!
//! One JSON object per input line, tagged by `command`. Every command
//! produces exactly one [`CommandReply`].
//!
//! ```json
//! {"command":"set_output","update":{"layer":"overlays","value":{"ids":["logo"],"mode":"toggle"}}}
//! {"command":"add_output"}
//! {"command":"display_outputs","force":true}
//! ```

use serde::{Deserialize, Serialize};

use output_core::{
    Output, OutputConductor, OutputId, OutputUpdate, RegistrySummary, ResolveOptions, Resolution,
    StageOutputOptions,
};

/// A command read from the control input
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ControlCommand {
    /// Apply a layer update
    SetOutput {
        /// The update
        update: OutputUpdate,
        /// Target output, the default targets when absent
        #[serde(default)]
        output_id: Option<OutputId>,
    },
    /// Add a regular output
    AddOutput,
    /// Delete an output
    DeleteOutput {
        /// Output
        output_id: OutputId,
    },
    /// Create the key output of a regular output
    CreateKeyOutput {
        /// Key output id
        output_id: OutputId,
    },
    /// Delete a key output
    DeleteKeyOutput {
        /// Key output id
        output_id: OutputId,
    },
    /// Create a stage output
    CreateStageOutput {
        /// Stage output options
        #[serde(default)]
        options: StageOutputOptions,
    },
    /// Remove a stage output
    RemoveStageOutput {
        /// Output
        output_id: OutputId,
    },
    /// Switch the stage layout of one or all stage outputs
    ChangeStageLayout {
        /// Output, every stage output when absent
        #[serde(default)]
        output_id: Option<OutputId>,
        /// New stage layout
        layout: String,
    },
    /// Show or hide all output windows
    DisplayOutputs {
        /// Re-create windows already in the requested state
        #[serde(default)]
        force: bool,
    },
    /// Show or hide one output window
    ToggleOutput {
        /// Output
        output_id: OutputId,
    },
    /// Ask renderers to redraw
    RefreshOut,
    /// List all outputs
    ListOutputs,
    /// Outputs an untargeted update would reach
    ActiveOutputs,
    /// Registry counters
    Summary,
    /// Resolution of an output
    Resolution {
        /// Output, the first active one when absent
        #[serde(default)]
        output_id: Option<OutputId>,
    },
}

/// Reply to a [`ControlCommand`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum CommandReply {
    /// Outputs touched by the command
    Updated {
        /// Outputs
        outputs: Vec<OutputId>,
    },
    /// An output was created
    Created {
        /// New output
        output_id: OutputId,
    },
    /// Whether the command changed anything
    Done {
        /// Something changed
        changed: bool,
    },
    /// Output list
    Outputs {
        /// Outputs by id
        outputs: Vec<(OutputId, Output)>,
    },
    /// Registry counters
    Summary {
        /// Counters
        summary: RegistrySummary,
    },
    /// Resolution of an output
    Resolution {
        /// Resolution
        resolution: Resolution,
    },
    /// The command could not be applied
    Error {
        /// Reason
        message: String,
    },
}

impl ControlCommand {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetOutput { .. } => "set_output",
            Self::AddOutput => "add_output",
            Self::DeleteOutput { .. } => "delete_output",
            Self::CreateKeyOutput { .. } => "create_key_output",
            Self::DeleteKeyOutput { .. } => "delete_key_output",
            Self::CreateStageOutput { .. } => "create_stage_output",
            Self::RemoveStageOutput { .. } => "remove_stage_output",
            Self::ChangeStageLayout { .. } => "change_stage_layout",
            Self::DisplayOutputs { .. } => "display_outputs",
            Self::ToggleOutput { .. } => "toggle_output",
            Self::RefreshOut => "refresh_out",
            Self::ListOutputs => "list_outputs",
            Self::ActiveOutputs => "active_outputs",
            Self::Summary => "summary",
            Self::Resolution { .. } => "resolution",
        }
    }

    /// Apply the command to the conductor
    pub fn apply(self, conductor: &OutputConductor) -> CommandReply {
        match self {
            Self::SetOutput { update, output_id } => CommandReply::Updated {
                outputs: conductor.set_output(update, output_id),
            },
            Self::AddOutput => CommandReply::Created {
                output_id: conductor.add_output(),
            },
            Self::DeleteOutput { output_id } => match conductor.try_delete_output(&output_id) {
                Ok(_) => CommandReply::Done { changed: true },
                Err(e) => CommandReply::Error {
                    message: e.to_string(),
                },
            },
            Self::CreateKeyOutput { output_id } => CommandReply::Done {
                changed: conductor.create_key_output(&output_id),
            },
            Self::DeleteKeyOutput { output_id } => CommandReply::Done {
                changed: conductor.delete_key_output(&output_id),
            },
            Self::CreateStageOutput { options } => CommandReply::Created {
                output_id: conductor.create_stage_output(options),
            },
            Self::RemoveStageOutput { output_id } => CommandReply::Done {
                changed: conductor.remove_stage_output(&output_id),
            },
            Self::ChangeStageLayout { output_id, layout } => CommandReply::Done {
                changed: conductor.change_stage_output_layout(output_id.as_ref(), &layout) > 0,
            },
            Self::DisplayOutputs { force } => CommandReply::Done {
                changed: conductor.display_outputs(force),
            },
            Self::ToggleOutput { output_id } => CommandReply::Done {
                changed: conductor.toggle_output(&output_id),
            },
            Self::RefreshOut => {
                conductor.refresh_out();
                CommandReply::Done { changed: true }
            }
            Self::ListOutputs => CommandReply::Outputs {
                outputs: conductor.outputs(),
            },
            Self::ActiveOutputs => CommandReply::Updated {
                outputs: conductor.active_outputs(ResolveOptions::default()),
            },
            Self::Summary => CommandReply::Summary {
                summary: conductor.summary(),
            },
            Self::Resolution { output_id } => CommandReply::Resolution {
                resolution: conductor.resolution(output_id.as_ref()),
            },
        }
    }
}
