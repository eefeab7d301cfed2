//! Output Registry - Configured Outputs and Their Displayed State
//!
//! The registry holds every configured output keyed by [`OutputId`] and
//! remembers the order in which outputs were declared, so that sorting by
//! name stays deterministic when names collide.
//!
//! # Ownership
//!
//! The registry itself is a plain owned value. It lives inside the
//! conductor's state behind a single lock; every read-modify-write of an
//! output happens under that lock.
//!
//! ```text
//!   OutputConductor ── Arc<Mutex<ConductorState>>
//!                                   │
//!                          ┌────────┴────────┐
//!                          │ OutputRegistry  │
//!                          │  outputs  map   │
//!                          │  order    vec   │
//!                          └─────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{OutputError, Result};
use crate::ids::OutputId;
use crate::model::{Bounds, Output};

/// Options for a new stage output
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageOutputOptions {
    /// Display name
    pub name: String,
    /// Stage layout shown on the output
    pub stage_layout: String,
    /// Window bounds, copied from the first active output when absent
    pub bounds: Option<Bounds>,
    /// Highlight color, the configured stage color when absent
    pub color: Option<String>,
}

/// Registry of configured outputs
#[derive(Clone, Default)]
pub struct OutputRegistry {
    outputs: HashMap<OutputId, Output>,
    order: Vec<OutputId>,
}

impl OutputRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an output
    ///
    /// Replacing keeps the output's original declaration position.
    pub fn insert(&mut self, id: OutputId, output: Output) {
        if self.outputs.insert(id.clone(), output).is_none() {
            self.order.push(id.clone());
            tracing::info!(output_id = %id, "Output registered");
        }
    }

    /// Remove an output, ignoring the last-output rule
    pub fn remove(&mut self, id: &OutputId) -> Option<Output> {
        let removed = self.outputs.remove(id);
        if removed.is_some() {
            self.order.retain(|o| o != id);
            tracing::info!(output_id = %id, "Output removed");
        }
        removed
    }

    /// Get an output
    #[must_use]
    pub fn get(&self, id: &OutputId) -> Option<&Output> {
        self.outputs.get(id)
    }

    /// Get an output for modification
    pub fn get_mut(&mut self, id: &OutputId) -> Option<&mut Output> {
        self.outputs.get_mut(id)
    }

    /// Check if an output exists
    #[must_use]
    pub fn contains(&self, id: &OutputId) -> bool {
        self.outputs.contains_key(id)
    }

    /// Number of outputs
    #[must_use]
    pub fn count(&self) -> usize {
        self.outputs.len()
    }

    /// Whether the registry has no outputs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Output ids in declaration order
    #[must_use]
    pub fn ids(&self) -> Vec<OutputId> {
        self.order.clone()
    }

    /// Outputs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&OutputId, &Output)> {
        self.order
            .iter()
            .filter_map(|id| self.outputs.get(id).map(|output| (id, output)))
    }

    /// Outputs sorted by name, ties broken by declaration order
    #[must_use]
    pub fn sorted(&self) -> Vec<(&OutputId, &Output)> {
        let mut outputs: Vec<_> = self.iter().collect();
        // stable sort keeps declaration order for equal names
        outputs.sort_by(|(_, a), (_, b)| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        outputs
    }

    /// First declared stage output
    #[must_use]
    pub fn first_stage_output(&self) -> Option<OutputId> {
        self.iter()
            .find(|(_, output)| output.is_stage())
            .map(|(id, _)| id.clone())
    }

    /// `base`, or `base N` with the lowest N that is not taken
    #[must_use]
    pub fn unique_name(&self, base: &str) -> String {
        let taken = |name: &str| self.outputs.values().any(|o| o.name == name);
        let mut n = 0;
        loop {
            let candidate = if n == 0 {
                base.to_string()
            } else {
                format!("{base} {n}")
            };
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Add a new output based on `template`, renaming it to a unique name
    pub fn add_output(&mut self, mut template: Output) -> OutputId {
        let id = OutputId::generate();
        template.name = self.unique_name(&template.name);
        self.insert(id.clone(), template);
        id
    }

    /// Delete an output, keeping at least one in the registry
    ///
    /// # Errors
    ///
    /// [`OutputError::UnknownOutput`] if the id is not registered and
    /// [`OutputError::LastOutput`] if it is the only output left.
    pub fn delete_output(&mut self, id: &OutputId) -> Result<Output> {
        if !self.contains(id) {
            return Err(OutputError::UnknownOutput(id.clone()));
        }
        if self.count() <= 1 {
            return Err(OutputError::LastOutput(id.clone()));
        }
        self.remove(id)
            .ok_or_else(|| OutputError::UnknownOutput(id.clone()))
    }

    /// Summary of the configured outputs
    #[must_use]
    pub fn summary(&self) -> RegistrySummary {
        let mut summary = RegistrySummary {
            total_outputs: self.count(),
            ..RegistrySummary::default()
        };
        for output in self.outputs.values() {
            summary.enabled += usize::from(output.enabled);
            summary.active += usize::from(output.enabled && output.active);
            summary.key_outputs += usize::from(output.is_key_output);
            summary.stage_outputs += usize::from(output.is_stage());
        }
        summary
    }
}

impl fmt::Debug for OutputRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputRegistry")
            .field("output_count", &self.outputs.len())
            .field("outputs", &self.order)
            .finish()
    }
}

/// Summary of configured outputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySummary {
    /// Total number of outputs
    pub total_outputs: usize,
    /// Enabled outputs
    pub enabled: usize,
    /// Enabled and active outputs
    pub active: usize,
    /// Key outputs
    pub key_outputs: usize,
    /// Stage outputs
    pub stage_outputs: usize,
}
