//! Active-Output Resolver
//!
//! Decides which outputs an update targets when the caller did not name one.
//! The resolver never returns an empty list for a non-empty registry, and
//! [`resolve_or_create`] seeds an empty registry with a default output, so
//! updates cannot silently target nothing.

use serde::{Deserialize, Serialize};

use crate::ids::OutputId;
use crate::model::Output;
use crate::registry::OutputRegistry;

/// Filters applied while resolving target outputs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolveOptions {
    /// Narrow to `active` outputs when at least one is active
    pub require_active: bool,
    /// Skip key outputs
    pub exclude_key_output: bool,
    /// Skip stage outputs
    pub exclude_stage_output: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            require_active: true,
            exclude_key_output: false,
            exclude_stage_output: false,
        }
    }
}

impl ResolveOptions {
    /// Every enabled output, active or not
    #[must_use]
    pub fn all_enabled() -> Self {
        Self {
            require_active: false,
            ..Self::default()
        }
    }

    /// Enabled "real" outputs: no key or stage outputs
    #[must_use]
    pub fn displays_only(require_active: bool) -> Self {
        Self {
            require_active,
            exclude_key_output: true,
            exclude_stage_output: true,
        }
    }
}

/// Resolve target outputs without modifying the registry
///
/// Returns an empty list only when the registry is empty.
#[must_use]
pub fn resolve(registry: &OutputRegistry, options: ResolveOptions) -> Vec<OutputId> {
    let sorted = registry.sorted();

    let enabled: Vec<_> = sorted
        .iter()
        .filter(|(_, output)| {
            output.enabled
                && !(options.exclude_key_output && output.is_key_output)
                && !(options.exclude_stage_output && output.is_stage())
        })
        .collect();

    let any_active = enabled.iter().any(|(_, output)| output.active);
    let ids: Vec<OutputId> = enabled
        .iter()
        .filter(|(_, output)| !options.require_active || !any_active || output.active)
        .map(|(id, _)| (*id).clone())
        .collect();

    if ids.is_empty() {
        return sorted.first().map(|(id, _)| (*id).clone()).into_iter().collect();
    }
    ids
}

/// Resolve target outputs, creating a default output in an empty registry
pub fn resolve_or_create(
    registry: &mut OutputRegistry,
    options: ResolveOptions,
    default_output: impl FnOnce() -> Output,
) -> Vec<OutputId> {
    if registry.is_empty() {
        let id = registry.add_output(default_output());
        tracing::info!(output_id = %id, "Created default output for empty registry");
    }
    resolve(registry, options)
}
