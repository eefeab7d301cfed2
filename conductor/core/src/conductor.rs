//! Output Conductor - The Live Output Core
//!
//! The conductor owns every configured output and decides what each one
//! shows. It orchestrates:
//! - The output registry (add, delete, key and stage outputs)
//! - Layer updates through [`OutputConductor::set_output`]
//! - Overlay expiry timers
//! - The slide content cache used by renderers
//!
//! # Design Philosophy
//!
//! The conductor is renderer-agnostic. It never talks to a window, a mixer
//! or an automation engine directly. Everything it wants done is pushed as
//! an [`OutputEvent`] onto an unbounded channel and delivered out of band by
//! the [`crate::dispatch::EffectDispatcher`].
//!
//! ```text
//!   callers ──┐                         ┌──▶ OutputEvent channel
//!   timers ───┼──▶ Mutex<ConductorState>┤
//!   delays ───┘     (one lock, one path)└──▶ snapshots to callers
//! ```
//!
//! All state lives in one [`ConductorState`] behind a single lock. User
//! calls, overlay timer expiry and delayed housekeeping all take that lock,
//! so every update is atomic with respect to every other. Nothing awaits
//! while the lock is held.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::collaborators::ShowStore;
use crate::compose::{merge_with_template, template_extra_items, MergeOptions};
use crate::config::OutputConfig;
use crate::error::Result;
use crate::events::{OutputEvent, UsageEntry};
use crate::ids::{OutputId, OverlayId, TemplateId};
use crate::items::Item;
use crate::metadata::{compute_metadata, OutputMetadata};
use crate::model::{Background, OutSlide, Output, Transition};
use crate::registry::{OutputRegistry, RegistrySummary, StageOutputOptions};
use crate::resolution::{
    blending_mask, compute_resolution, compute_scaled_resolution, stage_resolution, Resolution,
};
use crate::resolver::{resolve, resolve_or_create, ResolveOptions};
use crate::style::Style;
use crate::timers::{OverlayTimers, TimerKey};

// ============================================================================
// Updates
// ============================================================================

/// How an overlay update combines with the current overlay list
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayMode {
    /// Replace the list wholesale
    #[default]
    Replace,
    /// Remove the first id if the first target shows it, otherwise add
    Toggle,
    /// Add the ids to the list
    Add,
}

/// An overlay update
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayChange {
    /// Overlay ids, in stacking order
    pub ids: Vec<OverlayId>,
    /// Combination mode
    pub mode: OverlayMode,
}

impl OverlayChange {
    /// Replace the overlay list
    #[must_use]
    pub fn replace(ids: Vec<OverlayId>) -> Self {
        Self {
            ids,
            mode: OverlayMode::Replace,
        }
    }

    /// Toggle a single overlay
    pub fn toggle(id: impl Into<OverlayId>) -> Self {
        Self {
            ids: vec![id.into()],
            mode: OverlayMode::Toggle,
        }
    }

    /// Add overlays to the list
    #[must_use]
    pub fn add(ids: Vec<OverlayId>) -> Self {
        Self {
            ids,
            mode: OverlayMode::Add,
        }
    }
}

/// A change to one layer of the targeted outputs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer", content = "value", rename_all = "snake_case")]
pub enum OutputUpdate {
    /// Set or clear the slide layer
    Slide(Option<OutSlide>),
    /// Set or clear the background layer
    Background(Option<Background>),
    /// Change the overlay list
    Overlays(OverlayChange),
    /// Set or clear the transition layer
    Transition(Option<Transition>),
}

impl OutputUpdate {
    /// Layer name for logging
    #[must_use]
    pub fn layer(&self) -> &'static str {
        match self {
            Self::Slide(_) => "slide",
            Self::Background(_) => "background",
            Self::Overlays(_) => "overlays",
            Self::Transition(_) => "transition",
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Cached displayed items of an output
#[derive(Clone, Debug)]
pub(crate) struct CachedSlide {
    pub(crate) slide: OutSlide,
    pub(crate) items: Vec<Item>,
}

/// Everything the conductor mutates, guarded by one lock
#[derive(Debug, Default)]
pub(crate) struct ConductorState {
    pub(crate) registry: OutputRegistry,
    pub(crate) timers: OverlayTimers,
    /// Overlay list of the last overlay update, restored across sessions
    pub(crate) locked_overlays: Vec<OverlayId>,
    pub(crate) usage_log: Vec<UsageEntry>,
    pub(crate) slide_cache: HashMap<OutputId, CachedSlide>,
    /// Outputs whose windows are currently shown
    pub(crate) displayed: BTreeSet<OutputId>,
}

/// Shared core behind every [`OutputConductor`] handle
pub(crate) struct Shared {
    pub(crate) state: Mutex<ConductorState>,
    pub(crate) store: Arc<dyn ShowStore>,
    pub(crate) config: OutputConfig,
    pub(crate) events: mpsc::UnboundedSender<OutputEvent>,
    /// Handle given to timer and delay tasks so they never keep the core alive
    pub(crate) weak_self: Weak<Shared>,
}

impl Shared {
    /// Queue an event for the dispatcher
    pub(crate) fn emit(&self, event: OutputEvent) {
        let name = event.name();
        if self.events.send(event).is_err() {
            tracing::trace!(event = name, "Event receiver dropped");
        }
    }

    /// Queue an event after a delay
    ///
    /// Without a tokio runtime the event is queued immediately.
    pub(crate) fn emit_after(&self, delay: Duration, event: OutputEvent) {
        let runtime = tokio::runtime::Handle::try_current();
        match runtime {
            Ok(runtime) if !delay.is_zero() => {
                let events = self.events.clone();
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    let name = event.name();
                    if events.send(event).is_err() {
                        tracing::trace!(event = name, "Event receiver dropped before delayed send");
                    }
                });
            }
            _ => self.emit(event),
        }
    }

    /// Run `f` on the state after a delay
    ///
    /// Without a tokio runtime `f` runs immediately on `state`, which the
    /// caller already holds.
    pub(crate) fn after_delay<F>(&self, state: &mut ConductorState, delay: Duration, f: F)
    where
        F: FnOnce(&Shared, &mut ConductorState) + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            f(self, state);
            return;
        };

        let weak = self.weak_self.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                let mut state = shared.state.lock();
                f(&shared, &mut state);
            }
        });
    }

    pub(crate) fn style_of(&self, output: &Output) -> Option<Style> {
        output.style.as_ref().and_then(|id| self.store.style(id))
    }

    /// Resolve targets, announcing a default output if one had to be created
    pub(crate) fn resolve_targets(
        &self,
        state: &mut ConductorState,
        options: ResolveOptions,
    ) -> Vec<OutputId> {
        let was_empty = state.registry.is_empty();
        let ids = resolve_or_create(&mut state.registry, options, || {
            self.config.primary_output()
        });
        if was_empty {
            for id in &ids {
                if let Some(output) = state.registry.get(id) {
                    self.emit(OutputEvent::Created {
                        output_id: id.clone(),
                        output: output.clone(),
                    });
                }
            }
        }
        ids
    }
}

// ============================================================================
// Conductor
// ============================================================================

/// Handle to the live output core
///
/// Cloning is cheap; all clones share the same state.
#[derive(Clone)]
pub struct OutputConductor {
    pub(crate) shared: Arc<Shared>,
}

impl OutputConductor {
    /// Create a conductor with a single primary output
    pub fn new(
        config: OutputConfig,
        store: Arc<dyn ShowStore>,
        events: mpsc::UnboundedSender<OutputEvent>,
    ) -> Self {
        Self::with_outputs(config, store, events, Vec::new())
    }

    /// Create a conductor from previously configured outputs
    ///
    /// A primary output is created when `outputs` is empty, so the registry
    /// is never empty once the conductor exists.
    pub fn with_outputs(
        config: OutputConfig,
        store: Arc<dyn ShowStore>,
        events: mpsc::UnboundedSender<OutputEvent>,
        outputs: impl IntoIterator<Item = (OutputId, Output)>,
    ) -> Self {
        let mut registry = OutputRegistry::new();
        for (id, output) in outputs {
            registry.insert(id, output);
        }
        if registry.is_empty() {
            let id = registry.add_output(config.primary_output());
            tracing::info!(output_id = %id, "Created primary output");
        }

        let state = ConductorState {
            registry,
            ..ConductorState::default()
        };

        let shared = Arc::new_cyclic(|weak_self| Shared {
            state: Mutex::new(state),
            store,
            config,
            events,
            weak_self: weak_self.clone(),
        });

        Self { shared }
    }

    /// Conductor configuration
    #[must_use]
    pub fn config(&self) -> &OutputConfig {
        &self.shared.config
    }

    // ========================================================================
    // Layer updates
    // ========================================================================

    /// Apply a layer update
    ///
    /// Targets `output_id` when given, otherwise the slide's bindings (for
    /// slide updates) or the active outputs. Ids that are not registered are
    /// skipped. Returns the outputs that were updated.
    pub fn set_output(&self, update: OutputUpdate, output_id: Option<OutputId>) -> Vec<OutputId> {
        let mut state = self.shared.state.lock();
        self.shared.apply_update(&mut state, update, output_id)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Resolve the outputs an update without an explicit target would use
    ///
    /// Never empty: an empty registry gets a default output.
    pub fn active_outputs(&self, options: ResolveOptions) -> Vec<OutputId> {
        let mut state = self.shared.state.lock();
        self.shared.resolve_targets(&mut state, options)
    }

    /// Snapshot of an output
    #[must_use]
    pub fn output(&self, id: &OutputId) -> Option<Output> {
        self.shared.state.lock().registry.get(id).cloned()
    }

    /// Snapshot of all outputs, sorted by name
    #[must_use]
    pub fn outputs(&self) -> Vec<(OutputId, Output)> {
        let state = self.shared.state.lock();
        state
            .registry
            .sorted()
            .into_iter()
            .map(|(id, output)| (id.clone(), output.clone()))
            .collect()
    }

    /// Registry summary
    #[must_use]
    pub fn summary(&self) -> RegistrySummary {
        self.shared.state.lock().registry.summary()
    }

    /// Usage entries recorded so far
    #[must_use]
    pub fn usage_log(&self) -> Vec<UsageEntry> {
        self.shared.state.lock().usage_log.clone()
    }

    /// Overlay list of the most recent overlay update
    #[must_use]
    pub fn locked_overlays(&self) -> Vec<OverlayId> {
        self.shared.state.lock().locked_overlays.clone()
    }

    /// Pending overlay timers
    #[must_use]
    pub fn overlay_timers(&self) -> Vec<TimerKey> {
        self.shared.state.lock().timers.active()
    }

    /// Whether an overlay timer is pending for a pair
    #[must_use]
    pub fn has_overlay_timer(&self, output_id: &OutputId, overlay_id: &OverlayId) -> bool {
        self.shared.state.lock().timers.contains(output_id, overlay_id)
    }

    /// Whether an output window is shown
    #[must_use]
    pub fn is_displayed(&self, id: &OutputId) -> bool {
        self.shared.state.lock().displayed.contains(id)
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Add an output with the configured defaults
    pub fn add_output(&self) -> OutputId {
        self.add_output_from(self.shared.config.default_output())
    }

    /// Add an output based on `template`
    ///
    /// The name is made unique by appending a number.
    pub fn add_output_from(&self, template: Output) -> OutputId {
        let mut state = self.shared.state.lock();
        let id = state.registry.add_output(template);
        self.announce_output(&mut state, &id);
        id
    }

    /// Create a key output under a caller-chosen id
    ///
    /// Returns false when the id is already taken.
    pub fn create_key_output(&self, id: &OutputId) -> bool {
        let mut state = self.shared.state.lock();
        if state.registry.contains(id) {
            tracing::warn!(output_id = %id, "Key output id already in use");
            return false;
        }
        state
            .registry
            .insert(id.clone(), self.shared.config.key_output());
        self.announce_output(&mut state, id);
        true
    }

    /// Delete a key output
    ///
    /// Returns false for ids that are not key outputs or that could not be
    /// deleted.
    pub fn delete_key_output(&self, id: &OutputId) -> bool {
        let is_key = self
            .shared
            .state
            .lock()
            .registry
            .get(id)
            .is_some_and(|output| output.is_key_output);
        if !is_key {
            tracing::debug!(output_id = %id, "Not a key output, nothing deleted");
            return false;
        }
        self.delete_output(id)
    }

    /// Delete an output, keeping at least one
    ///
    /// # Errors
    ///
    /// [`crate::OutputError::UnknownOutput`] for unregistered ids and
    /// [`crate::OutputError::LastOutput`] for the last remaining output.
    pub fn try_delete_output(&self, id: &OutputId) -> Result<Output> {
        let mut state = self.shared.state.lock();
        let removed = state.registry.delete_output(id)?;
        self.forget_output(&mut state, id);
        Ok(removed)
    }

    /// Delete an output, keeping at least one
    ///
    /// Returns false when nothing was deleted.
    pub fn delete_output(&self, id: &OutputId) -> bool {
        match self.try_delete_output(id) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(output_id = %id, error = %e, "Output not deleted");
                false
            }
        }
    }

    /// Create a stage output
    ///
    /// Bounds default to the first active output's bounds and the color to
    /// the configured stage color.
    pub fn create_stage_output(&self, options: StageOutputOptions) -> OutputId {
        let mut state = self.shared.state.lock();

        let bounds = options.bounds.unwrap_or_else(|| {
            resolve(&state.registry, ResolveOptions::default())
                .first()
                .and_then(|id| state.registry.get(id))
                .map(|output| output.bounds)
                .unwrap_or_default()
        });

        let output = Output {
            name: options.name,
            stage_output: Some(options.stage_layout),
            color: options
                .color
                .unwrap_or_else(|| self.shared.config.stage_color.clone()),
            bounds,
            ..Output::default()
        };

        let id = OutputId::generate();
        state.registry.insert(id.clone(), output.clone());
        self.shared.emit(OutputEvent::Created {
            output_id: id.clone(),
            output,
        });
        id
    }

    /// Remove a stage output
    ///
    /// Returns false for ids that are not stage outputs. Stage outputs are
    /// not subject to the last-output rule.
    pub fn remove_stage_output(&self, id: &OutputId) -> bool {
        let mut state = self.shared.state.lock();
        if !state.registry.get(id).is_some_and(Output::is_stage) {
            return false;
        }
        state.registry.remove(id);
        self.forget_output(&mut state, id);
        true
    }

    /// Point stage outputs at another stage layout
    ///
    /// Changes `output_id` only when given, otherwise every stage output.
    /// Returns the number of outputs changed.
    pub fn change_stage_output_layout(&self, output_id: Option<&OutputId>, layout: &str) -> usize {
        let mut state = self.shared.state.lock();
        let ids = match output_id {
            Some(id) => vec![id.clone()],
            None => state.registry.ids(),
        };

        let mut changed = 0;
        for id in ids {
            let Some(output) = state.registry.get_mut(&id) else {
                continue;
            };
            if output.is_stage() {
                output.stage_output = Some(layout.to_string());
                changed += 1;
            }
        }
        tracing::debug!(layout, changed, "Stage output layout changed");
        changed
    }

    fn announce_output(&self, state: &mut ConductorState, id: &OutputId) {
        let Some(output) = state.registry.get(id).cloned() else {
            return;
        };
        self.shared.emit(OutputEvent::Created {
            output_id: id.clone(),
            output: output.clone(),
        });
        if !state.displayed.is_empty() {
            state.displayed.insert(id.clone());
            self.shared.emit(OutputEvent::Display {
                output_id: id.clone(),
                output,
                enabled: true,
                force: false,
            });
        }
    }

    fn forget_output(&self, state: &mut ConductorState, id: &OutputId) {
        let timers = state.timers.clear_all(id);
        state.slide_cache.remove(id);
        state.displayed.remove(id);
        tracing::debug!(output_id = %id, timers, "Output state discarded");
        self.shared.emit(OutputEvent::Removed {
            output_id: id.clone(),
        });
    }

    // ========================================================================
    // Windows
    // ========================================================================

    /// Show or hide all enabled output windows
    ///
    /// Shows them when none is shown (or `force` is set), hides them
    /// otherwise. Stage outputs are handled last. Returns whether the
    /// windows are now shown.
    pub fn display_outputs(&self, force: bool) -> bool {
        let mut state = self.shared.state.lock();
        let show = force || state.displayed.is_empty();

        let mut ids = resolve(&state.registry, ResolveOptions::all_enabled());
        // stable: keeps name order inside both groups
        ids.sort_by_key(|id| state.registry.get(id).is_some_and(Output::is_stage));

        state.displayed.clear();
        for id in ids {
            let Some(output) = state.registry.get(&id).cloned() else {
                continue;
            };
            if !output.enabled {
                continue;
            }
            let force_window = force || output.allow_main_screen || output.bounds_locked;
            if show {
                state.displayed.insert(id.clone());
            }
            self.shared.emit(OutputEvent::Display {
                output_id: id,
                output,
                enabled: show,
                force: force_window,
            });
        }

        tracing::info!(shown = show, "Output windows toggled");
        show
    }

    /// Toggle a single output window
    ///
    /// Disabled outputs are ignored; returns whether a toggle was issued.
    pub fn toggle_output(&self, id: &OutputId) -> bool {
        let mut state = self.shared.state.lock();
        let Some(output) = state.registry.get(id).filter(|o| o.enabled).cloned() else {
            return false;
        };

        let show = !state.displayed.contains(id);
        if show {
            state.displayed.insert(id.clone());
        } else {
            state.displayed.remove(id);
        }
        self.shared.emit(OutputEvent::Display {
            output_id: id.clone(),
            output,
            enabled: show,
            force: false,
        });
        true
    }

    // ========================================================================
    // Rendering helpers
    // ========================================================================

    /// Items an output renders for its current slide
    ///
    /// The slide items are merged with the output style's template (the
    /// scripture variant for scripture content) in overflow mode. Results
    /// are cached per output until the slide changes.
    pub fn displayed_items(&self, output_id: &OutputId) -> Vec<Item> {
        let mut state = self.shared.state.lock();
        let Some(output) = state.registry.get(output_id) else {
            return Vec::new();
        };
        let Some(slide) = output.out.slide.clone() else {
            return Vec::new();
        };

        if let Some(cached) = state.slide_cache.get(output_id) {
            if cached.slide == slide {
                return cached.items.clone();
            }
        }

        let style = self.shared.style_of(output).unwrap_or_default();
        let Some((slide_items, template_id)) = self.slide_source(&slide, &style) else {
            return Vec::new();
        };

        let template = template_id.and_then(|id| self.shared.store.template(&id));
        let items = match template {
            Some(template) => {
                let mut items =
                    merge_with_template(&slide_items, &template.items, MergeOptions::output());
                items.extend(template_extra_items(&template.settings, |id| {
                    self.shared.store.overlay(id).map(|overlay| overlay.items)
                }));
                items
            }
            None => slide_items,
        };

        state.slide_cache.insert(
            output_id.clone(),
            CachedSlide {
                slide,
                items: items.clone(),
            },
        );
        items
    }

    /// Slide items and governing template id of a displayed slide
    fn slide_source(&self, slide: &OutSlide, style: &Style) -> Option<(Vec<Item>, Option<TemplateId>)> {
        if slide.id.is_temp() {
            let template = match slide.translations {
                Some(count) if count > 0 => style.scripture_template(count),
                _ => style.template.as_ref(),
            };
            return Some((slide.temp_items.clone(), template.cloned()));
        }

        let show = self.shared.store.show(&slide.id)?;
        let items = show.slide_at(&slide.layout, slide.index)?.items.clone();
        let template = match show.reference.as_ref().filter(|r| r.is_scripture()) {
            Some(reference) => style.scripture_template(reference.translation_count()),
            None => style.template.as_ref(),
        };
        Some((items, template.cloned()))
    }

    /// Metadata overlay content of an output
    #[must_use]
    pub fn metadata(&self, output_id: &OutputId, previous: &OutputMetadata) -> OutputMetadata {
        let state = self.shared.state.lock();
        let output = state.registry.get(output_id);
        let style = output
            .and_then(|o| self.shared.style_of(o))
            .unwrap_or_default();
        let slide = output.and_then(|o| o.out.slide.as_ref());
        let show = slide.and_then(|s| self.shared.store.show(&s.id));

        compute_metadata(
            previous,
            show.as_ref(),
            &style,
            |id| self.shared.store.template(id),
            slide,
        )
    }

    /// Aspect ratio of an output, the first active output when `None`
    #[must_use]
    pub fn resolution(&self, output_id: Option<&OutputId>) -> Resolution {
        self.with_output_style(output_id, compute_resolution)
    }

    /// Canonical frame size of an output, the first active output when `None`
    #[must_use]
    pub fn scaled_resolution(&self, output_id: Option<&OutputId>, scaled: bool) -> Resolution {
        self.with_output_style(output_id, |output, style| {
            compute_scaled_resolution(output, style, scaled)
        })
    }

    /// Window size of a stage output, the first stage output when `None`
    #[must_use]
    pub fn stage_resolution(&self, output_id: Option<&OutputId>) -> Resolution {
        stage_resolution(&self.shared.state.lock().registry, output_id)
    }

    /// Edge blending mask of the first active output
    #[must_use]
    pub fn blending_mask(&self) -> String {
        let state = self.shared.state.lock();
        let first = resolve(&state.registry, ResolveOptions::default())
            .into_iter()
            .next();
        let blending = first
            .and_then(|id| state.registry.get(&id))
            .and_then(|output| output.blending.as_ref());
        blending_mask(blending)
    }

    fn with_output_style<R>(
        &self,
        output_id: Option<&OutputId>,
        f: impl FnOnce(Option<&Output>, Option<&Style>) -> R,
    ) -> R {
        let state = self.shared.state.lock();
        let id = output_id
            .cloned()
            .or_else(|| resolve(&state.registry, ResolveOptions::default()).into_iter().next());
        let output = id.and_then(|id| state.registry.get(&id));
        let style = output.and_then(|o| self.shared.style_of(o));
        f(output, style.as_ref())
    }
}

impl fmt::Debug for OutputConductor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("OutputConductor")
            .field("registry", &state.registry)
            .field("timers", &state.timers.len())
            .field("usage_entries", &state.usage_log.len())
            .finish_non_exhaustive()
    }
}
