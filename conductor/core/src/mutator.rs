//! Output State Mutator
//!
//! The single write path for output layers. [`Shared::apply_update`] runs
//! with the state lock held and is used both by
//! [`crate::OutputConductor::set_output`] and by overlay timer expiry, so a
//! timer firing is indistinguishable from a user toggling the overlay off.
//!
//! # Order of effects
//!
//! Within one update, events are queued in the order they are decided:
//!
//! ```text
//!   StopPresentation / RunAction / UsageLogged / FadeAudio / Activate
//!        │
//!        ▼
//!   State (one per target)
//!        │
//!        ▼
//!   delayed: VideoData, VideoTime, StageMirror, Preview
//! ```

use chrono::Utc;

use crate::conductor::{ConductorState, OverlayChange, OverlayMode, OutputUpdate, Shared};
use crate::events::{CustomTrigger, FadeDirection, OutputEvent, UsageEntry};
use crate::ids::{OutputId, OverlayId};
use crate::model::{Background, OutSlide, SlideKind, Transition};
use crate::resolver::ResolveOptions;
use crate::timers::TimerTicket;

impl Shared {
    /// Apply one layer update to its targets
    ///
    /// Returns the outputs that were updated.
    pub(crate) fn apply_update(
        &self,
        state: &mut ConductorState,
        mut update: OutputUpdate,
        output_id: Option<OutputId>,
    ) -> Vec<OutputId> {
        if let OutputUpdate::Slide(Some(slide)) = &mut update {
            self.attach_scripture_reference(slide);
        }

        let all_ids = self.candidate_outputs(state, &update);
        let targets: Vec<OutputId> = output_id
            .map_or_else(|| all_ids.clone(), |id| vec![id])
            .into_iter()
            .filter(|id| {
                let known = state.registry.contains(id);
                if !known {
                    tracing::debug!(output_id = %id, "Skipping unknown output");
                }
                known
            })
            .collect();

        if targets.is_empty() {
            return targets;
        }

        tracing::debug!(
            layer = update.layer(),
            targets = targets.len(),
            "Applying output update"
        );

        let notify_stage = matches!(
            update,
            OutputUpdate::Slide(_) | OutputUpdate::Background(_)
        );

        match update {
            OutputUpdate::Slide(slide) => self.apply_slide(state, &targets, slide),
            OutputUpdate::Background(background) => {
                self.apply_background(state, &targets, &all_ids, background);
            }
            OutputUpdate::Overlays(change) => self.apply_overlays(state, &targets, &change),
            OutputUpdate::Transition(transition) => {
                self.apply_transition(state, &targets, transition);
            }
        }

        for id in &targets {
            if let Some(output) = state.registry.get(id) {
                self.emit(OutputEvent::State {
                    output_id: id.clone(),
                    layers: output.out.clone(),
                });
            }
        }

        if notify_stage {
            for id in &targets {
                self.emit_after(
                    self.config.stage_mirror_delay,
                    OutputEvent::StageMirror {
                        output_id: id.clone(),
                    },
                );
                self.emit_after(
                    self.config.stage_mirror_delay,
                    OutputEvent::Preview {
                        output_id: id.clone(),
                    },
                );
            }
        }

        targets
    }

    /// Outputs an update applies to when no output is named
    ///
    /// Slide bindings win over the active outputs.
    fn candidate_outputs(&self, state: &mut ConductorState, update: &OutputUpdate) -> Vec<OutputId> {
        if let OutputUpdate::Slide(Some(slide)) = update {
            let bindings = self
                .store
                .layout_ref(&slide.id, &slide.layout)
                .into_iter()
                .nth(slide.index)
                .map(|slide_ref| slide_ref.data.bindings)
                .unwrap_or_default();
            if !bindings.is_empty() {
                return bindings;
            }
        }
        self.resolve_targets(state, ResolveOptions::default())
    }

    fn attach_scripture_reference(&self, slide: &mut OutSlide) {
        let Some(reference) = self
            .store
            .show(&slide.id)
            .and_then(|show| show.reference)
            .filter(|reference| reference.is_scripture())
        else {
            return;
        };

        if let Some(attribution) = reference.attribution_string.clone() {
            slide.attribution = Some(attribution);
        }
        if slide.translations.is_none() {
            slide.translations = Some(reference.translation_count());
        }
    }

    // ========================================================================
    // Slide
    // ========================================================================

    fn apply_slide(&self, state: &mut ConductorState, targets: &[OutputId], slide: Option<OutSlide>) {
        if let Some(slide) = &slide {
            let current = targets
                .first()
                .and_then(|id| state.registry.get(id))
                .and_then(|output| output.out.slide.as_ref())
                .map(|current| current.id.clone());
            if current.as_ref() != Some(&slide.id) {
                self.show_went_live(state, slide);
            }
        }

        for id in targets {
            let Some(output) = state.registry.get_mut(id) else {
                continue;
            };
            if stops_presentation(output.out.slide.as_ref(), slide.as_ref()) {
                self.emit(OutputEvent::StopPresentation);
            }
            output.out.slide = slide.clone();
        }

        if let Some(scheduled) = slide {
            let cached_outputs = targets.to_vec();
            self.after_delay(state, self.config.slide_cache_clear_delay, move |_, state| {
                for id in &cached_outputs {
                    let still_shown = state
                        .registry
                        .get(id)
                        .and_then(|output| output.out.slide.as_ref())
                        .is_some_and(|current| *current == scheduled);
                    if still_shown {
                        state.slide_cache.remove(id);
                    }
                }
            });
        }
    }

    /// Category action and usage entry for a show going live
    fn show_went_live(&self, state: &mut ConductorState, slide: &OutSlide) {
        let Some(show) = self.store.show(&slide.id) else {
            return;
        };

        let action = show
            .category
            .as_ref()
            .and_then(|category| self.store.category(category))
            .and_then(|category| category.action);
        if let Some(action_id) = action {
            self.emit(OutputEvent::RunAction { action_id });
        }

        let entry = UsageEntry {
            name: show.name.clone(),
            time: Utc::now(),
            metadata: show.ordered_meta(),
        };
        tracing::info!(show_id = %slide.id, show = %entry.name, "Show went live");
        state.usage_log.push(entry.clone());
        self.emit(OutputEvent::UsageLogged { entry });
    }

    // ========================================================================
    // Background
    // ========================================================================

    fn apply_background(
        &self,
        state: &mut ConductorState,
        targets: &[OutputId],
        all_ids: &[OutputId],
        background: Option<Background>,
    ) {
        let primary = self.primary_output_index(state, all_ids);

        for id in targets {
            let Some(output) = state.registry.get_mut(id) else {
                continue;
            };

            // paged content would keep covering the new background
            if background.is_some() && output.out.slide.as_ref().is_some_and(|s| s.kind.is_paged()) {
                if stops_presentation(output.out.slide.as_ref(), None) {
                    self.emit(OutputEvent::StopPresentation);
                }
                output.out.slide = None;
            }

            let position = all_ids.iter().position(|other| other == id);
            let is_primary = position == Some(primary);
            let mute = all_ids.len() > 1 && !is_primary;
            let previous_was_video = output.out.background.as_ref().is_some_and(Background::is_video);

            let Some(mut background) = background.clone() else {
                if is_primary {
                    self.emit(OutputEvent::FadeAudio {
                        direction: FadeDirection::In,
                    });
                }
                // any output that stops a video ends it, primary or not
                if previous_was_video {
                    self.emit(OutputEvent::Activate {
                        trigger: CustomTrigger::VideoEnd,
                    });
                }
                output.out.background = None;
                continue;
            };

            background.muted = background.muted || mute;

            if is_primary {
                let is_video = background.is_video();
                let fade_out =
                    !background.muted && self.config.mute_audio_when_video_plays && is_video;
                self.emit(OutputEvent::FadeAudio {
                    direction: if fade_out {
                        FadeDirection::Out
                    } else {
                        FadeDirection::In
                    },
                });

                if is_video {
                    self.emit(OutputEvent::Activate {
                        trigger: CustomTrigger::VideoStart,
                    });
                } else if previous_was_video {
                    self.emit(OutputEvent::Activate {
                        trigger: CustomTrigger::VideoEnd,
                    });
                }
            }

            self.emit_after(
                self.config.video_data_delay,
                OutputEvent::VideoData {
                    output_id: id.clone(),
                    muted: background.muted,
                    looping: background.looping,
                },
            );
            if let Some(start_at) = background.start_at {
                self.emit_after(
                    self.config.video_data_delay,
                    OutputEvent::VideoTime {
                        output_id: id.clone(),
                        start_at,
                    },
                );
            }

            output.out.background = Some(background);
        }
    }

    /// Index in `all_ids` of the output whose video keeps its audio
    ///
    /// The first output whose style renders a background and that is
    /// neither a key nor a stage output; 0 when there is none.
    fn primary_output_index(&self, state: &ConductorState, all_ids: &[OutputId]) -> usize {
        all_ids
            .iter()
            .position(|id| {
                state.registry.get(id).is_some_and(|output| {
                    !output.is_key_output
                        && !output.is_stage()
                        && self
                            .style_of(output)
                            .map_or(true, |style| style.renders_background())
                })
            })
            .unwrap_or(0)
    }

    // ========================================================================
    // Overlays
    // ========================================================================

    fn apply_overlays(&self, state: &mut ConductorState, targets: &[OutputId], change: &OverlayChange) {
        let Some(first_id) = change.ids.first() else {
            if change.mode == OverlayMode::Replace {
                for id in targets {
                    state.timers.clear_all(id);
                    if let Some(output) = state.registry.get_mut(id) {
                        output.out.overlays.clear();
                    }
                }
                state.locked_overlays.clear();
            } else {
                tracing::debug!(mode = ?change.mode, "Empty overlay change ignored");
            }
            return;
        };

        let remove = change.mode == OverlayMode::Toggle
            && targets
                .first()
                .and_then(|id| state.registry.get(id))
                .is_some_and(|output| output.out.overlays.contains(first_id));

        for id in targets {
            let Some(output) = state.registry.get_mut(id) else {
                continue;
            };
            let previous = std::mem::take(&mut output.out.overlays);

            let list = if remove {
                previous.iter().filter(|o| *o != first_id).cloned().collect()
            } else {
                match change.mode {
                    OverlayMode::Toggle | OverlayMode::Add => {
                        union(&previous, &change.ids)
                    }
                    OverlayMode::Replace => union(&[], &change.ids),
                }
            };
            output.out.overlays = list.clone();

            let dropped = previous.iter().filter(|o| !list.contains(o));
            for overlay_id in change.ids.iter().chain(dropped) {
                if list.contains(overlay_id) {
                    self.start_overlay_timer(state, id, overlay_id);
                } else {
                    state.timers.clear(id, overlay_id);
                }
            }

            state.locked_overlays = list;
        }
    }

    fn start_overlay_timer(&self, state: &mut ConductorState, output_id: &OutputId, overlay_id: &OverlayId) {
        let Some(duration) = self.store.overlay(overlay_id).and_then(|overlay| overlay.expiry()) else {
            return;
        };

        let weak = self.weak_self.clone();
        state.timers.start(output_id.clone(), overlay_id.clone(), duration, move |ticket| {
            if let Some(shared) = weak.upgrade() {
                shared.overlay_timer_expired(&ticket);
            }
        });
    }

    /// Remove an expired overlay through the regular toggle path
    pub(crate) fn overlay_timer_expired(&self, ticket: &TimerTicket) {
        let mut state = self.state.lock();
        if !state.timers.finish(ticket) {
            tracing::trace!(
                output_id = %ticket.key.output_id,
                overlay_id = %ticket.key.overlay_id,
                "Stale overlay timer ignored"
            );
            return;
        }

        let output_id = ticket.key.output_id.clone();
        let overlay_id = ticket.key.overlay_id.clone();
        let still_listed = state
            .registry
            .get(&output_id)
            .is_some_and(|output| output.out.overlays.contains(&overlay_id));
        if !still_listed {
            return;
        }

        tracing::debug!(output_id = %output_id, overlay_id = %overlay_id, "Overlay expired");
        self.apply_update(
            &mut state,
            OutputUpdate::Overlays(OverlayChange::toggle(overlay_id)),
            Some(output_id),
        );
    }

    // ========================================================================
    // Transition
    // ========================================================================

    fn apply_transition(&self, state: &mut ConductorState, targets: &[OutputId], transition: Option<Transition>) {
        for id in targets {
            if let Some(output) = state.registry.get_mut(id) {
                output.out.transition = transition.clone();
            }
        }
    }
}

/// Whether replacing `previous` with `next` ends a running presentation
fn stops_presentation(previous: Option<&OutSlide>, next: Option<&OutSlide>) -> bool {
    let Some(previous) = previous.filter(|s| s.kind == SlideKind::Presentation) else {
        return false;
    };
    next.map_or(true, |next| {
        next.kind != SlideKind::Presentation || next.id != previous.id
    })
}

/// `existing` followed by the ids it does not contain yet, without duplicates
fn union(existing: &[OverlayId], incoming: &[OverlayId]) -> Vec<OverlayId> {
    let mut list: Vec<OverlayId> = Vec::with_capacity(existing.len() + incoming.len());
    for id in existing.iter().chain(incoming) {
        if !list.contains(id) {
            list.push(id.clone());
        }
    }
    list
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::conductor::tests::{conductor_with, drain, names};
    use crate::ids::{ActionId, CategoryId, LayoutId, ShowId, SlideId, StyleId};
    use crate::model::{Output, Overlay};
    use crate::show::{Category, Layout, LayoutSlide, Show, ShowReference, Slide};
    use crate::store::ShowLibrary;
    use crate::style::{Layer, Style};

    fn ids(list: &[&str]) -> Vec<OverlayId> {
        list.iter().map(|id| OverlayId::new(*id)).collect()
    }

    fn library() -> ShowLibrary {
        let mut library = ShowLibrary::default();

        let mut show = Show::named("Amazing Grace");
        show.category = Some(CategoryId::new("song"));
        show.meta.insert("title".into(), "Amazing Grace".into());
        show.meta.insert("CCLI".into(), String::new());
        show.slides.insert(SlideId::new("v1"), Slide::default());
        show.slides.insert(SlideId::new("v2"), Slide::default());
        show.layouts.insert(
            LayoutId::new("main"),
            Layout {
                name: "Default".into(),
                slides: vec![
                    LayoutSlide {
                        id: SlideId::new("v1"),
                        ..LayoutSlide::default()
                    },
                    LayoutSlide {
                        id: SlideId::new("v2"),
                        bindings: vec![OutputId::new("b")],
                        ..LayoutSlide::default()
                    },
                ],
            },
        );
        library.shows.insert(ShowId::new("song"), show);

        let mut verse = Show::named("John 3:16");
        verse.reference = Some(ShowReference {
            kind: "scripture".into(),
            attribution_string: Some("Public domain".into()),
            version: Some("KJV".into()),
            ..ShowReference::default()
        });
        library.shows.insert(ShowId::new("verse"), verse);

        library.categories.insert(
            CategoryId::new("song"),
            Category {
                name: "Songs".into(),
                action: Some(ActionId::new("lights")),
            },
        );
        library.overlays.insert(
            OverlayId::new("clock"),
            Overlay {
                name: "Clock".into(),
                display_duration: Some(5.0),
                ..Overlay::default()
            },
        );
        library.overlays.insert(OverlayId::new("logo"), Overlay::default());
        library.styles.insert(
            StyleId::new("text-only"),
            Style {
                layers: Some(vec![Layer::Slide, Layer::Overlays]),
                ..Style::default()
            },
        );
        library
    }

    fn two_outputs() -> Vec<(OutputId, Output)> {
        vec![
            (OutputId::new("a"), Output::named("A")),
            (OutputId::new("b"), Output::named("B")),
        ]
    }

    fn overlays_of(conductor: &crate::OutputConductor, id: &str) -> Vec<OverlayId> {
        conductor.output(&OutputId::new(id)).unwrap().out.overlays
    }

    // ========================================================================
    // Targets
    // ========================================================================

    #[test]
    fn test_unknown_explicit_output_is_noop() {
        let (conductor, mut rx) = conductor_with(library(), two_outputs());
        let updated = conductor.set_output(
            OutputUpdate::Transition(Some(Transition::disabled())),
            Some(OutputId::new("missing")),
        );
        assert!(updated.is_empty());
        assert!(drain(&mut rx).is_empty());
        assert_eq!(conductor.summary().total_outputs, 2);
    }

    #[test]
    fn test_slide_bindings_pick_targets() {
        let (conductor, _rx) = conductor_with(library(), two_outputs());
        let updated = conductor.set_output(
            OutputUpdate::Slide(Some(OutSlide::new("song", "main", 1))),
            None,
        );
        assert_eq!(updated, vec![OutputId::new("b")]);
        assert!(conductor.output(&OutputId::new("a")).unwrap().out.slide.is_none());
    }

    #[test]
    fn test_unbound_slide_goes_to_active_outputs() {
        let (conductor, _rx) = conductor_with(library(), two_outputs());
        let updated = conductor.set_output(
            OutputUpdate::Slide(Some(OutSlide::new("song", "main", 0))),
            None,
        );
        assert_eq!(updated, vec![OutputId::new("a"), OutputId::new("b")]);
    }

    // ========================================================================
    // Slide
    // ========================================================================

    #[test]
    fn test_new_show_triggers_category_action_and_usage() {
        let (conductor, mut rx) = conductor_with(library(), two_outputs());
        conductor.set_output(
            OutputUpdate::Slide(Some(OutSlide::new("song", "main", 0))),
            None,
        );

        let events = drain(&mut rx);
        assert_eq!(
            names(&events),
            vec![
                "run_action",
                "usage_logged",
                "state",
                "state",
                "stage_mirror",
                "preview",
                "stage_mirror",
                "preview",
            ]
        );
        assert_eq!(
            events[0],
            OutputEvent::RunAction {
                action_id: ActionId::new("lights")
            }
        );

        let usage = conductor.usage_log();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].name, "Amazing Grace");
        assert_eq!(
            usage[0].metadata,
            vec![("title".to_string(), "Amazing Grace".to_string())]
        );

        // same show again: no new usage entry
        conductor.set_output(
            OutputUpdate::Slide(Some(OutSlide::new("song", "main", 0))),
            None,
        );
        assert_eq!(conductor.usage_log().len(), 1);
    }

    #[test]
    fn test_stop_presentation_precedes_new_slide() {
        let (conductor, mut rx) = conductor_with(library(), vec![two_outputs().remove(0)]);
        let a = OutputId::new("a");
        conductor.set_output(
            OutputUpdate::Slide(Some(
                OutSlide::new("deck", "", 3).with_kind(SlideKind::Presentation),
            )),
            Some(a.clone()),
        );
        drain(&mut rx);

        conductor.set_output(
            OutputUpdate::Slide(Some(OutSlide::new("song", "main", 0))),
            Some(a.clone()),
        );
        let events = drain(&mut rx);
        let stop = events
            .iter()
            .position(|e| *e == OutputEvent::StopPresentation)
            .unwrap();
        let state = events.iter().position(|e| e.name() == "state").unwrap();
        assert!(stop < state);
        assert_eq!(
            conductor.output(&a).unwrap().out.slide.unwrap().id,
            ShowId::new("song")
        );
    }

    #[test]
    fn test_clearing_presentation_stops_it() {
        let (conductor, mut rx) = conductor_with(library(), vec![two_outputs().remove(0)]);
        conductor.set_output(
            OutputUpdate::Slide(Some(
                OutSlide::new("deck", "", 0).with_kind(SlideKind::Presentation),
            )),
            None,
        );
        // next page of the same presentation keeps it running
        conductor.set_output(
            OutputUpdate::Slide(Some(
                OutSlide::new("deck", "", 1).with_kind(SlideKind::Presentation),
            )),
            None,
        );
        assert!(!drain(&mut rx).contains(&OutputEvent::StopPresentation));

        conductor.set_output(OutputUpdate::Slide(None), None);
        assert_eq!(names(&drain(&mut rx))[0], "stop_presentation");
    }

    #[test]
    fn test_scripture_attribution_copied() {
        let (conductor, _rx) = conductor_with(library(), two_outputs());
        conductor.set_output(
            OutputUpdate::Slide(Some(OutSlide::new("verse", "main", 0))),
            Some(OutputId::new("a")),
        );
        let slide = conductor.output(&OutputId::new("a")).unwrap().out.slide.unwrap();
        assert_eq!(slide.attribution.as_deref(), Some("Public domain"));
        assert_eq!(slide.translations, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slide_cache_invalidated_while_slide_shown() {
        let (conductor, _rx) = conductor_with(library(), two_outputs());
        let a = OutputId::new("a");
        let b = OutputId::new("b");
        let cached = |id: &OutputId| conductor.shared.state.lock().slide_cache.contains_key(id);

        conductor.set_output(
            OutputUpdate::Slide(Some(OutSlide::new("song", "main", 0))),
            Some(b.clone()),
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        conductor.displayed_items(&b);
        assert!(cached(&b));

        conductor.set_output(
            OutputUpdate::Slide(Some(OutSlide::new("song", "main", 0))),
            Some(a.clone()),
        );
        conductor.displayed_items(&a);
        assert!(cached(&a));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!cached(&a));
        // other outputs keep their cache
        assert!(cached(&b));

        conductor.set_output(
            OutputUpdate::Slide(Some(OutSlide::new("song", "main", 1))),
            Some(a.clone()),
        );
        conductor.displayed_items(&a);
        conductor.set_output(OutputUpdate::Slide(None), Some(a.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        // the slide moved on before the delay ran out
        assert!(cached(&a));
    }

    #[test]
    fn test_stored_value_is_a_copy() {
        let (conductor, _rx) = conductor_with(library(), two_outputs());
        let mut background = Background::media("/media/sunrise.jpg");
        conductor.set_output(OutputUpdate::Background(Some(background.clone())), None);
        background.path = Some("/media/other.jpg".into());

        let stored = conductor.output(&OutputId::new("a")).unwrap().out.background.unwrap();
        assert_eq!(stored.path.as_deref(), Some("/media/sunrise.jpg"));
    }

    // ========================================================================
    // Background
    // ========================================================================

    #[test]
    fn test_only_primary_output_keeps_audio() {
        let outputs = vec![
            (
                OutputId::new("a"),
                Output {
                    style: Some(StyleId::new("text-only")),
                    ..Output::named("A")
                },
            ),
            (OutputId::new("b"), Output::named("B")),
        ];
        let (conductor, _rx) = conductor_with(library(), outputs);
        conductor.set_output(
            OutputUpdate::Background(Some(Background::media("/media/loop.mp4"))),
            None,
        );

        let muted = |id: &str| {
            conductor
                .output(&OutputId::new(id))
                .unwrap()
                .out
                .background
                .unwrap()
                .muted
        };
        assert!(muted("a"));
        assert!(!muted("b"));
    }

    #[test]
    fn test_video_background_signals() {
        let (conductor, mut rx) = conductor_with(library(), two_outputs());
        conductor.set_output(
            OutputUpdate::Background(Some(Background::media("/media/loop.mp4"))),
            None,
        );
        let events = drain(&mut rx);
        assert!(events.contains(&OutputEvent::FadeAudio {
            direction: FadeDirection::Out
        }));
        assert_eq!(
            events
                .iter()
                .filter(|e| **e
                    == OutputEvent::Activate {
                        trigger: CustomTrigger::VideoStart
                    })
                .count(),
            1
        );
        assert!(events.contains(&OutputEvent::VideoData {
            output_id: OutputId::new("b"),
            muted: true,
            looping: false,
        }));

        conductor.set_output(
            OutputUpdate::Background(Some(Background::media("/media/still.jpg"))),
            None,
        );
        let events = drain(&mut rx);
        assert!(events.contains(&OutputEvent::Activate {
            trigger: CustomTrigger::VideoEnd
        }));
        assert!(events.contains(&OutputEvent::FadeAudio {
            direction: FadeDirection::In
        }));
    }

    #[test]
    fn test_clearing_video_background_fades_in() {
        let (conductor, mut rx) = conductor_with(library(), vec![two_outputs().remove(0)]);
        conductor.set_output(
            OutputUpdate::Background(Some(Background::media("/media/loop.mp4"))),
            None,
        );
        drain(&mut rx);

        conductor.set_output(OutputUpdate::Background(None), None);
        assert_eq!(
            names(&drain(&mut rx))[..3].to_vec(),
            vec!["fade_audio", "activate", "state"]
        );
    }

    #[test]
    fn test_clearing_video_on_secondary_output_ends_it() {
        let outputs = vec![
            (
                OutputId::new("a"),
                Output {
                    style: Some(StyleId::new("text-only")),
                    ..Output::named("A")
                },
            ),
            (OutputId::new("b"), Output::named("B")),
        ];
        let (conductor, mut rx) = conductor_with(library(), outputs);
        conductor.set_output(
            OutputUpdate::Background(Some(Background::media("/m/loop.mp4"))),
            Some(OutputId::new("a")),
        );
        drain(&mut rx);

        conductor.set_output(OutputUpdate::Background(None), Some(OutputId::new("a")));
        let events = drain(&mut rx);
        assert!(events.contains(&OutputEvent::Activate {
            trigger: CustomTrigger::VideoEnd
        }));
        // audio is only faded back in by the primary output
        assert!(!events.contains(&OutputEvent::FadeAudio {
            direction: FadeDirection::In
        }));
    }

    #[test]
    fn test_background_clears_paged_slide() {
        let (conductor, mut rx) = conductor_with(library(), vec![two_outputs().remove(0)]);
        conductor.set_output(
            OutputUpdate::Slide(Some(OutSlide::new("doc", "", 2).with_kind(SlideKind::Pdf))),
            None,
        );
        drain(&mut rx);

        conductor.set_output(
            OutputUpdate::Background(Some(Background::media("/media/still.jpg"))),
            None,
        );
        let output = conductor.output(&OutputId::new("a")).unwrap();
        assert!(output.out.slide.is_none());
        assert!(output.out.background.is_some());
        assert!(!drain(&mut rx).contains(&OutputEvent::StopPresentation));
    }

    // ========================================================================
    // Overlays
    // ========================================================================

    #[test]
    fn test_toggle_twice_restores_list() {
        let (conductor, _rx) = conductor_with(library(), two_outputs());
        conductor.set_output(
            OutputUpdate::Overlays(OverlayChange::replace(ids(&["logo"]))),
            None,
        );
        let original = overlays_of(&conductor, "a");

        conductor.set_output(OutputUpdate::Overlays(OverlayChange::toggle("lyrics")), None);
        assert_eq!(overlays_of(&conductor, "a"), ids(&["logo", "lyrics"]));
        conductor.set_output(OutputUpdate::Overlays(OverlayChange::toggle("lyrics")), None);

        assert_eq!(overlays_of(&conductor, "a"), original);
        assert_eq!(overlays_of(&conductor, "b"), original);
    }

    #[test]
    fn test_toggle_decided_by_first_target() {
        let (conductor, _rx) = conductor_with(library(), two_outputs());
        conductor.set_output(
            OutputUpdate::Overlays(OverlayChange::add(ids(&["logo"]))),
            Some(OutputId::new("a")),
        );

        conductor.set_output(OutputUpdate::Overlays(OverlayChange::toggle("logo")), None);
        assert!(overlays_of(&conductor, "a").is_empty());
        assert!(overlays_of(&conductor, "b").is_empty());
    }

    #[test]
    fn test_add_unions_without_duplicates() {
        let (conductor, _rx) = conductor_with(library(), two_outputs());
        conductor.set_output(
            OutputUpdate::Overlays(OverlayChange::replace(ids(&["a", "b", "a"]))),
            None,
        );
        assert_eq!(overlays_of(&conductor, "a"), ids(&["a", "b"]));

        conductor.set_output(
            OutputUpdate::Overlays(OverlayChange::add(ids(&["c", "b"]))),
            None,
        );
        assert_eq!(overlays_of(&conductor, "a"), ids(&["a", "b", "c"]));
        assert_eq!(conductor.locked_overlays(), ids(&["a", "b", "c"]));
    }

    #[test]
    fn test_empty_add_is_noop() {
        let (conductor, _rx) = conductor_with(library(), two_outputs());
        conductor.set_output(
            OutputUpdate::Overlays(OverlayChange::replace(ids(&["logo"]))),
            None,
        );
        conductor.set_output(OutputUpdate::Overlays(OverlayChange::add(Vec::new())), None);
        assert_eq!(overlays_of(&conductor, "a"), ids(&["logo"]));

        conductor.set_output(
            OutputUpdate::Overlays(OverlayChange::replace(Vec::new())),
            None,
        );
        assert!(overlays_of(&conductor, "a").is_empty());
        assert!(conductor.locked_overlays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_overlay_expires() {
        let (conductor, mut rx) = conductor_with(library(), two_outputs());
        let a = OutputId::new("a");
        let clock = OverlayId::new("clock");

        conductor.set_output(
            OutputUpdate::Overlays(OverlayChange::add(vec![clock.clone()])),
            Some(a.clone()),
        );
        assert!(conductor.has_overlay_timer(&a, &clock));

        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert_eq!(overlays_of(&conductor, "a"), vec![clock.clone()]);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(overlays_of(&conductor, "a").is_empty());
        assert!(!conductor.has_overlay_timer(&a, &clock));
        assert!(conductor.overlay_timers().is_empty());

        let states = drain(&mut rx)
            .into_iter()
            .filter(|e| e.name() == "state")
            .count();
        assert_eq!(states, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_readding_overlay_restarts_timer() {
        let (conductor, _rx) = conductor_with(library(), vec![two_outputs().remove(0)]);
        let clock = OverlayId::new("clock");

        conductor.set_output(
            OutputUpdate::Overlays(OverlayChange::add(vec![clock.clone()])),
            None,
        );
        tokio::time::sleep(Duration::from_secs(3)).await;
        conductor.set_output(
            OutputUpdate::Overlays(OverlayChange::add(vec![clock.clone()])),
            None,
        );

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(overlays_of(&conductor, "a"), vec![clock.clone()]);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(overlays_of(&conductor, "a").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_cancels_dropped_timers() {
        let (conductor, _rx) = conductor_with(library(), vec![two_outputs().remove(0)]);
        let a = OutputId::new("a");
        conductor.set_output(
            OutputUpdate::Overlays(OverlayChange::replace(ids(&["clock", "logo"]))),
            None,
        );
        assert_eq!(conductor.overlay_timers().len(), 1);

        conductor.set_output(
            OutputUpdate::Overlays(OverlayChange::replace(ids(&["logo"]))),
            None,
        );
        assert!(!conductor.has_overlay_timer(&a, &OverlayId::new("clock")));

        // a manual removal before expiry leaves nothing behind
        conductor.set_output(
            OutputUpdate::Overlays(OverlayChange::add(ids(&["clock"]))),
            None,
        );
        conductor.set_output(OutputUpdate::Overlays(OverlayChange::toggle("clock")), None);
        assert!(conductor.overlay_timers().is_empty());
    }

    #[test]
    fn test_stops_presentation_rules() {
        let deck = OutSlide::new("deck", "", 0).with_kind(SlideKind::Presentation);
        let other_deck = OutSlide::new("other", "", 0).with_kind(SlideKind::Presentation);
        let song = OutSlide::new("song", "main", 0);

        assert!(stops_presentation(Some(&deck), None));
        assert!(stops_presentation(Some(&deck), Some(&song)));
        assert!(stops_presentation(Some(&deck), Some(&other_deck)));
        assert!(!stops_presentation(Some(&deck), Some(&deck)));
        assert!(!stops_presentation(Some(&song), None));
        assert!(!stops_presentation(None, None));
    }
}
