//! Layer Queries
//!
//! Read-side helpers over the displayed layers: which transition applies,
//! which text lines a style shows, whether the outputs are cleared, and
//! which output shows a piece of content.

use serde::{Deserialize, Serialize};

use crate::conductor::OutputConductor;
use crate::events::OutputEvent;
use crate::ids::OutputId;
use crate::items::Item;
use crate::model::{OutLayers, OutSlide, Output, Transition};
use crate::resolver::{resolve, ResolveOptions};
use crate::show::{LayoutSlide, Show};
use crate::style::StyleTransitions;

/// A layer of [`OutLayers`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKey {
    /// Slide layer
    Slide,
    /// Background layer
    Background,
    /// Overlay list
    Overlays,
    /// Transition layer
    Transition,
}

impl LayerKey {
    /// Every layer
    pub const ALL: [LayerKey; 4] = [
        LayerKey::Background,
        LayerKey::Slide,
        LayerKey::Overlays,
        LayerKey::Transition,
    ];
}

/// Transitions used for the next change on an output
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputTransitions {
    /// Slide text
    pub text: Transition,
    /// Background media
    pub media: Transition,
    /// Overlays
    pub overlay: Transition,
}

/// Pick the transitions for an output
///
/// The slide's own transitions win over the style's, which win over the
/// global ones. Overlays follow the text transition but ignore the slide.
#[must_use]
pub fn output_transitions(
    slide_data: Option<&LayoutSlide>,
    style_transition: Option<&StyleTransitions>,
    global: &StyleTransitions,
    disabled: bool,
) -> OutputTransitions {
    if disabled {
        return OutputTransitions {
            text: Transition::disabled(),
            media: Transition::disabled(),
            overlay: Transition::disabled(),
        };
    }

    let set = |t: Option<&Transition>| t.filter(|t| t.is_set()).cloned();
    let slide_text = slide_data.and_then(|s| set(s.transition.as_ref()));
    let slide_media = slide_data.and_then(|s| set(s.media_transition.as_ref()));
    let style_text = style_transition.and_then(|s| set(s.text.as_ref()));
    let style_media = style_transition.and_then(|s| set(s.media.as_ref()));
    let global_text = set(global.text.as_ref());
    let global_media = set(global.media.as_ref());

    OutputTransitions {
        text: slide_text
            .or_else(|| style_text.clone())
            .or_else(|| global_text.clone())
            .unwrap_or_default(),
        media: slide_media
            .or(style_media)
            .or(global_media)
            .unwrap_or_default(),
        overlay: style_text.or(global_text).unwrap_or_default(),
    }
}

/// Window of text lines an output shows, as `(start, end)`
///
/// `style_lines` is the output style's line limit and `fewest_lines` the
/// smallest limit among the displays. Once fewer than `fewest_lines` lines
/// are left after the active line, every output jumps to its last page so
/// the end of the slide is always shown.
///
/// `None` means the whole slide is shown: ad-hoc content, unknown slides,
/// slides without text lines and styles without a limit.
#[must_use]
pub fn output_lines(
    show: Option<&Show>,
    out_slide: &OutSlide,
    style_lines: usize,
    fewest_lines: usize,
) -> Option<(usize, usize)> {
    if out_slide.id.is_temp() || style_lines == 0 {
        return None;
    }

    let slide = show?.slide_at(&out_slide.layout, out_slide.index)?;
    let max_lines = slide.items.iter().map(Item::line_count).max().unwrap_or(0);
    if max_lines == 0 {
        return None;
    }

    let line = out_slide.line.unwrap_or(0);
    let index = if line + fewest_lines > max_lines {
        max_lines - 1
    } else {
        line.min(max_lines - 1)
    };
    let start = style_lines * (index / style_lines);
    Some((start, start + style_lines))
}

impl OutputConductor {
    /// Color of the first enabled display showing `content_id`
    ///
    /// Matches a displayed show id, background path or source id, or
    /// overlay id. Key and stage outputs are not considered.
    #[must_use]
    pub fn find_matching_out(&self, content_id: &str) -> Option<String> {
        let state = self.shared.state.lock();
        resolve(&state.registry, ResolveOptions::displays_only(false))
            .into_iter()
            .filter_map(|id| state.registry.get(&id))
            .filter(|output| output.enabled)
            .find(|output| {
                let out = &output.out;
                out.slide.as_ref().is_some_and(|s| s.id.as_str() == content_id)
                    || out
                        .background
                        .as_ref()
                        .and_then(|b| b.content_id())
                        .is_some_and(|id| id == content_id)
                    || out.overlays.iter().any(|o| o.as_str() == content_id)
            })
            .map(|output| output.color.clone())
    }

    /// Whether the active displays show nothing on `layer` (any layer when
    /// `None`)
    ///
    /// Locked overlays do not count unless `check_locked` is set. The
    /// transition layer is only cleared once no overlay timer is pending on
    /// those outputs.
    #[must_use]
    pub fn is_out_cleared(&self, layer: Option<LayerKey>, check_locked: bool) -> bool {
        let state = self.shared.state.lock();
        let ids = resolve(&state.registry, ResolveOptions::displays_only(true));
        let layers: &[LayerKey] = match &layer {
            Some(layer) => std::slice::from_ref(layer),
            None => &LayerKey::ALL,
        };

        let shows_something = ids
            .iter()
            .filter_map(|id| state.registry.get(id))
            .any(|output| {
                let out = &output.out;
                layers.iter().any(|layer| match layer {
                    LayerKey::Slide => out.slide.is_some(),
                    LayerKey::Background => out.background.is_some(),
                    LayerKey::Transition => out.transition.is_some(),
                    LayerKey::Overlays if check_locked => !out.overlays.is_empty(),
                    LayerKey::Overlays => out.overlays.iter().any(|id| {
                        !self
                            .shared
                            .store
                            .overlay(id)
                            .is_some_and(|overlay| overlay.locked)
                    }),
                })
            });
        if shows_something {
            return false;
        }

        if layer == Some(LayerKey::Transition) {
            return !ids.iter().any(|id| state.timers.has_timers_for(id));
        }
        true
    }

    /// Layers of an output, the first enabled display when `None`
    #[must_use]
    pub fn output_content(&self, output_id: Option<&OutputId>) -> OutLayers {
        let state = self.shared.state.lock();
        let id = output_id.cloned().or_else(|| {
            resolve(&state.registry, ResolveOptions::displays_only(false))
                .into_iter()
                .next()
        });
        id.and_then(|id| state.registry.get(&id))
            .map(|output| output.out.clone())
            .unwrap_or_default()
    }

    /// Text line window of an output's current slide, see [`output_lines`]
    #[must_use]
    pub fn output_lines(&self, output_id: &OutputId) -> Option<(usize, usize)> {
        let state = self.shared.state.lock();
        let output = state.registry.get(output_id)?;
        let slide = output.out.slide.as_ref()?;
        let lines_of = |output: &Output| {
            self.shared
                .style_of(output)
                .and_then(|style| style.lines)
                .unwrap_or(0)
        };

        let fewest_lines = resolve(&state.registry, ResolveOptions::displays_only(false))
            .iter()
            .filter_map(|id| state.registry.get(id))
            .map(lines_of)
            .filter(|lines| *lines > 0)
            .min()
            .unwrap_or(0);
        let show = self.shared.store.show(&slide.id);

        output_lines(show.as_ref(), slide, lines_of(output), fewest_lines)
    }

    /// Ask renderers of the active outputs to redraw
    ///
    /// Sets the one-shot refresh flag and resets it after the configured
    /// delay.
    pub fn refresh_out(&self) {
        let mut state = self.shared.state.lock();
        let ids = self
            .shared
            .resolve_targets(&mut state, ResolveOptions::default());
        set_refresh(&self.shared, &mut state, &ids, true);

        let delay = self.shared.config.refresh_reset_delay;
        self.shared.after_delay(&mut state, delay, move |shared, state| {
            set_refresh(shared, state, &ids, false);
        });
    }
}

fn set_refresh(
    shared: &crate::conductor::Shared,
    state: &mut crate::conductor::ConductorState,
    ids: &[OutputId],
    refresh: bool,
) {
    for id in ids {
        let Some(output) = state.registry.get_mut(id) else {
            continue;
        };
        output.out.refresh = refresh;
        shared.emit(OutputEvent::State {
            output_id: id.clone(),
            layers: output.out.clone(),
        });
    }
}
