//! Template Composition Engine
//!
//! Merges a slide's own items with the items of a template, producing the
//! item list a renderer actually draws.
//!
//! # Design Philosophy
//!
//! Composition is a pure function of its inputs. Template items are
//! bucketed by type and handed out in template order; every slide item
//! claims the next unused template item of its own type and adopts its
//! styling. Nothing here iterates an unordered collection in a way that
//! could affect the result, so identical inputs always produce an identical
//! item list.
//!
//! ```text
//!   result = [ leftover non-text template items ]   (drawn behind)
//!          + [ merged slide items              ]
//!          + [ overflow template text slots    ]   (overflow mode only)
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::ids::{short_uid, LayoutId, OverlayId};
use crate::items::{text_color, Item, Line, TextRun, DEFAULT_ITEM_KIND};
use crate::show::{Layout, Media, Slide, SlideRef, SlideRefKind, Template, TemplateSettings};

/// Bullet characters a template can impose on slide text
const BULLETS: [char; 2] = ['•', '-'];

/// Options of [`merge_with_template`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeOptions {
    /// Keep unused template text items as placeholder slots
    pub allow_overflow: bool,
    /// Drop cached automatic font sizes of merged items
    pub reset_auto_size: bool,
    /// The user picked this template explicitly
    pub explicit: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            allow_overflow: false,
            reset_auto_size: true,
            explicit: false,
        }
    }
}

impl MergeOptions {
    /// Options used when composing live output content
    #[must_use]
    pub fn output() -> Self {
        Self {
            allow_overflow: true,
            ..Self::default()
        }
    }

    /// Options used when the user applies a template by hand
    #[must_use]
    pub fn explicit() -> Self {
        Self {
            explicit: true,
            ..Self::default()
        }
    }
}

// ============================================================================
// Item helpers
// ============================================================================

/// Group items by type, preserving order within each type
#[must_use]
pub fn sort_items_by_type(items: &[Item]) -> BTreeMap<String, Vec<Item>> {
    let mut sorted: BTreeMap<String, Vec<Item>> = BTreeMap::new();
    for item in items {
        sorted
            .entry(item.kind().to_string())
            .or_default()
            .push(item.clone());
    }
    sorted
}

/// Number of items per type
#[must_use]
pub fn items_count_by_type(items: &[Item]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item.kind().to_string()).or_insert(0) += 1;
    }
    counts
}

/// All text of an item, runs concatenated
#[must_use]
pub fn item_text(item: &Item) -> String {
    item.lines
        .iter()
        .flatten()
        .flat_map(|line| line.text.iter())
        .map(|run| run.value.as_str())
        .collect()
}

/// Keep a template value only when it holds a `{placeholder}`
#[must_use]
pub fn template_text(value: &str) -> &str {
    if value.contains('{') {
        value
    } else {
        ""
    }
}

/// Whether an item has no text
#[must_use]
pub fn is_empty(item: &Item) -> bool {
    item_text(item).is_empty()
}

/// Whether an item has no text or only placeholder text
#[must_use]
pub fn is_empty_or_special(item: &Item) -> bool {
    let text = item_text(item);
    text.is_empty() || !template_text(&text).is_empty()
}

/// Reduce template text items to placeholder-only slots
///
/// Each line keeps its alignment and a single run with the first run's style
/// and placeholder value (empty when the value has no placeholder).
fn remove_text_value(item: &mut Item) {
    let Some(lines) = &mut item.lines else {
        return;
    };

    for line in lines.iter_mut() {
        let first = line.text.first();
        let run = TextRun::new(
            first.map(|r| r.style.clone()).unwrap_or_default(),
            template_text(first.map_or("", |r| r.value.as_str())),
        );
        *line = Line {
            align: line.align.clone(),
            text: vec![run],
        };
    }
}

// ============================================================================
// Merge
// ============================================================================

/// Merge slide items with template items
///
/// See the module documentation for the resulting order. With no template
/// items the (filtered) slide items are returned unchanged.
#[must_use]
pub fn merge_with_template(
    slide_items: &[Item],
    template_items: &[Item],
    options: MergeOptions,
) -> Vec<Item> {
    // re-applying an explicit template replaces its previous items
    let mut slide_items: Vec<Item> = slide_items
        .iter()
        .filter(|item| !options.explicit || !item.from_template)
        .cloned()
        .collect();

    if template_items.is_empty() {
        return slide_items;
    }

    // template indices per type, in template order
    let mut buckets: BTreeMap<&str, VecDeque<usize>> = BTreeMap::new();
    for (index, item) in template_items.iter().enumerate() {
        buckets.entry(item.kind()).or_default().push_back(index);
    }

    if !options.explicit {
        let slide_text_count = slide_items.iter().filter(|item| item.is_text()).count();
        if let Some(text_slots) = buckets.get_mut(DEFAULT_ITEM_KIND) {
            text_slots.truncate(slide_text_count);
        }
    }

    if options.allow_overflow && template_items.len() > slide_items.len() {
        slide_items.retain(|item| !item.is_text() || !is_empty(item));
    }

    let mut merged = Vec::with_capacity(slide_items.len());
    let mut used = vec![false; template_items.len()];

    for mut item in slide_items {
        let next = buckets.get_mut(item.kind()).and_then(VecDeque::pop_front);
        let Some(index) = next else {
            merged.push(item);
            continue;
        };
        used[index] = true;

        apply_template_item(&mut item, &template_items[index], options);
        merged.push(item);
    }

    let overflow: Vec<Item> = if options.allow_overflow {
        buckets
            .get(DEFAULT_ITEM_KIND)
            .into_iter()
            .flatten()
            .map(|&index| {
                let mut slot = template_items[index].clone();
                remove_text_value(&mut slot);
                slot.from_template = true;
                slot
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut result: Vec<Item> = template_items
        .iter()
        .enumerate()
        .filter(|(index, item)| !used[*index] && !item.is_text())
        .filter(|(_, item)| !merged.contains(item))
        .map(|(_, item)| Item {
            from_template: true,
            ..item.clone()
        })
        .collect();

    result.extend(merged);
    result.extend(overflow);
    result
}

/// Apply one template item's styling to a slide item
fn apply_template_item(item: &mut Item, template: &Item, options: MergeOptions) {
    item.style = template.style.clone();
    item.align = template.align.clone();
    if options.reset_auto_size {
        item.auto_font_size = None;
    }
    item.auto = template.auto;
    item.facets = template.facets.clone();

    if !item.is_text() {
        return;
    }
    let Some(lines) = &mut item.lines else {
        return;
    };

    let mut colors: Vec<String> = Vec::new();
    for run in lines.iter().flat_map(|line| line.text.iter()) {
        if run.custom_type.is_some() {
            continue;
        }
        let color = text_color(&run.style);
        if !colors.contains(&color) {
            colors.push(color);
        }
    }
    let keep_colors = !options.explicit && colors.len() > 1;

    let template_lines = template.lines.as_deref().unwrap_or_default();

    for (j, line) in lines.iter_mut().enumerate() {
        let template_line = template_lines.get(j).or_else(|| template_lines.first());
        line.align = template_line.map(|l| l.align.clone()).unwrap_or_default();

        for (k, run) in line.text.iter_mut().enumerate() {
            let template_run =
                template_line.and_then(|l| l.text.get(k).or_else(|| l.text.first()));

            if !run.disables_template() {
                let mut style = template_run.map(|r| r.style.clone()).unwrap_or_default();
                if keep_colors {
                    style.push_str(&format!("color: {};", text_color(&run.style)));
                }
                run.style = style;
            }

            let template_value = template_run.map_or("", |r| r.value.as_str());
            let first_char = template_value.chars().next();

            if run.value.is_empty() && first_char == Some('{') && template_lines.get(j).is_some() {
                run.value = template_value.to_string();
            }

            let Some(slide_first) = run.value.chars().next() else {
                continue;
            };

            match first_char {
                Some(bullet) if BULLETS.contains(&bullet) => {
                    if slide_first != bullet {
                        run.value = format!("{bullet} {}", run.value.trim());
                    }
                }
                _ if options.allow_overflow && BULLETS.contains(&slide_first) => {
                    run.value = run.value[slide_first.len_utf8()..].trim().to_string();
                }
                _ => {}
            }
        }
    }
}

// ============================================================================
// Template materialization
// ============================================================================

/// Items a template adds on top of the merged slide items
pub fn template_extra_items(
    settings: &TemplateSettings,
    overlay_items: impl Fn(&OverlayId) -> Option<Vec<Item>>,
) -> Vec<Item> {
    settings
        .overlay_id
        .as_ref()
        .and_then(overlay_items)
        .unwrap_or_default()
}

/// Apply template settings to a slide
///
/// Sets the first-slide template and background color, and when
/// `remove_overflow` is set appends the template overlay's items.
pub fn update_slide_from_template(
    slide: &mut Slide,
    template: &Template,
    is_first: bool,
    remove_overflow: bool,
    overlay_items: impl Fn(&OverlayId) -> Option<Vec<Item>>,
) {
    let settings = &template.settings;

    if is_first && (settings.first_slide_template.is_some() || remove_overflow) {
        slide.settings.template = settings.first_slide_template.clone();
    }
    if settings.background_color.is_some() || slide.settings.color.is_some() {
        slide.settings.color = settings.background_color.clone();
    }

    if remove_overflow {
        slide
            .items
            .extend(template_extra_items(settings, overlay_items));
    }
}

/// Scope a template was applied with
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateMode {
    /// Show-wide template
    #[default]
    Global,
    /// Template of a slide group
    Group,
    /// Template of a single slide
    Slide,
}

/// A template change to materialize onto a layout slide
#[derive(Clone, Copy, Debug)]
pub struct LayoutTemplateChange<'a> {
    /// Newly applied template
    pub template: &'a Template,
    /// Template that was applied before
    pub old_template: &'a Template,
    /// Layout holding the slide
    pub layout_id: &'a LayoutId,
    /// Position of the slide in the layout
    pub slide_ref: &'a SlideRef,
    /// Scope of the change
    pub mode: TemplateMode,
    /// Template overflow is being removed
    pub remove_overflow: bool,
}

/// Materialize template background media and actions onto a layout slide
///
/// Only parent slides are touched, and global template changes only when
/// overflow is being removed. Returns whether the layout was changed.
pub fn update_layouts_from_template(
    layouts: &mut HashMap<LayoutId, Layout>,
    media: &mut HashMap<String, Media>,
    change: &LayoutTemplateChange<'_>,
) -> bool {
    if change.mode == TemplateMode::Global && !change.remove_overflow {
        return false;
    }
    if change.slide_ref.kind != SlideRefKind::Parent {
        return false;
    }

    let index = change.slide_ref.index;
    let Some(slide) = layouts
        .get_mut(change.layout_id)
        .and_then(|layout| layout.slides.get_mut(index))
    else {
        return false;
    };

    let settings = &change.template.settings;
    let old_settings = &change.old_template.settings;

    if let Some(path) = &settings.background_path {
        let existing = media
            .iter()
            .filter(|(_, m)| m.path.as_deref().or(m.id.as_deref()) == Some(path.as_str()))
            .map(|(id, _)| id.clone())
            .min();

        let id = existing.unwrap_or_else(|| {
            let id = short_uid();
            media.insert(
                id.clone(),
                Media {
                    path: Some(path.clone()),
                    id: None,
                    name: file_stem(path).to_string(),
                },
            );
            id
        });
        slide.background = Some(id);
    } else if change.mode != TemplateMode::Global || index == 0 {
        let current_path = slide
            .background
            .as_ref()
            .and_then(|id| media.get(id))
            .and_then(|m| m.path.as_ref());

        // previous template's background goes away with it
        if old_settings.background_path.is_some() && old_settings.background_path.as_ref() == current_path {
            slide.background = None;
        }
    }

    if !settings.actions.is_empty() {
        slide
            .actions
            .get_or_insert_with(Default::default)
            .merge(&settings.actions);
    }

    true
}

/// File name without directory or extension
fn file_stem(path: &str) -> &str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}
