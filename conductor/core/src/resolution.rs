//! Output Resolution Helpers
//!
//! Aspect ratio and pixel size calculations for outputs. Slide content is
//! authored on a canonical 1920x1080 frame; these helpers map that frame onto
//! an output's physical window and its style's declared aspect ratio.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OutputError;
use crate::ids::OutputId;
use crate::items::parse_style;
use crate::model::{Blending, Output};
use crate::registry::OutputRegistry;
use crate::style::Style;

/// Canonical authoring frame
pub const CANONICAL: Resolution = Resolution::new(1920, 1080);

/// Aspect ratio used when nothing else is declared
pub const DEFAULT_RATIO: Resolution = Resolution::new(16, 9);

/// A width/height pair, either pixels or an aspect ratio
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Resolution {
    /// Create a resolution
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height
    #[must_use]
    pub fn ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height.max(1))
    }

    fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl Default for Resolution {
    fn default() -> Self {
        CANONICAL
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = OutputError;

    /// Parse `"WIDTHxHEIGHT"`, e.g. `"1920x1080"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OutputError::InvalidResolution(s.to_string());

        let (width, height) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;

        let resolution = Self::new(width, height);
        if !resolution.is_valid() {
            return Err(invalid());
        }
        Ok(resolution)
    }
}

fn bounds_of(output: &Output) -> Resolution {
    Resolution::new(output.bounds.width, output.bounds.height)
}

/// Aspect ratio an output renders with
///
/// Stage outputs use their window size. Otherwise the style's declared
/// ratio wins (or the window size when the style ties its ratio to the
/// output resolution), falling back to 16:9.
#[must_use]
pub fn compute_resolution(output: Option<&Output>, style: Option<&Style>) -> Resolution {
    if let Some(output) = output.filter(|o| o.is_stage()) {
        return bounds_of(output);
    }

    let Some(declared) = style.and_then(Style::declared_ratio) else {
        return DEFAULT_RATIO;
    };

    let ratio = if declared.output_resolution_as_ratio {
        output.map(bounds_of)
    } else {
        Some(Resolution::new(declared.width, declared.height))
    };

    ratio.filter(Resolution::is_valid).unwrap_or(DEFAULT_RATIO)
}

/// Pixel size of the canonical frame on an output
///
/// The canonical frame is fitted to the window's aspect ratio by changing
/// only the non-limiting dimension. With `scaled`, the result is fitted
/// again to the style's aspect ratio the same way.
#[must_use]
pub fn compute_scaled_resolution(
    output: Option<&Output>,
    style: Option<&Style>,
    scaled: bool,
) -> Resolution {
    let bounds = output
        .map(bounds_of)
        .filter(Resolution::is_valid)
        .unwrap_or(CANONICAL);

    let mut result = fit(CANONICAL, bounds.ratio(), bounds.width < bounds.height);
    if !scaled {
        return result;
    }

    let style_ratio = compute_resolution(output, style).ratio();
    result = fit(result, style_ratio, result.width < result.height);
    result
}

/// Fit `frame` to `ratio`, keeping the height for narrow frames and the
/// width otherwise
fn fit(frame: Resolution, ratio: f64, narrow: bool) -> Resolution {
    if narrow {
        Resolution::new(round(f64::from(frame.height) * ratio), frame.height)
    } else {
        Resolution::new(frame.width, round(f64::from(frame.width) / ratio))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

/// Window size of a stage output
///
/// Uses the given output, or the first stage output when `None`, and falls
/// back to the canonical frame.
#[must_use]
pub fn stage_resolution(registry: &OutputRegistry, output_id: Option<&OutputId>) -> Resolution {
    let id = output_id.cloned().or_else(|| registry.first_stage_output());
    id.and_then(|id| registry.get(&id).map(bounds_of))
        .unwrap_or(CANONICAL)
}

// ============================================================================
// Style positions
// ============================================================================

/// Box position of an inline style
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StylePosition {
    /// Left edge
    pub left: Option<f64>,
    /// Top edge
    pub top: Option<f64>,
    /// Width
    pub width: Option<f64>,
    /// Height
    pub height: Option<f64>,
}

impl StylePosition {
    /// Read pixel positions from an inline style string
    #[must_use]
    pub fn from_style(style: &str) -> Self {
        let mut position = Self::default();
        for (key, value) in parse_style(style) {
            let number = value.trim_end_matches("px").trim().parse::<f64>().ok();
            match key.as_str() {
                "left" => position.left = number,
                "top" => position.top = number,
                "width" => position.width = number,
                "height" => position.height = number,
                _ => {}
            }
        }
        position
    }
}

fn non_zero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

/// Convert canonical-frame pixel positions to percentages
#[must_use]
pub fn style_pos_to_percentage(position: StylePosition) -> StylePosition {
    let width = f64::from(CANONICAL.width);
    let height = f64::from(CANONICAL.height);

    StylePosition {
        left: non_zero(position.left).map(|v| v / width * 100.0),
        top: non_zero(position.top).map(|v| v / height * 100.0),
        width: non_zero(position.width).map(|v| v / width * 100.0),
        height: non_zero(position.height).map(|v| v / height * 100.0),
    }
}

/// Rescale a canonical-frame style to another resolution
///
/// The rescaled declarations are appended, so they override the original
/// ones.
#[must_use]
pub fn percentage_style_pos(style: &str, resolution: Resolution) -> String {
    let percentage = style_pos_to_percentage(StylePosition::from_style(style));
    let width = f64::from(if resolution.width == 0 { CANONICAL.width } else { resolution.width });
    let height = f64::from(if resolution.height == 0 { CANONICAL.height } else { resolution.height });

    let mut result = style.to_string();
    let declarations = [
        ("left", percentage.left, width),
        ("top", percentage.top, height),
        ("width", percentage.width, width),
        ("height", percentage.height, height),
    ];
    for (key, value, size) in declarations {
        if let Some(percent) = value {
            result.push_str(&format!("{key}: {}px;", size * (percent / 100.0)));
        }
    }
    result
}

/// CSS mask implementing edge blending, empty when blending is off
#[must_use]
pub fn blending_mask(blending: Option<&Blending>) -> String {
    let Some(blending) = blending else {
        return String::new();
    };
    if blending.left == 0.0 && blending.right == 0.0 {
        return String::new();
    }

    let opacity = blending.opacity.unwrap_or(50.0) / 100.0;
    let rotate = blending.rotate.unwrap_or(90.0);

    if blending.centered {
        let center = 50.0 + blending.offset;
        return format!(
            "-webkit-mask-image: linear-gradient({rotate}deg, rgb(0, 0, 0) {}%, rgba(0, 0, 0, {opacity}) {center}%, rgb(0, 0, 0) {}%);",
            center - blending.left,
            center + blending.right,
        );
    }

    format!(
        "-webkit-mask-image: linear-gradient({rotate}deg, rgba(0, 0, 0, {opacity}) 0%, rgb(0, 0, 0) {}%, rgb(0, 0, 0) {}%, rgba(0, 0, 0, {opacity}) 100%);",
        blending.left,
        100.0 - blending.right,
    )
}
