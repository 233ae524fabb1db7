//! Presentation geometry: display aspect, aspect-fit layout, drawable size.

use crate::config::{ContentMode, ProjectionMode};
use serde::{Deserialize, Serialize};

/// 2D size in points or pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Whether either side is zero, negative, or NaN.
    #[inline]
    pub fn is_empty(self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Width over height, or 0.0 for an empty size.
    #[inline]
    pub fn aspect(self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.width / self.height
        }
    }

    /// Rounded pixel extent, at least 1×1.
    pub fn to_pixels(self) -> (u32, u32) {
        (
            self.width.round().max(1.0) as u32,
            self.height.round().max(1.0) as u32,
        )
    }
}

/// A width:height ratio (sample aspect, display aspect).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: f32,
    pub height: f32,
}

impl AspectRatio {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// 1:1 sample aspect.
    pub const SQUARE: Self = Self::new(1.0, 1.0);

    /// Both terms positive and finite. Anything else (0:0 for unknown
    /// included) counts as square.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Width over height; degenerate ratios count as square.
    #[inline]
    pub fn ratio(self) -> f32 {
        if self.is_valid() {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Scale a width to the height this ratio gives it.
    #[inline]
    fn height_for(self, width: f32) -> f32 {
        if self.is_valid() {
            width * self.height / self.width
        } else {
            width
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::SQUARE
    }
}

/// On-screen placement of the video inside its container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PresentationGeometry {
    /// Top-left offset inside the container bounds.
    pub x: f32,
    pub y: f32,
    /// Laid-out video size.
    pub size: Size,
    /// Display aspect the layout was derived from.
    pub aspect: f32,
}

/// Inputs the geometry depends on. Layout is recomputed only when these change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryInputs {
    pub par: Size,
    pub sar: AspectRatio,
    pub display_aspect_override: Option<AspectRatio>,
    pub bounds: Size,
    pub content_mode: ContentMode,
}

/// Display aspect of a `par` picture with sample aspect `sar`, or the
/// override when one is configured.
pub fn display_aspect(par: Size, sar: AspectRatio, dar_override: Option<AspectRatio>) -> f32 {
    match dar_override {
        Some(dar) => dar.ratio(),
        None if par.is_empty() => 0.0,
        None => par.width * sar.ratio() / par.height,
    }
}

impl PresentationGeometry {
    /// Lay the video out inside `inputs.bounds`, centered.
    pub fn compute(inputs: &GeometryInputs) -> Self {
        let bounds = inputs.bounds;
        let aspect = display_aspect(inputs.par, inputs.sar, inputs.display_aspect_override);
        if bounds.is_empty() || aspect <= 0.0 {
            return Self {
                aspect,
                ..Self::default()
            };
        }

        let container = bounds.aspect();
        let fit_height = match inputs.content_mode {
            ContentMode::Fill => {
                return Self {
                    x: 0.0,
                    y: 0.0,
                    size: bounds,
                    aspect,
                }
            }
            ContentMode::AspectFit => container > aspect,
            ContentMode::AspectFill => container <= aspect,
        };

        let size = if fit_height {
            Size::new(bounds.height * aspect, bounds.height)
        } else {
            Size::new(bounds.width, bounds.width / aspect)
        };

        Self {
            x: (bounds.width - size.width) * 0.5,
            y: (bounds.height - size.height) * 0.5,
            size,
            aspect,
        }
    }
}

/// Size of the render target for the shader path.
///
/// Flat projection keeps the coded width and derives the height from the
/// override or the sample aspect; sphere and immersive projections render
/// into a fixed scene size.
pub fn drawable_size(
    par: Size,
    sar: AspectRatio,
    dar_override: Option<AspectRatio>,
    projection: ProjectionMode,
    scene_size: Size,
) -> Size {
    if projection != ProjectionMode::Plane {
        return scene_size;
    }
    match dar_override {
        Some(dar) => Size::new(par.width, dar.height_for(par.width)),
        None if sar.is_valid() => Size::new(par.width, par.height * sar.height / sar.width),
        None => par,
    }
}

/// Sample aspect to attach to a buffer on the hardware path so the
/// compositor shows it at the overridden display aspect.
pub fn override_sample_aspect(par: Size, dar: AspectRatio) -> AspectRatio {
    if par.is_empty() {
        return AspectRatio::SQUARE;
    }
    AspectRatio::new(dar.width, dar.height * par.width / par.height)
}
