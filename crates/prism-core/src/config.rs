//! Presenter options.
//!
//! Loading the options from disk belongs to the application; this module
//! only defines the recognized options, their defaults, and validation.

use crate::error::{PrismError, Result};
use crate::geometry::{AspectRatio, Size};
use serde::{Deserialize, Serialize};

/// How the decoded picture is projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMode {
    /// Flat quad filling the surface
    #[default]
    Plane,
    /// Equirectangular picture mapped onto a sphere
    Sphere,
    /// Head-mounted stereo presentation
    Immersive,
}

/// Stereo packing of the source picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum StereoMode {
    #[default]
    Mono = 0,
    /// Left eye in the left half
    SideBySide = 1,
    /// Left eye in the top half
    TopBottom = 2,
}

impl StereoMode {
    /// Identifier the fragment shader branches on.
    #[inline]
    pub fn shader_id(self) -> u32 {
        self as u32
    }
}

/// How the video is laid out inside its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    /// Stretch to the container
    Fill,
    /// Letterbox / pillarbox
    #[default]
    AspectFit,
    /// Cover the container, cropping overflow
    AspectFill,
}

/// What the hardware sink does when the compositor reports it is not ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositorBackpressure {
    /// Submit anyway and log; the compositor keeps the newest frame.
    #[default]
    BestEffort,
    /// Drop the frame and let the next tick try again.
    DropWhenNotReady,
}

/// Options recognized by the presenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterOptions {
    /// Use the platform compositor when the frame allows it.
    pub prefer_hardware_compositing: bool,
    /// Force a display aspect instead of deriving it from the sample aspect.
    pub display_aspect_override: Option<AspectRatio>,
    pub projection: ProjectionMode,
    pub stereo: StereoMode,
    pub content_mode: ContentMode,
    /// Render target size for sphere and immersive projections.
    pub scene_size: Size,
    /// In-flight GPU submission cap.
    pub max_in_flight: usize,
    pub compositor_backpressure: CompositorBackpressure,
}

impl Default for PresenterOptions {
    fn default() -> Self {
        Self {
            prefer_hardware_compositing: true,
            display_aspect_override: None,
            projection: ProjectionMode::Plane,
            stereo: StereoMode::Mono,
            content_mode: ContentMode::AspectFit,
            scene_size: Size::new(3840.0, 1920.0),
            max_in_flight: crate::limits::MAX_BUFFERS_IN_FLIGHT,
            compositor_backpressure: CompositorBackpressure::BestEffort,
        }
    }
}

impl PresenterOptions {
    /// Parse options from JSON, filling unspecified fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reject option combinations the presenter cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(PrismError::Config("max_in_flight must be at least 1".into()));
        }
        if let Some(dar) = self.display_aspect_override {
            if !(dar.width > 0.0 && dar.height > 0.0) {
                return Err(PrismError::Config(format!(
                    "display aspect override {}:{} is degenerate",
                    dar.width, dar.height
                )));
            }
        }
        if self.projection != ProjectionMode::Plane && self.scene_size.is_empty() {
            return Err(PrismError::Config(
                "scene_size is required for sphere and immersive projection".into(),
            ));
        }
        Ok(())
    }

    /// Whether frames should be drawn through the immersive entry point.
    #[inline]
    pub fn is_immersive(&self) -> bool {
        self.projection == ProjectionMode::Immersive
    }
}
