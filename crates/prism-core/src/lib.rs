//! Prism Core - Foundation types for video presentation
//!
//! This crate provides the types shared by every Prism crate:
//! - Decoded frames, pixel formats, and colorimetry tags
//! - Media time (rational presentation timestamps)
//! - Presentation geometry (aspect fit, drawable size)
//! - Presenter options and the `FrameSource` collaborator trait

pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod source;
pub mod time;

pub use config::{
    CompositorBackpressure, ContentMode, PresenterOptions, ProjectionMode, StereoMode,
};
pub use error::{PrismError, Result};
pub use frame::{
    ColorPrimaries, ColorRange, Frame, FramePlane, PixelFormat, SharedFrame, SurfaceId,
    TransferCharacteristic, YuvMatrix,
};
pub use geometry::{AspectRatio, GeometryInputs, PresentationGeometry, Size};
pub use source::FrameSource;
pub use time::MediaTime;

/// Rendering constants shared by the GPU and player crates.
pub mod limits {
    /// GPU submissions allowed in flight before the tick thread blocks.
    pub const MAX_BUFFERS_IN_FLIGHT: usize = 3;

    /// Planes a single frame can carry (Y, U, V).
    pub const MAX_PLANES: usize = 3;

    /// Frame rate assumed until the first frame reports one.
    pub const DEFAULT_FRAME_RATE: f32 = 60.0;
}
