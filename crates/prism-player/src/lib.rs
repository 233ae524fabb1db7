//! Prism Player - frame pacing and presentation paths
//!
//! `VideoView` is driven by a display link. Each tick it pulls a frame from
//! the `FrameSource`, picks the hardware compositing or shader path for it,
//! and hands it to the matching sink.

pub mod composite;
pub mod pacer;
pub mod path;
pub mod sink;
pub mod ticker;
pub mod timebase;
pub mod view;

pub use composite::{
    CompositorLayer, CompositorLayerFactory, EnqueueOutcome, FormatDescription,
    HardwareCompositeSink, LayerStatus, SampleBuffer,
};
pub use pacer::{Cadence, DisplayLink, FramePacer, PacerState, TickAction};
pub use path::{PathDecision, PathSelector, PathSwitch, PresentationPath};
pub use sink::{ColorspaceChange, ColorspaceTracker, DrawRequest, ImmersiveSession, ShaderSink, SurfaceView};
pub use ticker::ThreadTicker;
pub use timebase::ControlTimebase;
pub use view::{hardware_sample_aspect, TickReport, VideoProperties, VideoView};
