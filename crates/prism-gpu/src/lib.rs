//! Prism GPU - wgpu shader path for video presentation
//!
//! Uses Metal backend on macOS, Vulkan/DX12 elsewhere. Frames are uploaded
//! plane by plane, converted to RGB in `video.wgsl`, and drawn onto a quad
//! or a sphere, for one view or two eyes.

pub mod bindings;
pub mod context;
pub mod immersive;
pub mod in_flight;
pub mod mesh;
pub mod pipeline;
pub mod registry;
pub mod renderer;
pub mod target;
pub mod texture;
pub mod texture_pool;
pub mod uniforms;

pub use bindings::FragmentBindings;
pub use context::GpuContext;
pub use immersive::{EyeView, ImmersiveDrawable, ImmersiveLayer, PoseProvider};
pub use in_flight::{InFlightPermit, InFlightPermits};
pub use pipeline::{
    FragmentVariant, OutputFormats, PipelineCache, PipelineFactory, PipelineKey, TargetFormat,
    VertexPath,
};
pub use registry::RenderRegistry;
pub use renderer::{DrawOutcome, FrameRenderer};
pub use target::{DrawTarget, Drawable, OffscreenTarget, WindowTarget};
pub use texture::GpuTexture;
pub use texture_pool::TexturePool;
