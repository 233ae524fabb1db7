//! Render pipelines keyed by fragment variant, vertex path and target format.
//!
//! The key space is small (3 × 2 × 2) and fully built by [`PipelineCache::warm`]
//! at startup, so a shader or layout mismatch surfaces before the first frame
//! instead of on whichever tick first needs that combination.

use crate::mesh::MeshVertexLayout;
use parking_lot::RwLock;
use prism_core::{Frame, PrismError, ProjectionMode, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Fragment entry point, chosen by plane count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentVariant {
    /// One packed RGB(A) plane
    Packed,
    /// Luma + interleaved chroma
    BiPlanar,
    /// Separate Y, Cb and Cr planes
    TriPlanar,
}

impl FragmentVariant {
    pub const ALL: [Self; 3] = [Self::Packed, Self::BiPlanar, Self::TriPlanar];

    pub fn for_plane_count(planes: usize) -> Result<Self> {
        match planes {
            1 => Ok(Self::Packed),
            2 => Ok(Self::BiPlanar),
            3 => Ok(Self::TriPlanar),
            n => Err(PrismError::UnsupportedFormat(format!("{n} planes"))),
        }
    }

    pub fn entry_point(self) -> &'static str {
        match self {
            Self::Packed => "fs_packed",
            Self::BiPlanar => "fs_biplanar",
            Self::TriPlanar => "fs_triplanar",
        }
    }

    /// Whether the variant reads the YCbCr conversion bindings.
    pub fn converts(self) -> bool {
        self != Self::Packed
    }
}

/// Vertex entry point and mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexPath {
    /// Full-target quad
    Quad,
    /// Inside of a UV sphere, for equirectangular content
    Sphere,
}

impl VertexPath {
    pub const ALL: [Self; 2] = [Self::Quad, Self::Sphere];

    pub fn for_projection(projection: ProjectionMode) -> Self {
        match projection {
            ProjectionMode::Plane => Self::Quad,
            ProjectionMode::Sphere | ProjectionMode::Immersive => Self::Sphere,
        }
    }

    pub fn entry_point(self) -> &'static str {
        match self {
            Self::Quad => "vs_quad",
            Self::Sphere => "vs_sphere",
        }
    }
}

/// Output pixel format class, chosen by source bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    /// 8 bits per channel
    Standard,
    /// 10 bits per channel
    Deep,
}

impl TargetFormat {
    pub const ALL: [Self; 2] = [Self::Standard, Self::Deep];

    pub fn for_bit_depth(bit_depth: u8) -> Self {
        if bit_depth > 8 {
            Self::Deep
        } else {
            Self::Standard
        }
    }
}

/// Concrete texture formats backing each [`TargetFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormats {
    pub standard: wgpu::TextureFormat,
    pub deep: wgpu::TextureFormat,
}

impl Default for OutputFormats {
    fn default() -> Self {
        Self {
            standard: wgpu::TextureFormat::Bgra8Unorm,
            deep: wgpu::TextureFormat::Rgb10a2Unorm,
        }
    }
}

impl OutputFormats {
    /// Pick formats a surface supports. Deep output falls back to the
    /// standard format when 10-bit is unavailable.
    pub fn resolve(supported: &[wgpu::TextureFormat]) -> Result<Self> {
        let preferred = Self::default();
        let standard = if supported.contains(&preferred.standard) {
            preferred.standard
        } else {
            supported
                .iter()
                .copied()
                .find(|f| !f.is_srgb() && f.target_pixel_byte_cost() == Some(4))
                .ok_or_else(|| {
                    PrismError::Capability("surface offers no 8-bit unorm format".into())
                })?
        };
        let deep = if supported.contains(&preferred.deep) {
            preferred.deep
        } else {
            debug!("10-bit output unavailable, deep content renders at 8 bits");
            standard
        };
        Ok(Self { standard, deep })
    }

    pub fn get(&self, target: TargetFormat) -> wgpu::TextureFormat {
        match target {
            TargetFormat::Standard => self.standard,
            TargetFormat::Deep => self.deep,
        }
    }
}

/// Cache key for one compiled pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub fragment: FragmentVariant,
    pub vertex: VertexPath,
    pub target: TargetFormat,
}

impl PipelineKey {
    pub fn for_frame(frame: &Frame, projection: ProjectionMode) -> Result<Self> {
        Ok(Self {
            fragment: FragmentVariant::for_plane_count(frame.plane_count())?,
            vertex: VertexPath::for_projection(projection),
            target: TargetFormat::for_bit_depth(frame.bit_depth()),
        })
    }

    /// Every supported key.
    pub fn all() -> impl Iterator<Item = PipelineKey> {
        FragmentVariant::ALL.into_iter().flat_map(|fragment| {
            VertexPath::ALL.into_iter().flat_map(move |vertex| {
                TargetFormat::ALL.into_iter().map(move |target| PipelineKey {
                    fragment,
                    vertex,
                    target,
                })
            })
        })
    }
}

/// Builds the pipeline object for a key.
pub trait PipelineFactory {
    type Pipeline;

    fn build(&self, key: PipelineKey) -> Result<Self::Pipeline>;
}

/// Memoized pipelines, built once per key for the process lifetime.
pub struct PipelineCache<F: PipelineFactory> {
    factory: F,
    pipelines: RwLock<HashMap<PipelineKey, Arc<F::Pipeline>>>,
}

impl<F: PipelineFactory> PipelineCache<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            pipelines: RwLock::new(HashMap::new()),
        }
    }

    /// Build every supported key. Any failure is fatal.
    pub fn warm(&self) -> Result<()> {
        for key in PipelineKey::all() {
            self.pipeline_for(key)?;
        }
        info!("Pipeline cache warmed: {} pipelines", self.len());
        Ok(())
    }

    pub fn pipeline_for(&self, key: PipelineKey) -> Result<Arc<F::Pipeline>> {
        if let Some(pipeline) = self.pipelines.read().get(&key) {
            return Ok(Arc::clone(pipeline));
        }

        let mut pipelines = self.pipelines.write();
        if let Some(pipeline) = pipelines.get(&key) {
            return Ok(Arc::clone(pipeline));
        }
        debug!(?key, "building pipeline");
        let pipeline = Arc::new(self.factory.build(key)?);
        pipelines.insert(key, Arc::clone(&pipeline));
        Ok(pipeline)
    }

    pub fn len(&self) -> usize {
        self.pipelines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.read().is_empty()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }
}

/// Builds real wgpu pipelines from `video.wgsl`.
pub struct WgpuPipelineFactory {
    device: Arc<wgpu::Device>,
    shader: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    formats: OutputFormats,
}

impl WgpuPipelineFactory {
    pub fn new(
        device: Arc<wgpu::Device>,
        shader: wgpu::ShaderModule,
        layout: wgpu::PipelineLayout,
        formats: OutputFormats,
    ) -> Self {
        Self {
            device,
            shader,
            layout,
            formats,
        }
    }

    pub fn formats(&self) -> OutputFormats {
        self.formats
    }
}

impl PipelineFactory for WgpuPipelineFactory {
    type Pipeline = wgpu::RenderPipeline;

    fn build(&self, key: PipelineKey) -> Result<wgpu::RenderPipeline> {
        let label = format!("{:?}/{:?}/{:?}", key.fragment, key.vertex, key.target);
        let buffers = MeshVertexLayout::buffers();

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(&self.layout),
                vertex: wgpu::VertexState {
                    module: &self.shader,
                    entry_point: Some(key.vertex.entry_point()),
                    buffers: &buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.shader,
                    entry_point: Some(key.fragment.entry_point()),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.formats.get(key.target),
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(PrismError::Shader(format!("pipeline {label}: {err}"))),
            None => Ok(pipeline),
        }
    }
}
