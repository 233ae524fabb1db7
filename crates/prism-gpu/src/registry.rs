//! Device-wide rendering state built once at startup.
//!
//! Everything here is immutable after [`RenderRegistry::new`] returns and is
//! shared by every renderer as `Arc<RenderRegistry>`.

use crate::bindings::slot;
use crate::context::GpuContext;
use crate::mesh::{GpuMesh, MeshData};
use crate::pipeline::{OutputFormats, PipelineCache, VertexPath, WgpuPipelineFactory};
use crate::uniforms::{ColorMatrixUniform, Vec3Uniform};
use bytemuck::Pod;
use glam::Vec3;
use prism_color::{
    range_index, range_offset, ColorConversionTable, ConversionParams, SampleShift, YuvStandard,
};
use prism_core::{ColorRange, Result};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::info;
use wgpu::util::DeviceExt;

const SPHERE_RADIUS: f32 = 10.0;
const SPHERE_SLICES: u32 = 64;
const SPHERE_STACKS: u32 = 32;

fn uniform_buffer<T: Pod>(device: &wgpu::Device, label: &str, value: &T) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(value),
        usage: wgpu::BufferUsages::UNIFORM,
    })
}

/// Conversion uniforms for every standard × range, uploaded once.
pub struct ConversionBuffers {
    matrices: [[wgpu::Buffer; 2]; 4],
    offsets: [wgpu::Buffer; 2],
    shifts: [wgpu::Buffer; 2],
    identity: wgpu::Buffer,
    zero_offset: wgpu::Buffer,
}

impl ConversionBuffers {
    fn new(device: &wgpu::Device, table: &ColorConversionTable) -> Self {
        let ranges = [ColorRange::Limited, ColorRange::Full];
        let matrices = YuvStandard::ALL.map(|standard| {
            ranges.map(|range| {
                let matrix = ColorMatrixUniform::from_matrix(&table.matrix_for(standard, range));
                uniform_buffer(device, "Conversion Matrix", &matrix)
            })
        });
        let offsets =
            ranges.map(|range| uniform_buffer(device, "Range Offset", &Vec3Uniform::new(range_offset(range))));
        let shifts = [SampleShift::None, SampleShift::Six]
            .map(|shift| uniform_buffer(device, "Sample Shift", &Vec3Uniform::shift(shift)));

        Self {
            matrices,
            offsets,
            shifts,
            identity: uniform_buffer(device, "Identity Matrix", &ColorMatrixUniform::IDENTITY),
            zero_offset: uniform_buffer(device, "Zero Offset", &Vec3Uniform::new(Vec3::ZERO)),
        }
    }

    /// Matrix, offset and shift buffers for a conversion; placeholders when
    /// the frame needs none.
    pub fn select(&self, conversion: Option<&ConversionParams>) -> [&wgpu::Buffer; 3] {
        match conversion {
            Some(params) => {
                let range = range_index(params.range);
                let shift = match params.shift {
                    SampleShift::None => 0,
                    SampleShift::Six => 1,
                };
                [
                    &self.matrices[params.standard.index()][range],
                    &self.offsets[range],
                    &self.shifts[shift],
                ]
            }
            None => [&self.identity, &self.zero_offset, &self.shifts[0]],
        }
    }
}

/// Shared device, layouts, pipelines and static buffers.
pub struct RenderRegistry {
    pub context: GpuContext,
    pub frame_layout: wgpu::BindGroupLayout,
    pub eye_layout: wgpu::BindGroupLayout,
    pub pipelines: PipelineCache<WgpuPipelineFactory>,
    pub table: ColorConversionTable,
    pub conversion: ConversionBuffers,
    pub sampler: wgpu::Sampler,
    /// 1×1 texture bound to plane slots a frame doesn't use
    pub placeholder: wgpu::TextureView,
    quad: GpuMesh,
    sphere: GpuMesh,
}

impl RenderRegistry {
    /// Build all shared state and validate every pipeline.
    pub fn new(context: GpuContext, formats: OutputFormats) -> Result<Arc<Self>> {
        let device = &context.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("video_shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/video.wgsl"))),
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame_bind_group_layout"),
            entries: &frame_layout_entries(),
        });
        let eye_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("eye_bind_group_layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("video_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &eye_layout],
            push_constant_ranges: &[],
        });

        let pipelines = PipelineCache::new(WgpuPipelineFactory::new(
            Arc::clone(device),
            shader,
            pipeline_layout,
            formats,
        ));
        pipelines.warm()?;

        let table = ColorConversionTable::new();
        let conversion = ConversionBuffers::new(device, &table);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("video_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let placeholder = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("placeholder_plane"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::R8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        let quad = GpuMesh::upload(device, &MeshData::quad(), "quad");
        let sphere = GpuMesh::upload(
            device,
            &MeshData::sphere(SPHERE_RADIUS, SPHERE_SLICES, SPHERE_STACKS),
            "sphere",
        );

        info!(
            standard = ?formats.standard,
            deep = ?formats.deep,
            "Render registry ready"
        );

        Ok(Arc::new(Self {
            context,
            frame_layout,
            eye_layout,
            pipelines,
            table,
            conversion,
            sampler,
            placeholder,
            quad,
            sphere,
        }))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.context.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.context.queue
    }

    pub fn formats(&self) -> OutputFormats {
        self.pipelines.factory().formats()
    }

    pub fn mesh(&self, path: VertexPath) -> &GpuMesh {
        match path {
            VertexPath::Quad => &self.quad,
            VertexPath::Sphere => &self.sphere,
        }
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn frame_layout_entries() -> [wgpu::BindGroupLayoutEntry; 8] {
    let texture = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };
    [
        wgpu::BindGroupLayoutEntry {
            binding: slot::SAMPLER,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        },
        texture(slot::PLANE_BASE),
        texture(slot::PLANE_BASE + 1),
        texture(slot::PLANE_BASE + 2),
        uniform_entry(slot::COLOR_MATRIX, wgpu::ShaderStages::FRAGMENT),
        uniform_entry(slot::RANGE_OFFSET, wgpu::ShaderStages::FRAGMENT),
        uniform_entry(slot::SAMPLE_SHIFT, wgpu::ShaderStages::FRAGMENT),
        uniform_entry(slot::CUSTOM_DATA, wgpu::ShaderStages::FRAGMENT),
    ]
}
