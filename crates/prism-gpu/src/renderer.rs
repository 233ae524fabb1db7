//! Encodes and submits frame draws.
//!
//! Flat and immersive draws share one binding routine: upload planes, pick
//! conversion buffers, write per-frame uniforms, build the bind groups. Each
//! submission holds an in-flight permit until the queue reports the work done.

use crate::bindings::{slot, FragmentBindings};
use crate::immersive::{eye_uniforms, ImmersiveLayer, PoseProvider};
use crate::in_flight::{InFlightPermit, InFlightPermits};
use crate::pipeline::{PipelineKey, VertexPath};
use crate::registry::RenderRegistry;
use crate::target::Drawable;
use crate::texture_pool::{PlaneTextures, TexturePool};
use crate::uniforms::{CustomData, EyeUniforms, UniformsArray};
use glam::Mat4;
use prism_core::{Frame, ProjectionMode, Result, StereoMode};
use std::sync::Arc;
use tracing::{debug, trace};

/// Pool budget for reusable plane textures.
const TEXTURE_POOL_BUDGET: usize = 256 * 1024 * 1024;

/// Vertical field of view for sphere content on a flat surface.
const FLAT_SPHERE_FOV_Y: f32 = 75.0;

/// Result of one draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    Presented,
    /// No drawable was available; the tick was dropped.
    Skipped,
}

/// Per-draw GPU state that is not part of the shared registry.
struct BoundFrame {
    frame_group: wgpu::BindGroup,
    eye_group: wgpu::BindGroup,
    pipeline: Arc<wgpu::RenderPipeline>,
    textures: PlaneTextures,
    vertex: VertexPath,
}

pub struct FrameRenderer {
    registry: Arc<RenderRegistry>,
    pool: TexturePool,
    permits: InFlightPermits,
    custom_buffer: wgpu::Buffer,
    eye_buffer: wgpu::Buffer,
    frame_counter: u32,
}

impl FrameRenderer {
    pub fn new(registry: Arc<RenderRegistry>, max_in_flight: usize) -> Self {
        let device = registry.device();
        let custom_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("custom_data"),
            size: std::mem::size_of::<CustomData>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let eye_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("eye_uniforms"),
            size: std::mem::size_of::<UniformsArray>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            registry,
            pool: TexturePool::new(TEXTURE_POOL_BUDGET),
            permits: InFlightPermits::new(max_in_flight),
            custom_buffer,
            eye_buffer,
            frame_counter: 0,
        }
    }

    pub fn registry(&self) -> &Arc<RenderRegistry> {
        &self.registry
    }

    pub fn permits(&self) -> &InFlightPermits {
        &self.permits
    }

    /// Output format a frame's pipeline renders to.
    pub fn target_format_for(&self, frame: &Frame, projection: ProjectionMode) -> Result<wgpu::TextureFormat> {
        let key = PipelineKey::for_frame(frame, projection)?;
        Ok(self.registry.formats().get(key.target))
    }

    /// Draw one frame onto a flat surface.
    pub fn draw_flat(
        &mut self,
        frame: &Frame,
        drawable: Drawable,
        projection: ProjectionMode,
        stereo: StereoMode,
    ) -> Result<DrawOutcome> {
        let key = PipelineKey::for_frame(frame, projection)?;
        let eyes = match key.vertex {
            VertexPath::Quad => UniformsArray::mono(EyeUniforms::new(Mat4::IDENTITY, Mat4::IDENTITY)),
            VertexPath::Sphere => {
                let aspect = drawable.width as f32 / drawable.height.max(1) as f32;
                let projection =
                    Mat4::perspective_rh(FLAT_SPHERE_FOV_Y.to_radians(), aspect, 0.1, 100.0);
                UniformsArray::mono(EyeUniforms::new(projection, Mat4::IDENTITY))
            }
        };

        let permit = self.acquire_permit();
        let bound = self.bind(frame, key, stereo, &eyes)?;

        let mut encoder = self
            .registry
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("flat_draw"),
            });
        {
            let mut pass = begin_pass(&mut encoder, &drawable.view, wgpu::Color::BLACK);
            self.encode(&mut pass, &bound, 0);
        }

        self.submit(encoder, permit, bound.textures);
        drawable.present();
        Ok(DrawOutcome::Presented)
    }

    /// Draw one frame for both eyes of an immersive layer.
    pub fn draw_immersive(
        &mut self,
        frame: &Frame,
        layer: &mut dyn ImmersiveLayer,
        poses: &dyn PoseProvider,
        stereo: StereoMode,
    ) -> Result<DrawOutcome> {
        let Some(target) = layer.next_drawable() else {
            trace!("no immersive drawable, skipping tick");
            return Ok(DrawOutcome::Skipped);
        };

        let permit = self.acquire_permit();

        let device_pose = poses
            .device_pose(target.presentation_time)
            .unwrap_or(Mat4::IDENTITY);
        let eyes = eye_uniforms(device_pose, &target.views);

        let key = PipelineKey::for_frame(frame, ProjectionMode::Immersive)?;
        let bound = self.bind(frame, key, stereo, &eyes)?;

        let drawable = target.drawable;
        let half = drawable.width as f32 / 2.0;
        let mut encoder = self
            .registry
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("immersive_draw"),
            });
        {
            let mut pass = begin_pass(&mut encoder, &drawable.view, wgpu::Color::TRANSPARENT);
            for eye in 0..2u32 {
                pass.set_viewport(half * eye as f32, 0.0, half, drawable.height as f32, 0.0, 1.0);
                self.encode(&mut pass, &bound, eye);
            }
        }

        self.submit(encoder, permit, bound.textures);
        layer.present(drawable, device_pose);
        Ok(DrawOutcome::Presented)
    }

    /// Render a transparent clear into `drawable`.
    pub fn clear(&mut self, drawable: Drawable) {
        let mut encoder = self
            .registry
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear"),
            });
        drop(begin_pass(&mut encoder, &drawable.view, wgpu::Color::TRANSPARENT));
        self.registry.queue().submit(Some(encoder.finish()));
        drawable.present();
    }

    /// Free a permit, waiting on the GPU if every slot is busy.
    fn acquire_permit(&self) -> InFlightPermit {
        if let Some(permit) = self.permits.try_acquire() {
            return permit;
        }
        debug!(
            outstanding = self.permits.outstanding(),
            "in-flight limit reached, waiting for GPU"
        );
        let _ = self.registry.device().poll(wgpu::Maintain::Wait);
        self.permits.acquire()
    }

    fn bind(
        &mut self,
        frame: &Frame,
        key: PipelineKey,
        stereo: StereoMode,
        eyes: &UniformsArray,
    ) -> Result<BoundFrame> {
        let registry = Arc::clone(&self.registry);
        let plan = FragmentBindings::plan(frame, &registry.table, stereo, self.frame_counter)?;
        self.frame_counter = self.frame_counter.wrapping_add(1);

        let pipeline = registry.pipelines.pipeline_for(key)?;
        let textures = self
            .pool
            .upload_frame(registry.device(), registry.queue(), frame)?;

        let queue = registry.queue();
        queue.write_buffer(&self.custom_buffer, 0, bytemuck::bytes_of(&plan.custom));
        queue.write_buffer(&self.eye_buffer, 0, bytemuck::bytes_of(eyes));

        let plane_view = |i: usize| textures.get(i).map_or(&registry.placeholder, |t| &t.view);
        let [matrix, offset, shift] = registry.conversion.select(plan.conversion.as_ref());

        let frame_group = registry
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("frame_bind_group"),
                layout: &registry.frame_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: slot::SAMPLER,
                        resource: wgpu::BindingResource::Sampler(&registry.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: slot::PLANE_BASE,
                        resource: wgpu::BindingResource::TextureView(plane_view(0)),
                    },
                    wgpu::BindGroupEntry {
                        binding: slot::PLANE_BASE + 1,
                        resource: wgpu::BindingResource::TextureView(plane_view(1)),
                    },
                    wgpu::BindGroupEntry {
                        binding: slot::PLANE_BASE + 2,
                        resource: wgpu::BindingResource::TextureView(plane_view(2)),
                    },
                    wgpu::BindGroupEntry {
                        binding: slot::COLOR_MATRIX,
                        resource: matrix.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: slot::RANGE_OFFSET,
                        resource: offset.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: slot::SAMPLE_SHIFT,
                        resource: shift.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: slot::CUSTOM_DATA,
                        resource: self.custom_buffer.as_entire_binding(),
                    },
                ],
            });

        let eye_group = registry
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("eye_bind_group"),
                layout: &registry.eye_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.eye_buffer.as_entire_binding(),
                }],
            });

        Ok(BoundFrame {
            frame_group,
            eye_group,
            pipeline,
            textures,
            vertex: key.vertex,
        })
    }

    fn encode(&self, pass: &mut wgpu::RenderPass<'_>, bound: &BoundFrame, eye: u32) {
        let mesh = self.registry.mesh(bound.vertex);
        pass.set_pipeline(&bound.pipeline);
        pass.set_bind_group(0, &bound.frame_group, &[]);
        pass.set_bind_group(1, &bound.eye_group, &[]);
        mesh.bind(pass);
        pass.draw_indexed(0..mesh.index_count, 0, eye..eye + 1);
    }

    fn submit(&mut self, encoder: wgpu::CommandEncoder, permit: InFlightPermit, textures: PlaneTextures) {
        let queue = self.registry.queue();
        queue.submit(Some(encoder.finish()));
        queue.on_submitted_work_done(move || drop(permit));
        self.pool.release_all(textures);
        trace!(
            idle_textures = self.pool.idle_count(),
            pooled_bytes = self.pool.memory_usage(),
            "frame submitted"
        );
    }
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    clear: wgpu::Color,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("video_pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}
