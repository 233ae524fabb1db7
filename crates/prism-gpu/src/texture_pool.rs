//! Reusable plane textures.
//!
//! Consecutive frames almost always share dimensions and format, so the
//! textures of one frame are returned here after its commands are submitted
//! and picked up again by the next frame.

use crate::texture::{plane_texture_format, GpuTexture};
use prism_core::{Frame, Result};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Key for pooled textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TextureKey {
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
}

impl TextureKey {
    fn of(texture: &GpuTexture) -> Self {
        Self {
            width: texture.width,
            height: texture.height,
            format: texture.format,
        }
    }
}

/// The textures of one uploaded frame, in plane order.
pub type PlaneTextures = SmallVec<[GpuTexture; prism_core::limits::MAX_PLANES]>;

pub struct TexturePool {
    /// Idle textures by extent and format.
    free: HashMap<TextureKey, Vec<GpuTexture>>,
    total_memory: usize,
    max_memory: usize,
}

impl TexturePool {
    /// `max_memory` caps the bytes held by idle textures.
    pub fn new(max_memory: usize) -> Self {
        Self {
            free: HashMap::new(),
            total_memory: 0,
            max_memory,
        }
    }

    /// An idle texture matching the request, or a fresh one.
    pub fn acquire(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> GpuTexture {
        let key = TextureKey {
            width,
            height,
            format,
        };

        if let Some(tex) = self.free.get_mut(&key).and_then(Vec::pop) {
            self.total_memory -= tex.memory_size();
            return tex;
        }

        GpuTexture::for_plane(device, width, height, format)
    }

    /// Upload every plane of `frame` into pooled textures.
    pub fn upload_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame: &Frame,
    ) -> Result<PlaneTextures> {
        let mut textures = PlaneTextures::new();
        for (index, plane) in frame.planes.iter().enumerate() {
            let format = plane_texture_format(frame.format, index);
            let texture = self.acquire(device, plane.width, plane.height, format);
            if let Err(err) = texture.upload_plane(queue, plane) {
                self.release(texture);
                self.release_all(textures);
                return Err(err);
            }
            textures.push(texture);
        }
        Ok(textures)
    }

    /// Keep `texture` for reuse, or drop it if the budget is spent.
    pub fn release(&mut self, texture: GpuTexture) {
        let bytes = texture.memory_size();
        if self.total_memory + bytes > self.max_memory {
            return;
        }

        self.total_memory += bytes;
        self.free.entry(TextureKey::of(&texture)).or_default().push(texture);
    }

    pub fn release_all(&mut self, textures: PlaneTextures) {
        for texture in textures {
            self.release(texture);
        }
    }

    /// Bytes held by idle textures.
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn idle_count(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }
}
