//! GPU textures holding one frame plane each.

use prism_core::{FramePlane, PixelFormat, PrismError, Result};
use std::borrow::Cow;

/// wgpu requires `bytes_per_row` to be a multiple of this.
const COPY_BYTES_PER_ROW_ALIGNMENT: usize = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;

/// Texture format a plane of `format` is sampled from.
///
/// High bit depth planes use 16-bit normalized formats, which need
/// `Features::TEXTURE_FORMAT_16BIT_NORM`.
pub fn plane_texture_format(format: PixelFormat, plane: usize) -> wgpu::TextureFormat {
    use wgpu::TextureFormat as T;
    let deep = format.bytes_per_component() > 1;
    match (format, format.components(plane), deep) {
        (PixelFormat::Bgra8, _, _) => T::Bgra8Unorm,
        (_, 4, false) => T::Rgba8Unorm,
        (_, 4, true) => T::Rgba16Unorm,
        (_, 2, false) => T::Rg8Unorm,
        (_, 2, true) => T::Rg16Unorm,
        (_, _, false) => T::R8Unorm,
        (_, _, true) => T::R16Unorm,
    }
}

/// Repack rows so the stride meets the copy alignment. Borrows when the
/// plane is already aligned.
pub fn aligned_rows(plane: &FramePlane) -> (u32, Cow<'_, [u8]>) {
    let stride = plane.stride;
    let aligned = stride.next_multiple_of(COPY_BYTES_PER_ROW_ALIGNMENT);
    if aligned == stride {
        return (stride as u32, Cow::Borrowed(&plane.data));
    }

    let rows = plane.height as usize;
    let mut padded = vec![0u8; aligned * rows];
    for (src, dst) in plane
        .data
        .chunks(stride)
        .zip(padded.chunks_exact_mut(aligned))
        .take(rows)
    {
        dst[..src.len()].copy_from_slice(src);
    }
    (aligned as u32, Cow::Owned(padded))
}

/// A GPU texture sized for one plane.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

impl GpuTexture {
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
        label: Option<&str>,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
            format,
        }
    }

    /// Sampled texture for a frame plane.
    pub fn for_plane(device: &wgpu::Device, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self::new(
            device,
            width,
            height,
            format,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            Some("Plane Texture"),
        )
    }

    /// Color target for offscreen rendering.
    pub fn render_target(device: &wgpu::Device, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self::new(
            device,
            width,
            height,
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            Some("Render Target"),
        )
    }

    /// Copy a plane's samples into this texture.
    pub fn upload_plane(&self, queue: &wgpu::Queue, plane: &FramePlane) -> Result<()> {
        if plane.width != self.width || plane.height != self.height {
            return Err(PrismError::InvalidParameter(format!(
                "plane {}x{} doesn't match texture {}x{}",
                plane.width, plane.height, self.width, self.height
            )));
        }
        let row_bytes = self.width as usize * self.bytes_per_pixel();
        if plane.stride < row_bytes || plane.data.len() < plane.stride * plane.height as usize {
            return Err(PrismError::InvalidParameter(format!(
                "plane data too short for {}x{} {:?}",
                self.width, self.height, self.format
            )));
        }

        let (bytes_per_row, data) = aligned_rows(plane);
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        Ok(())
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.format.block_copy_size(None).unwrap_or(4) as usize
    }

    /// Memory usage estimate in bytes.
    pub fn memory_size(&self) -> usize {
        (self.width * self.height) as usize * self.bytes_per_pixel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::Frame;

    #[test]
    fn test_plane_formats_8bit() {
        use wgpu::TextureFormat as T;
        assert_eq!(plane_texture_format(PixelFormat::Nv12, 0), T::R8Unorm);
        assert_eq!(plane_texture_format(PixelFormat::Nv12, 1), T::Rg8Unorm);
        assert_eq!(plane_texture_format(PixelFormat::Yuv420P, 2), T::R8Unorm);
        assert_eq!(plane_texture_format(PixelFormat::Bgra8, 0), T::Bgra8Unorm);
        assert_eq!(plane_texture_format(PixelFormat::Rgba8, 0), T::Rgba8Unorm);
    }

    #[test]
    fn test_plane_formats_deep() {
        use wgpu::TextureFormat as T;
        assert_eq!(plane_texture_format(PixelFormat::P010, 0), T::R16Unorm);
        assert_eq!(plane_texture_format(PixelFormat::P010, 1), T::Rg16Unorm);
        assert_eq!(plane_texture_format(PixelFormat::Yuv420P10, 1), T::R16Unorm);
        assert_eq!(plane_texture_format(PixelFormat::Rgba16, 0), T::Rgba16Unorm);
    }

    #[test]
    fn test_aligned_rows_borrows_when_aligned() {
        let plane = FramePlane::new(256, 4, 1);
        let (bpr, data) = aligned_rows(&plane);
        assert_eq!(bpr, 256);
        assert!(matches!(data, Cow::Borrowed(_)));
    }

    #[test]
    fn test_aligned_rows_pads() {
        let frame = Frame::new(100, 3, PixelFormat::Yuv420P);
        let mut plane = frame.planes[0].clone();
        plane.fill(&[9]);
        let (bpr, data) = aligned_rows(&plane);
        assert_eq!(bpr, 256);
        assert_eq!(data.len(), 256 * 3);
        assert_eq!(data[256], 9);
        assert_eq!(data[256 + 100], 0);
    }
}
