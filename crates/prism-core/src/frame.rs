//! Decoded video frames as handed to the presenter.
//!
//! A frame is produced by the decoder side, wrapped in an `Arc`, and never
//! mutated afterwards. The presenter keeps the current frame plus whatever
//! the GPU still holds for in-flight submissions.

use crate::geometry::{AspectRatio, Size};
use crate::time::MediaTime;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// Identifier of a zero-copy GPU surface shared with the platform compositor.
///
/// Frames carrying one can be handed to the hardware compositing path
/// without a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

/// Pixel format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit BGRA, packed
    #[default]
    Bgra8,
    /// 8-bit RGBA, packed
    Rgba8,
    /// 16-bit RGBA, packed (high bit depth RGB sources)
    Rgba16,
    /// 8-bit Y plane + interleaved CbCr plane, 4:2:0
    Nv12,
    /// 10-bit samples in the high bits of 16-bit words, Y + interleaved CbCr, 4:2:0
    P010,
    /// YUV 4:2:0 planar
    Yuv420P,
    /// YUV 4:2:0 planar, 10-bit samples in the low bits of 16-bit words
    Yuv420P10,
}

impl PixelFormat {
    /// Number of planes for this format.
    pub fn plane_count(self) -> usize {
        match self {
            Self::Bgra8 | Self::Rgba8 | Self::Rgba16 => 1,
            Self::Nv12 | Self::P010 => 2,
            Self::Yuv420P | Self::Yuv420P10 => 3,
        }
    }

    /// Significant bits per sample.
    pub fn bit_depth(self) -> u8 {
        match self {
            Self::Bgra8 | Self::Rgba8 | Self::Nv12 | Self::Yuv420P => 8,
            Self::P010 | Self::Yuv420P10 => 10,
            Self::Rgba16 => 16,
        }
    }

    /// Bits a sample must be shifted left to be MSB-aligned in its word.
    pub fn left_shift(self) -> u8 {
        match self {
            Self::Yuv420P10 => 6,
            _ => 0,
        }
    }

    /// Whether samples are YCbCr and need a conversion matrix.
    pub fn is_yuv(self) -> bool {
        self.plane_count() > 1
    }

    /// Interleaved components stored in `plane`.
    pub fn components(self, plane: usize) -> usize {
        match (self, plane) {
            (Self::Bgra8 | Self::Rgba8 | Self::Rgba16, _) => 4,
            (Self::Nv12 | Self::P010, 1) => 2,
            _ => 1,
        }
    }

    /// Bytes per sample component.
    pub fn bytes_per_component(self) -> usize {
        if self.bit_depth() > 8 {
            2
        } else {
            1
        }
    }

    /// Dimensions of `plane` for a `width`×`height` picture (4:2:0 chroma
    /// is rounded up so odd sizes keep their last column/row).
    pub fn plane_size(self, plane: usize, width: u32, height: u32) -> (u32, u32) {
        if plane == 0 || !self.is_yuv() {
            (width, height)
        } else {
            (width.div_ceil(2), height.div_ceil(2))
        }
    }
}

/// Which YCbCr matrix the decoder tagged the frame with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum YuvMatrix {
    Bt601,
    Bt709,
    Smpte240M,
    Bt2020,
    /// Missing or unrecognized tag.
    #[default]
    Unspecified,
}

/// Sample value range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorRange {
    /// Broadcast-legal range (Y 16..235, C 16..240 for 8-bit)
    #[default]
    Limited,
    /// Full numeric range
    Full,
}

/// Color primaries of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorPrimaries {
    #[default]
    Bt709,
    Bt2020,
    DciP3,
    Unspecified,
}

/// Transfer characteristic (OETF) of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransferCharacteristic {
    #[default]
    Bt709,
    Srgb,
    Linear,
    /// SMPTE ST 2084
    Pq,
    /// ARIB STD-B67
    Hlg,
    Unspecified,
}

impl TransferCharacteristic {
    /// Whether the transfer function encodes HDR luminance.
    pub fn is_hdr(self) -> bool {
        matches!(self, Self::Pq | Self::Hlg)
    }
}

/// A plane of pixel data with stride information.
#[derive(Debug, Clone)]
pub struct FramePlane {
    /// Raw sample data
    pub data: Vec<u8>,
    /// Bytes per row (may include padding)
    pub stride: usize,
    /// Width in samples
    pub width: u32,
    /// Height in rows
    pub height: u32,
}

impl FramePlane {
    /// Create a zeroed plane with `bytes_per_pixel` bytes per sample group.
    pub fn new(width: u32, height: u32, bytes_per_pixel: usize) -> Self {
        // Align stride to 64 bytes for GPU upload
        let min_stride = (width as usize) * bytes_per_pixel;
        let stride = (min_stride + 63) & !63;
        Self {
            data: vec![0u8; stride * height as usize],
            stride,
            width,
            height,
        }
    }

    /// Get a mutable row of pixel data, padding excluded.
    #[inline]
    pub fn row_mut(&mut self, y: u32, bytes_per_pixel: usize) -> &mut [u8] {
        let start = y as usize * self.stride;
        let end = start + self.width as usize * bytes_per_pixel;
        &mut self.data[start..end]
    }

    /// Fill every sample group with `pattern`.
    pub fn fill(&mut self, pattern: &[u8]) {
        let bpp = pattern.len();
        for y in 0..self.height {
            for chunk in self.row_mut(y, bpp).chunks_exact_mut(bpp) {
                chunk.copy_from_slice(pattern);
            }
        }
    }
}

/// A decoded picture ready for presentation.
#[derive(Debug, Clone)]
pub struct Frame {
    pub format: PixelFormat,
    /// Coded width in pixels (`par.width`)
    pub width: u32,
    /// Coded height in pixels (`par.height`)
    pub height: u32,
    /// Sample data, one entry per plane
    pub planes: SmallVec<[FramePlane; crate::limits::MAX_PLANES]>,
    /// Set when the pixels live in a compositor-importable surface
    pub surface: Option<SurfaceId>,
    /// Sample (pixel) aspect ratio
    pub sar: AspectRatio,
    pub yuv_matrix: YuvMatrix,
    pub range: ColorRange,
    pub primaries: ColorPrimaries,
    pub transfer: TransferCharacteristic,
    /// Presentation timestamp
    pub pts: MediaTime,
    /// Frame rate hint reported by the source
    pub fps: f32,
    /// Dolby Vision content
    pub dovi: bool,
}

impl Frame {
    /// Allocate a zeroed frame with planes laid out for `format`.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let planes = (0..format.plane_count())
            .map(|index| {
                let (w, h) = format.plane_size(index, width, height);
                FramePlane::new(w, h, format.components(index) * format.bytes_per_component())
            })
            .collect();

        Self {
            format,
            width,
            height,
            planes,
            surface: None,
            sar: AspectRatio::SQUARE,
            yuv_matrix: YuvMatrix::default(),
            range: ColorRange::default(),
            primaries: ColorPrimaries::default(),
            transfer: TransferCharacteristic::default(),
            pts: MediaTime::ZERO,
            fps: crate::limits::DEFAULT_FRAME_RATE,
            dovi: false,
        }
    }

    pub fn with_surface(mut self, surface: SurfaceId) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn with_colorimetry(mut self, matrix: YuvMatrix, range: ColorRange) -> Self {
        self.yuv_matrix = matrix;
        self.range = range;
        self
    }

    pub fn with_timing(mut self, pts: MediaTime, fps: f32) -> Self {
        self.pts = pts;
        self.fps = fps;
        self
    }

    pub fn with_sar(mut self, sar: AspectRatio) -> Self {
        self.sar = sar;
        self
    }

    #[inline]
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    #[inline]
    pub fn bit_depth(&self) -> u8 {
        self.format.bit_depth()
    }

    #[inline]
    pub fn left_shift(&self) -> u8 {
        self.format.left_shift()
    }

    #[inline]
    pub fn is_full_range(&self) -> bool {
        self.range == ColorRange::Full
    }

    /// Pixel dimensions as a size.
    #[inline]
    pub fn par(&self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }

    /// HDR transfer or Dolby Vision.
    pub fn is_hdr(&self) -> bool {
        self.dovi || self.transfer.is_hdr()
    }

    /// Total memory usage of this frame in bytes.
    pub fn memory_size(&self) -> usize {
        self.planes.iter().map(|p| p.data.len()).sum()
    }
}

/// Arc-wrapped frame for shared ownership between source and presenter.
pub type SharedFrame = Arc<Frame>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nv12_planes() {
        let frame = Frame::new(1920, 1080, PixelFormat::Nv12);
        assert_eq!(frame.plane_count(), 2);
        assert_eq!(frame.planes[1].width, 960);
        assert_eq!(frame.planes[1].height, 540);
        // interleaved CbCr, one byte each
        assert!(frame.planes[1].stride >= 960 * 2);
    }

    #[test]
    fn test_yuv420p10_uses_two_byte_samples() {
        let frame = Frame::new(1280, 720, PixelFormat::Yuv420P10);
        assert_eq!(frame.plane_count(), 3);
        assert_eq!(frame.bit_depth(), 10);
        assert!(frame.planes[0].stride >= 1280 * 2);
    }

    #[test]
    fn test_odd_chroma_rounds_up() {
        assert_eq!(PixelFormat::Yuv420P.plane_size(2, 1919, 1079), (960, 540));
        assert_eq!(PixelFormat::Bgra8.plane_size(0, 1919, 1079), (1919, 1079));
    }

    #[test]
    fn test_packed_formats_are_single_plane() {
        for format in [PixelFormat::Bgra8, PixelFormat::Rgba8, PixelFormat::Rgba16] {
            assert_eq!(format.plane_count(), 1);
            assert!(!format.is_yuv());
        }
    }

    #[test]
    fn test_fill_skips_padding() {
        let mut plane = FramePlane::new(3, 2, 2);
        plane.fill(&[7, 9]);
        assert_eq!(&plane.data[0..6], &[7, 9, 7, 9, 7, 9]);
        assert_eq!(plane.data[6], 0);
    }

    #[test]
    fn test_hdr_detection() {
        let mut frame = Frame::new(16, 16, PixelFormat::P010);
        assert!(!frame.is_hdr());
        frame.transfer = TransferCharacteristic::Pq;
        assert!(frame.is_hdr());
    }
}
