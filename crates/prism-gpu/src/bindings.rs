//! What a frame binds to the fragment stage.
//!
//! Kept free of GPU handles so the selection can be checked without a device;
//! the renderer turns a [`FragmentBindings`] into a bind group.

use crate::pipeline::FragmentVariant;
use crate::uniforms::CustomData;
use prism_color::{ColorConversionTable, ConversionParams};
use prism_core::{Frame, Result, StereoMode};

/// Binding slots of group 0 in `video.wgsl`.
pub mod slot {
    pub const SAMPLER: u32 = 0;
    /// Plane `i` is bound at `PLANE_BASE + i`.
    pub const PLANE_BASE: u32 = 1;
    pub const COLOR_MATRIX: u32 = 4;
    pub const RANGE_OFFSET: u32 = 5;
    pub const SAMPLE_SHIFT: u32 = 6;
    pub const CUSTOM_DATA: u32 = 7;
}

/// Resolved bindings for one draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentBindings {
    pub variant: FragmentVariant,
    /// Planes bound to sequential texture slots from [`slot::PLANE_BASE`].
    pub texture_count: usize,
    /// Present only for multi-plane frames; packed frames bind placeholders.
    pub conversion: Option<ConversionParams>,
    pub custom: CustomData,
}

impl FragmentBindings {
    pub fn plan(
        frame: &Frame,
        table: &ColorConversionTable,
        stereo: StereoMode,
        frame_counter: u32,
    ) -> Result<Self> {
        let variant = FragmentVariant::for_plane_count(frame.plane_count())?;
        let conversion = variant
            .converts()
            .then(|| table.select(frame.yuv_matrix, frame.range, frame.left_shift()));
        Ok(Self {
            variant,
            texture_count: frame.plane_count(),
            conversion,
            custom: CustomData::new(stereo, frame_counter),
        })
    }

    pub fn plane_slots(&self) -> impl Iterator<Item = u32> {
        (0..self.texture_count as u32).map(|i| slot::PLANE_BASE + i)
    }
}
