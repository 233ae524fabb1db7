//! Uniform block layouts shared with `video.wgsl`.
//!
//! Every struct here is `#[repr(C)]` + `Pod` and padded to WGSL's uniform
//! alignment rules (vec3 occupies 16 bytes, mat3x3 is three vec4 columns).

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use prism_color::{ColorConversionMatrix, SampleShift};
use prism_core::StereoMode;

/// `mat3x3<f32>` as laid out in a uniform buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorMatrixUniform {
    pub columns: [[f32; 4]; 3],
}

impl ColorMatrixUniform {
    pub const IDENTITY: Self = Self {
        columns: [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]],
    };

    pub fn from_matrix(matrix: &ColorConversionMatrix) -> Self {
        let m = matrix.to_mat3();
        Self {
            columns: [
                m.x_axis.extend(0.0).to_array(),
                m.y_axis.extend(0.0).to_array(),
                m.z_axis.extend(0.0).to_array(),
            ],
        }
    }
}

/// `vec3<f32>` padded to 16 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vec3Uniform {
    pub value: [f32; 4],
}

impl Vec3Uniform {
    pub fn new(v: Vec3) -> Self {
        Self {
            value: v.extend(0.0).to_array(),
        }
    }

    pub fn shift(shift: SampleShift) -> Self {
        Self::new(shift.vector())
    }
}

/// Per-frame values the fragment stage reads besides the conversion.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct CustomData {
    pub stereo_mode: u32,
    pub frame_counter: u32,
    pub _pad: [u32; 2],
}

impl CustomData {
    pub fn new(stereo: StereoMode, frame_counter: u32) -> Self {
        Self {
            stereo_mode: stereo.shader_id(),
            frame_counter,
            _pad: [0; 2],
        }
    }
}

/// Projection and model-view for one eye (or the single flat view).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct EyeUniforms {
    pub projection: [[f32; 4]; 4],
    pub model_view: [[f32; 4]; 4],
}

impl EyeUniforms {
    pub fn new(projection: Mat4, model_view: Mat4) -> Self {
        Self {
            projection: projection.to_cols_array_2d(),
            model_view: model_view.to_cols_array_2d(),
        }
    }
}

/// Both eyes in one block; flat draws fill both slots with the same view.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UniformsArray {
    pub eyes: [EyeUniforms; 2],
}

impl UniformsArray {
    pub fn mono(eye: EyeUniforms) -> Self {
        Self { eyes: [eye, eye] }
    }
}
