//! YCbCr → RGB conversion matrices per broadcast standard and range.
//!
//! ```text
//! | R |   | 1    0                        2 - 2Kr              |   | Y' |
//! | G | = | 1   -Kb(2 - 2Kb) / Kg        -Kr(2 - 2Kr) / Kg     | × | Cb |
//! | B |   | 1    2 - 2Kb                  0                    |   | Cr |
//! ```
//!
//! Limited-range variants scale luma by 255/219 and chroma by 255/224.
//! The fragment shader computes `matrix × (sample × shift + offset)`.
#![allow(clippy::excessive_precision)]

use glam::{Mat3, Vec3};
use prism_core::{ColorRange, YuvMatrix};
use serde::{Deserialize, Serialize};

/// Colorimetry standards with a conversion matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YuvStandard {
    /// ITU-R BT.601-4
    Bt601,
    /// ITU-R BT.709-2
    Bt709,
    /// SMPTE 240M-1995
    Smpte240M,
    /// ITU-R BT.2020
    Bt2020,
}

impl YuvStandard {
    pub const ALL: [YuvStandard; 4] = [Self::Bt601, Self::Bt709, Self::Smpte240M, Self::Bt2020];

    /// Standard for a decoder tag. Untagged content is treated as BT.601.
    pub fn from_matrix(tag: YuvMatrix) -> Self {
        match tag {
            YuvMatrix::Bt709 => Self::Bt709,
            YuvMatrix::Smpte240M => Self::Smpte240M,
            YuvMatrix::Bt2020 => Self::Bt2020,
            YuvMatrix::Bt601 | YuvMatrix::Unspecified => Self::Bt601,
        }
    }

    /// Luma weights `(Kr, Kb)`.
    pub fn coefficients(self) -> (f32, f32) {
        match self {
            Self::Bt601 => (0.299, 0.114),
            Self::Bt709 => (0.2126, 0.0722),
            Self::Smpte240M => (0.212, 0.087),
            Self::Bt2020 => (0.2627, 0.0593),
        }
    }

    /// Row of this standard in per-standard lookup tables.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Bt601 => 0,
            Self::Bt709 => 1,
            Self::Smpte240M => 2,
            Self::Bt2020 => 3,
        }
    }
}

/// Column of a range in per-range lookup tables (limited first).
#[inline]
pub fn range_index(range: ColorRange) -> usize {
    match range {
        ColorRange::Limited => 0,
        ColorRange::Full => 1,
    }
}

/// The five non-trivial entries of a YCbCr → RGB matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorConversionMatrix {
    pub y: f32,
    pub cr_r: f32,
    pub cr_g: f32,
    pub cb_g: f32,
    pub cb_b: f32,
}

impl ColorConversionMatrix {
    /// Full-range matrix for luma weights `kr` and `kb`.
    pub fn from_coefficients(kr: f32, kb: f32) -> Self {
        let kg = 1.0 - kr - kb;
        Self {
            y: 1.0,
            cr_r: 2.0 - 2.0 * kr,
            cr_g: -kr * (2.0 - 2.0 * kr) / kg,
            cb_g: -kb * (2.0 - 2.0 * kb) / kg,
            cb_b: 2.0 - 2.0 * kb,
        }
    }

    /// The same matrix rescaled for limited-range samples.
    pub fn limited(self) -> Self {
        const LUMA: f32 = 255.0 / 219.0;
        const CHROMA: f32 = 255.0 / 224.0;
        Self {
            y: LUMA * self.y,
            cr_r: CHROMA * self.cr_r,
            cr_g: CHROMA * self.cr_g,
            cb_g: CHROMA * self.cb_g,
            cb_b: CHROMA * self.cb_b,
        }
    }

    /// Column-major 3×3 matrix applied to `(Y, Cb, Cr)`.
    pub fn to_mat3(&self) -> Mat3 {
        Mat3::from_cols(
            Vec3::new(self.y, self.y, self.y),
            Vec3::new(0.0, self.cb_g, self.cb_b),
            Vec3::new(self.cr_r, self.cr_g, 0.0),
        )
    }

    /// Convert one offset-corrected sample (`cb`, `cr` centered on zero).
    #[inline]
    pub fn to_rgb(&self, y: f32, cb: f32, cr: f32) -> Vec3 {
        self.to_mat3() * Vec3::new(y, cb, cr)
    }
}

/// Offset added to raw normalized samples before the matrix.
pub fn range_offset(range: ColorRange) -> Vec3 {
    match range {
        ColorRange::Limited => Vec3::new(-16.0 / 255.0, -128.0 / 255.0, -128.0 / 255.0),
        ColorRange::Full => Vec3::new(0.0, -128.0 / 255.0, -128.0 / 255.0),
    }
}

/// Multiplier restoring MSB alignment of samples stored in 16-bit words.
///
/// Low-bit-aligned 10-bit samples uploaded as 16-bit normalized textures come
/// back 64× too small (`2^(16 - 10)`). 8-bit and MSB-aligned samples need no
/// correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleShift {
    None,
    Six,
}

impl SampleShift {
    pub fn from_left_shift(left_shift: u8) -> Self {
        if left_shift == 0 {
            Self::None
        } else {
            Self::Six
        }
    }

    #[inline]
    pub fn factor(self) -> u8 {
        match self {
            Self::None => 1,
            Self::Six => 64,
        }
    }

    #[inline]
    pub fn vector(self) -> Vec3 {
        Vec3::splat(self.factor() as f32)
    }
}

/// Everything the fragment stage needs to convert one frame's samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionParams {
    pub standard: YuvStandard,
    pub range: ColorRange,
    pub matrix: ColorConversionMatrix,
    pub offset: Vec3,
    pub shift: SampleShift,
}

/// Precomputed matrices indexed by `standard × range`.
///
/// Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct ColorConversionTable {
    matrices: [[ColorConversionMatrix; 2]; 4],
}

impl ColorConversionTable {
    pub fn new() -> Self {
        let matrices = YuvStandard::ALL.map(|standard| {
            let (kr, kb) = standard.coefficients();
            let full = ColorConversionMatrix::from_coefficients(kr, kb);
            [full.limited(), full]
        });
        Self { matrices }
    }

    /// Matrix for an exact standard and range.
    #[inline]
    pub fn matrix_for(&self, standard: YuvStandard, range: ColorRange) -> ColorConversionMatrix {
        self.matrices[standard.index()][range_index(range)]
    }

    /// Conversion parameters for a frame's tags and sample alignment.
    pub fn select(&self, tag: YuvMatrix, range: ColorRange, left_shift: u8) -> ConversionParams {
        let standard = YuvStandard::from_matrix(tag);
        ConversionParams {
            standard,
            range,
            matrix: self.matrix_for(standard, range),
            offset: range_offset(range),
            shift: SampleShift::from_left_shift(left_shift),
        }
    }
}

impl Default for ColorConversionTable {
    fn default() -> Self {
        Self::new()
    }
}
