//! Integration tests for conversion parameter selection.
//!
//! Evaluates the fragment stage's `matrix × (sample × shift + offset)` on the
//! CPU with parameters chosen for real frames.

use glam::Vec3;
use prism_color::{ColorConversionTable, ConversionParams, SampleShift, YuvStandard};
use prism_core::{ColorRange, Frame, PixelFormat, YuvMatrix};

fn convert(params: &ConversionParams, sample: Vec3) -> Vec3 {
    let rgb = params.matrix.to_mat3() * (sample * params.shift.vector() + params.offset);
    rgb.clamp(Vec3::ZERO, Vec3::ONE)
}

fn params_for(frame: &Frame) -> ConversionParams {
    ColorConversionTable::new().select(frame.yuv_matrix, frame.range, frame.left_shift())
}

fn assert_rgb(actual: Vec3, expected: Vec3, tolerance: f32) {
    assert!(
        (actual - expected).abs().max_element() < tolerance,
        "expected {expected:?}, got {actual:?}"
    );
}

const TAGS: [YuvMatrix; 4] = [
    YuvMatrix::Bt601,
    YuvMatrix::Bt709,
    YuvMatrix::Smpte240M,
    YuvMatrix::Bt2020,
];

#[test]
fn limited_range_black_and_white_for_every_standard() {
    for tag in TAGS {
        let frame = Frame::new(16, 16, PixelFormat::Nv12).with_colorimetry(tag, ColorRange::Limited);
        let params = params_for(&frame);
        let black = Vec3::new(16.0, 128.0, 128.0) / 255.0;
        let white = Vec3::new(235.0, 128.0, 128.0) / 255.0;
        assert_rgb(convert(&params, black), Vec3::ZERO, 1e-4);
        assert_rgb(convert(&params, white), Vec3::ONE, 1e-4);
    }
}

#[test]
fn full_range_black_and_white_for_every_standard() {
    for tag in TAGS {
        let frame = Frame::new(16, 16, PixelFormat::Nv12).with_colorimetry(tag, ColorRange::Full);
        let params = params_for(&frame);
        let neutral = 128.0 / 255.0;
        assert_rgb(convert(&params, Vec3::new(0.0, neutral, neutral)), Vec3::ZERO, 1e-4);
        assert_rgb(convert(&params, Vec3::new(1.0, neutral, neutral)), Vec3::ONE, 1e-4);
    }
}

#[test]
fn bt709_limited_red_primary() {
    // 8-bit BT.709 limited-range red: Y 63, Cb 102, Cr 240
    let frame = Frame::new(16, 16, PixelFormat::Nv12)
        .with_colorimetry(YuvMatrix::Bt709, ColorRange::Limited);
    let rgb = convert(&params_for(&frame), Vec3::new(63.0, 102.0, 240.0) / 255.0);
    assert_rgb(rgb, Vec3::new(1.0, 0.0, 0.0), 0.01);
}

#[test]
fn untagged_frames_use_bt601() {
    let table = ColorConversionTable::new();
    let frame = Frame::new(16, 16, PixelFormat::Yuv420P);
    let params = params_for(&frame);
    assert_eq!(params.standard, YuvStandard::Bt601);
    assert_eq!(
        params.matrix,
        table.matrix_for(YuvStandard::Bt601, ColorRange::Limited)
    );
}

#[test]
fn low_bit_aligned_ten_bit_white_needs_shift() {
    let frame = Frame::new(16, 16, PixelFormat::Yuv420P10)
        .with_colorimetry(YuvMatrix::Bt2020, ColorRange::Limited);
    let params = params_for(&frame);
    assert_eq!(params.shift, SampleShift::Six);

    // 10-bit code values in the low bits of a 16-bit unorm texel.
    let white = Vec3::new(940.0, 512.0, 512.0) / 65535.0;
    assert_rgb(convert(&params, white), Vec3::ONE, 0.02);

    let unshifted = ConversionParams {
        shift: SampleShift::None,
        ..params
    };
    let dim = convert(&unshifted, white);
    assert!(dim.x < 0.01, "unshifted white came out {dim:?}");
}

#[test]
fn msb_aligned_ten_bit_white_needs_no_shift() {
    let frame = Frame::new(16, 16, PixelFormat::P010)
        .with_colorimetry(YuvMatrix::Bt2020, ColorRange::Limited);
    let params = params_for(&frame);
    assert_eq!(params.shift, SampleShift::None);

    let white = Vec3::new(940.0 * 64.0, 512.0 * 64.0, 512.0 * 64.0) / 65535.0;
    assert_rgb(convert(&params, white), Vec3::ONE, 0.02);
}
