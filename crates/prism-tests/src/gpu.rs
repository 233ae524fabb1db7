//! Integration tests for the GPU subsystem.
//!
//! Exercises CPU-side logic only, no actual GPU required.

use prism_color::{range_offset, ColorConversionTable, SampleShift, YuvStandard};
use prism_core::{ColorRange, Frame, PixelFormat, ProjectionMode, Result, StereoMode, YuvMatrix};
use prism_gpu::bindings::slot;
use prism_gpu::uniforms::{ColorMatrixUniform, Vec3Uniform};
use prism_gpu::{
    FragmentBindings, FragmentVariant, InFlightPermits, PipelineCache, PipelineFactory, PipelineKey,
    TargetFormat, VertexPath,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const FORMATS: [PixelFormat; 7] = [
    PixelFormat::Bgra8,
    PixelFormat::Rgba8,
    PixelFormat::Rgba16,
    PixelFormat::Nv12,
    PixelFormat::P010,
    PixelFormat::Yuv420P,
    PixelFormat::Yuv420P10,
];

const PROJECTIONS: [ProjectionMode; 3] = [
    ProjectionMode::Plane,
    ProjectionMode::Sphere,
    ProjectionMode::Immersive,
];

#[derive(Default)]
struct CountingFactory {
    builds: AtomicUsize,
}

impl PipelineFactory for CountingFactory {
    type Pipeline = PipelineKey;

    fn build(&self, key: PipelineKey) -> Result<PipelineKey> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(1));
        Ok(key)
    }
}

#[test]
fn every_frame_maps_into_the_warmed_key_space() {
    let keys: Vec<_> = PipelineKey::all().collect();
    for format in FORMATS {
        let frame = Frame::new(32, 32, format);
        for projection in PROJECTIONS {
            let key = PipelineKey::for_frame(&frame, projection).unwrap();
            assert!(keys.contains(&key), "{key:?} not warmed");
        }
    }
}

#[test]
fn binding_plan_agrees_with_pipeline_key() {
    let table = ColorConversionTable::new();
    for format in FORMATS {
        let frame = Frame::new(32, 32, format);
        let key = PipelineKey::for_frame(&frame, ProjectionMode::Plane).unwrap();
        let plan = FragmentBindings::plan(&frame, &table, StereoMode::Mono, 0).unwrap();
        assert_eq!(plan.variant, key.fragment);
        assert_eq!(plan.conversion.is_some(), format.is_yuv());
        assert_eq!(
            key.target,
            if format.bit_depth() > 8 {
                TargetFormat::Deep
            } else {
                TargetFormat::Standard
            }
        );
    }
}

#[test]
fn nv12_709_limited_end_to_end() {
    let table = ColorConversionTable::new();
    let frame = Frame::new(1920, 1080, PixelFormat::Nv12)
        .with_colorimetry(YuvMatrix::Bt709, ColorRange::Limited);
    let plan = FragmentBindings::plan(&frame, &table, StereoMode::SideBySide, 41).unwrap();
    let key = PipelineKey::for_frame(&frame, ProjectionMode::Plane).unwrap();

    assert_eq!(key.fragment, FragmentVariant::BiPlanar);
    assert_eq!(key.vertex, VertexPath::Quad);
    assert_eq!(key.target, TargetFormat::Standard);
    assert_eq!(plan.plane_slots().collect::<Vec<_>>(), vec![slot::PLANE_BASE, slot::PLANE_BASE + 1]);

    let conversion = plan.conversion.unwrap();
    assert_eq!(
        ColorMatrixUniform::from_matrix(&conversion.matrix),
        ColorMatrixUniform::from_matrix(&table.matrix_for(YuvStandard::Bt709, ColorRange::Limited))
    );
    assert_eq!(
        Vec3Uniform::new(conversion.offset),
        Vec3Uniform::new(range_offset(ColorRange::Limited))
    );
    assert_eq!(Vec3Uniform::shift(conversion.shift).value, [1.0, 1.0, 1.0, 0.0]);
    assert_eq!(plan.custom.stereo_mode, 1);
    assert_eq!(plan.custom.frame_counter, 41);
}

#[test]
fn planar_ten_bit_sphere_end_to_end() {
    let table = ColorConversionTable::new();
    let frame = Frame::new(3840, 1920, PixelFormat::Yuv420P10)
        .with_colorimetry(YuvMatrix::Bt2020, ColorRange::Full);
    let plan = FragmentBindings::plan(&frame, &table, StereoMode::TopBottom, 0).unwrap();
    let key = PipelineKey::for_frame(&frame, ProjectionMode::Sphere).unwrap();

    assert_eq!(key.fragment, FragmentVariant::TriPlanar);
    assert_eq!(key.vertex, VertexPath::Sphere);
    assert_eq!(key.target, TargetFormat::Deep);
    let conversion = plan.conversion.unwrap();
    assert_eq!(conversion.shift, SampleShift::Six);
    assert_eq!(Vec3Uniform::shift(conversion.shift).value, [64.0, 64.0, 64.0, 0.0]);
    assert_eq!(conversion.offset, range_offset(ColorRange::Full));
}

#[test]
fn concurrent_lookups_build_each_pipeline_once() {
    let cache = PipelineCache::new(CountingFactory::default());
    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for key in PipelineKey::all() {
                    assert_eq!(*cache.pipeline_for(key).unwrap(), key);
                }
            });
        }
    });
    assert_eq!(cache.len(), 12);
    assert_eq!(cache.factory().builds.load(Ordering::SeqCst), 12);
}

#[test]
fn permits_bound_submissions_across_threads() {
    let permits = InFlightPermits::new(3);
    let peak = Arc::new(AtomicUsize::new(0));

    thread::scope(|scope| {
        for _ in 0..4 {
            let permits = permits.clone();
            let peak = Arc::clone(&peak);
            scope.spawn(move || {
                for _ in 0..10 {
                    let permit = permits.acquire();
                    peak.fetch_max(permits.outstanding(), Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(1));
                    drop(permit);
                }
            });
        }
    });

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(permits.outstanding(), 0);
}
