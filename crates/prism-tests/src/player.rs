//! Integration tests for the presentation loop.
//!
//! Drives a `VideoView` from a real `ThreadTicker` with in-memory sinks.

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use prism_core::{
    ContentMode, Frame, FrameSource, MediaTime, PixelFormat, PresenterOptions, Result, SharedFrame,
    Size, SurfaceId,
};
use prism_gpu::DrawOutcome;
use prism_player::{
    Cadence, CompositorLayer, CompositorLayerFactory, ControlTimebase, DrawRequest,
    FormatDescription, LayerStatus, PresentationPath, SampleBuffer, ShaderSink, ThreadTicker,
    TickReport, VideoView,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct Counters {
    enqueued: usize,
    drawn: usize,
    layers: usize,
}

type Shared = Arc<Mutex<Counters>>;

struct CountingSource {
    next: i64,
    limit: i64,
    surface_from: i64,
    shown: Vec<MediaTime>,
}

impl FrameSource for CountingSource {
    fn next_frame(&mut self, _force: bool) -> Option<SharedFrame> {
        if self.next >= self.limit {
            return None;
        }
        let mut frame = Frame::new(320, 180, PixelFormat::Nv12)
            .with_timing(MediaTime::from_frame_index(self.next, 50, 1), 50.0);
        if self.next >= self.surface_from {
            frame = frame.with_surface(SurfaceId(self.next as u64));
        }
        self.next += 1;
        Some(Arc::new(frame))
    }

    fn on_frame_shown(&mut self, pts: MediaTime) {
        self.shown.push(pts);
    }
}

struct Layer(Shared);

impl CompositorLayer for Layer {
    fn is_ready_for_more_media_data(&self) -> bool {
        true
    }
    fn enqueue(&mut self, _sample: SampleBuffer) {
        self.0.lock().enqueued += 1;
    }
    fn requires_flush_to_resume_decoding(&self) -> bool {
        false
    }
    fn status(&self) -> LayerStatus {
        LayerStatus::Rendering
    }
    fn flush(&mut self) {}
    fn flush_and_remove_image(&mut self) {}
    fn set_hidden(&mut self, _hidden: bool) {}
    fn set_content_mode(&mut self, _mode: ContentMode) {}
}

struct Factory(Shared);

impl CompositorLayerFactory for Factory {
    fn create(&mut self, _format: &FormatDescription, _timebase: Arc<ControlTimebase>) -> Box<dyn CompositorLayer> {
        self.0.lock().layers += 1;
        Box::new(Layer(Arc::clone(&self.0)))
    }
}

struct Shader(Shared);

impl ShaderSink for Shader {
    fn set_visible(&mut self, _visible: bool) {}
    fn clear(&mut self) {}
    fn draw(&mut self, _frame: &Frame, _request: &DrawRequest) -> Result<DrawOutcome> {
        self.0.lock().drawn += 1;
        Ok(DrawOutcome::Presented)
    }
}

struct Harness {
    view: VideoView<CountingSource>,
    ticks: Receiver<Instant>,
    counters: Shared,
}

impl Harness {
    fn new(options: PresenterOptions, limit: i64, surface_from: i64) -> Self {
        let counters = Shared::default();
        let (ticker, ticks) = ThreadTicker::spawn(Cadence::for_frame_rate(50.0));
        let source = CountingSource {
            next: 0,
            limit,
            surface_from,
            shown: Vec::new(),
        };
        let view = VideoView::new(
            options,
            source,
            Box::new(ticker),
            Box::new(Factory(Arc::clone(&counters))),
            Box::new(Shader(Arc::clone(&counters))),
        )
        .unwrap();
        Self {
            view,
            ticks,
            counters,
        }
    }

    /// Tick until the source runs dry. Returns every report.
    fn run(&mut self) -> Vec<TickReport> {
        let mut reports = vec![self.view.play().unwrap()];
        loop {
            self.ticks.recv_timeout(TICK_TIMEOUT).unwrap();
            let report = self.view.tick().unwrap();
            reports.push(report);
            if report == TickReport::NoFrame {
                return reports;
            }
        }
    }
}

const TICK_TIMEOUT: Duration = Duration::from_secs(2);

#[test]
fn ticker_drives_every_frame_to_screen() {
    let mut h = Harness::new(PresenterOptions::default(), 10, i64::MAX);
    let reports = h.run();

    assert_eq!(
        reports
            .iter()
            .filter(|r| **r == TickReport::Presented(PresentationPath::ShaderRender))
            .count(),
        10
    );
    assert_eq!(h.counters.lock().drawn, 10);
    assert_eq!(h.view.source().shown.len(), 10);
    assert!(h.view.source().shown.windows(2).all(|w| w[0] < w[1]));
    h.view.invalidate();
}

#[test]
fn stream_moves_to_compositor_when_surfaces_appear() {
    let mut h = Harness::new(PresenterOptions::default(), 8, 4);
    h.run();

    let counters = h.counters.lock();
    assert_eq!(counters.drawn, 4);
    assert_eq!(counters.enqueued, 4);
    assert_eq!(counters.layers, 1);
    assert_eq!(h.view.active_path(), Some(PresentationPath::HardwareComposite));
    assert!(h.view.hardware().has_image());
}

#[test]
fn options_from_json_keep_surfaces_on_shader_path() {
    let options =
        PresenterOptions::from_json_str(r#"{ "prefer_hardware_compositing": false }"#).unwrap();
    let mut h = Harness::new(options, 6, 0);
    h.run();

    let counters = h.counters.lock();
    assert_eq!(counters.drawn, 6);
    assert_eq!(counters.enqueued, 0);
    assert_eq!(counters.layers, 0);
}

#[test]
fn paused_view_ignores_ticks() {
    let mut h = Harness::new(PresenterOptions::default(), 10, i64::MAX);
    h.view.play().unwrap();
    h.view.pause();

    for _ in 0..3 {
        h.ticks.recv_timeout(TICK_TIMEOUT).unwrap();
        assert_eq!(h.view.tick().unwrap(), TickReport::Skipped);
    }
    assert_eq!(h.view.source().shown.len(), 1);
    assert_eq!(h.view.resize(Size::new(640.0, 640.0)).size.width, 640.0);
}
