//! The presenter: pulls frames on each tick and routes them to a sink.
//!
//! `VideoView` owns both sinks, the pacer and the display link. Everything
//! runs on the tick thread; the only state shared with other threads is the
//! GPU renderer's in-flight permit set.

use crate::composite::{CompositorLayerFactory, EnqueueOutcome, FormatDescription, HardwareCompositeSink};
use crate::pacer::{Cadence, DisplayLink, FramePacer, PacerState, TickAction};
use crate::path::{PathSelector, PathSwitch, PresentationPath};
use crate::sink::{DrawRequest, ShaderSink};
use prism_core::geometry::{drawable_size, override_sample_aspect};
use prism_core::{
    limits, AspectRatio, ContentMode, Frame, FrameSource, GeometryInputs, PresentationGeometry,
    PresenterOptions, Result, SharedFrame, Size,
};
use prism_gpu::DrawOutcome;
use tracing::{debug, info, trace};

/// Stream properties reported to the host whenever one of them changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProperties {
    pub frame_rate: f32,
    pub dovi: bool,
    pub format: FormatDescription,
}

impl VideoProperties {
    pub fn of(frame: &Frame) -> Self {
        Self {
            frame_rate: frame.fps,
            dovi: frame.dovi,
            format: FormatDescription::of(frame),
        }
    }
}

/// What a tick or lifecycle call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReport {
    /// Paused or invalidated; nothing fetched.
    Skipped,
    /// The source had no frame.
    NoFrame,
    Presented(PresentationPath),
    /// Fetched, but the sink could not take it this tick.
    Dropped(PresentationPath),
}

type PropertiesListener = Box<dyn FnMut(&VideoProperties) + Send>;
type GeometryListener = Box<dyn FnMut(&PresentationGeometry) + Send>;

pub struct VideoView<S: FrameSource> {
    options: PresenterOptions,
    source: S,
    link: Box<dyn DisplayLink>,
    pacer: FramePacer,
    selector: PathSelector,
    hardware: HardwareCompositeSink,
    shader: Box<dyn ShaderSink>,
    current: Option<SharedFrame>,
    bounds: Size,
    geometry_inputs: Option<GeometryInputs>,
    geometry: PresentationGeometry,
    properties: Option<VideoProperties>,
    properties_listener: Option<PropertiesListener>,
    geometry_listener: Option<GeometryListener>,
}

impl<S: FrameSource> VideoView<S> {
    pub fn new(
        options: PresenterOptions,
        source: S,
        mut link: Box<dyn DisplayLink>,
        compositor: Box<dyn CompositorLayerFactory>,
        shader: Box<dyn ShaderSink>,
    ) -> Result<Self> {
        options.validate()?;

        link.set_cadence(Cadence::for_frame_rate(limits::DEFAULT_FRAME_RATE));
        link.set_paused(true);

        let hardware = HardwareCompositeSink::new(
            compositor,
            options.compositor_backpressure,
            options.content_mode,
        );

        info!(
            prefer_hardware = options.prefer_hardware_compositing,
            projection = ?options.projection,
            stereo = ?options.stereo,
            "video view created"
        );

        Ok(Self {
            selector: PathSelector::new(options.prefer_hardware_compositing),
            options,
            source,
            link,
            pacer: FramePacer::new(),
            hardware,
            shader,
            current: None,
            bounds: Size::ZERO,
            geometry_inputs: None,
            geometry: PresentationGeometry::default(),
            properties: None,
            properties_listener: None,
            geometry_listener: None,
        })
    }

    pub fn options(&self) -> &PresenterOptions {
        &self.options
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> PacerState {
        self.pacer.state()
    }

    pub fn active_path(&self) -> Option<PresentationPath> {
        self.selector.active()
    }

    /// The frame last handed to a sink.
    pub fn current_frame(&self) -> Option<&SharedFrame> {
        self.current.as_ref()
    }

    /// On-screen layout for the current frame inside the view bounds.
    pub fn geometry(&self) -> PresentationGeometry {
        self.geometry
    }

    pub fn hardware(&self) -> &HardwareCompositeSink {
        &self.hardware
    }

    pub fn set_properties_listener(&mut self, listener: impl FnMut(&VideoProperties) + Send + 'static) {
        self.properties_listener = Some(Box::new(listener));
    }

    pub fn set_geometry_listener(&mut self, listener: impl FnMut(&PresentationGeometry) + Send + 'static) {
        self.geometry_listener = Some(Box::new(listener));
    }

    /// Called with the new generation whenever the compositor layer is rebuilt.
    pub fn set_layer_listener(&mut self, listener: impl FnMut(u64) + Send + 'static) {
        self.hardware.set_layer_listener(listener);
    }

    pub fn play(&mut self) -> Result<TickReport> {
        let action = self.pacer.play();
        if action != TickAction::Skip {
            self.link.set_paused(false);
        }
        self.run(action)
    }

    /// Stop advancing. The last frame stays on screen.
    pub fn pause(&mut self) {
        self.pacer.pause();
    }

    /// Display link callback.
    pub fn tick(&mut self) -> Result<TickReport> {
        let action = self.pacer.on_tick();
        self.run(action)
    }

    /// Fetch and present a frame now, even while paused.
    pub fn read_next_frame(&mut self) -> Result<TickReport> {
        let action = self.pacer.read_next_frame();
        self.run(action)
    }

    pub fn resize(&mut self, bounds: Size) -> PresentationGeometry {
        self.bounds = bounds;
        if let Some(mut inputs) = self.geometry_inputs {
            inputs.bounds = bounds;
            self.apply_geometry(inputs);
        }
        self.geometry
    }

    pub fn set_content_mode(&mut self, mode: ContentMode) {
        self.options.content_mode = mode;
        self.hardware.set_content_mode(mode);
        if let Some(mut inputs) = self.geometry_inputs {
            inputs.content_mode = mode;
            self.apply_geometry(inputs);
        }
    }

    /// Stop the display link for good. Pending GPU work drains on its own.
    pub fn invalidate(&mut self) {
        if self.pacer.state() == PacerState::Invalidated {
            return;
        }
        self.pacer.invalidate();
        self.link.invalidate();
        info!("video view invalidated");
    }

    /// Remove whatever either sink is showing.
    pub fn flush(&mut self) {
        self.hardware.flush();
        self.shader.clear();
        self.current = None;
    }

    fn run(&mut self, action: TickAction) -> Result<TickReport> {
        match action {
            TickAction::Skip => Ok(TickReport::Skipped),
            TickAction::Fetch { force } => self.draw(force),
        }
    }

    fn draw(&mut self, force: bool) -> Result<TickReport> {
        let Some(frame) = self.source.next_frame(force) else {
            trace!(force, "no frame available");
            return Ok(TickReport::NoFrame);
        };

        if let Some(cadence) = self.pacer.observe_frame_rate(frame.fps) {
            self.link.set_cadence(cadence);
        }
        self.update_properties(&frame);
        self.update_geometry(&frame);

        let decision = self.selector.decide(&frame);
        if let Some(switch) = decision.switch {
            self.switch_path(switch);
        }

        let path = decision.path;
        let presented = match path {
            PresentationPath::HardwareComposite => {
                let aspect = hardware_sample_aspect(&frame, self.options.display_aspect_override);
                self.hardware.enqueue(&frame, aspect) == EnqueueOutcome::Submitted
            }
            PresentationPath::ShaderRender => {
                let request = self.draw_request(&frame);
                self.shader.draw(&frame, &request)? == DrawOutcome::Presented
            }
        };

        if !presented {
            return Ok(TickReport::Dropped(path));
        }
        self.source.on_frame_shown(frame.pts);
        self.current = Some(frame);
        Ok(TickReport::Presented(path))
    }

    fn draw_request(&self, frame: &Frame) -> DrawRequest {
        DrawRequest {
            projection: self.options.projection,
            stereo: self.options.stereo,
            drawable_size: drawable_size(
                frame.par(),
                frame.sar,
                self.options.display_aspect_override,
                self.options.projection,
                self.options.scene_size,
            ),
        }
    }

    /// Hide the old sink before showing the new one, then flush the old one.
    fn switch_path(&mut self, switch: PathSwitch) {
        match switch.to {
            PresentationPath::HardwareComposite => {
                self.shader.set_visible(false);
                self.hardware.set_visible(true);
                if switch.from.is_some() {
                    self.shader.clear();
                }
            }
            PresentationPath::ShaderRender => {
                self.hardware.set_visible(false);
                self.shader.set_visible(true);
                if switch.from.is_some() {
                    self.hardware.flush();
                }
            }
        }
        info!(from = ?switch.from, to = ?switch.to, "[video] presentation path switched");
    }

    fn update_properties(&mut self, frame: &Frame) {
        let properties = VideoProperties::of(frame);
        if self.properties == Some(properties) {
            return;
        }
        debug!(
            fps = properties.frame_rate,
            dovi = properties.dovi,
            width = frame.width,
            height = frame.height,
            "video properties changed"
        );
        self.properties = Some(properties);
        if let Some(listener) = self.properties_listener.as_mut() {
            listener(&properties);
        }
    }

    fn update_geometry(&mut self, frame: &Frame) {
        self.apply_geometry(GeometryInputs {
            par: frame.par(),
            sar: frame.sar,
            display_aspect_override: self.options.display_aspect_override,
            bounds: self.bounds,
            content_mode: self.options.content_mode,
        });
    }

    fn apply_geometry(&mut self, inputs: GeometryInputs) {
        if self.geometry_inputs == Some(inputs) {
            return;
        }
        self.geometry_inputs = Some(inputs);
        self.geometry = PresentationGeometry::compute(&inputs);
        if let Some(listener) = self.geometry_listener.as_mut() {
            listener(&self.geometry);
        }
    }
}

/// The sample aspect the hardware path attaches for `frame`.
pub fn hardware_sample_aspect(frame: &Frame, dar_override: Option<AspectRatio>) -> AspectRatio {
    match dar_override {
        Some(dar) => override_sample_aspect(frame.par(), dar),
        None => frame.sar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::{CompositorLayer, LayerStatus, SampleBuffer};
    use crate::timebase::ControlTimebase;
    use parking_lot::Mutex;
    use prism_core::{MediaTime, PixelFormat, ProjectionMode, SurfaceId};
    use std::collections::VecDeque;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        LinkCadence(Cadence),
        LinkPaused(bool),
        LinkInvalidated,
        LayerHidden(bool),
        LayerEnqueue(SampleBuffer),
        LayerRemoveImage,
        ShaderVisible(bool),
        ShaderClear,
        ShaderDraw(DrawRequest),
    }

    type Log = Arc<Mutex<Vec<Event>>>;

    struct TestSource {
        frames: VecDeque<SharedFrame>,
        shown: Arc<Mutex<Vec<MediaTime>>>,
    }

    impl FrameSource for TestSource {
        fn next_frame(&mut self, _force: bool) -> Option<SharedFrame> {
            self.frames.pop_front()
        }

        fn on_frame_shown(&mut self, pts: MediaTime) {
            self.shown.lock().push(pts);
        }
    }

    struct TestLink(Log);

    impl DisplayLink for TestLink {
        fn set_cadence(&mut self, cadence: Cadence) {
            self.0.lock().push(Event::LinkCadence(cadence));
        }
        fn set_paused(&mut self, paused: bool) {
            self.0.lock().push(Event::LinkPaused(paused));
        }
        fn invalidate(&mut self) {
            self.0.lock().push(Event::LinkInvalidated);
        }
    }

    struct TestLayer(Log);

    impl CompositorLayer for TestLayer {
        fn is_ready_for_more_media_data(&self) -> bool {
            true
        }
        fn enqueue(&mut self, sample: SampleBuffer) {
            self.0.lock().push(Event::LayerEnqueue(sample));
        }
        fn requires_flush_to_resume_decoding(&self) -> bool {
            false
        }
        fn status(&self) -> LayerStatus {
            LayerStatus::Rendering
        }
        fn flush(&mut self) {}
        fn flush_and_remove_image(&mut self) {
            self.0.lock().push(Event::LayerRemoveImage);
        }
        fn set_hidden(&mut self, hidden: bool) {
            self.0.lock().push(Event::LayerHidden(hidden));
        }
        fn set_content_mode(&mut self, _mode: ContentMode) {}
    }

    struct TestFactory(Log);

    impl CompositorLayerFactory for TestFactory {
        fn create(
            &mut self,
            _format: &FormatDescription,
            _timebase: Arc<ControlTimebase>,
        ) -> Box<dyn CompositorLayer> {
            Box::new(TestLayer(Arc::clone(&self.0)))
        }
    }

    struct TestShader {
        log: Log,
        outcome: Arc<Mutex<DrawOutcome>>,
    }

    impl ShaderSink for TestShader {
        fn set_visible(&mut self, visible: bool) {
            self.log.lock().push(Event::ShaderVisible(visible));
        }
        fn clear(&mut self) {
            self.log.lock().push(Event::ShaderClear);
        }
        fn draw(&mut self, _frame: &Frame, request: &DrawRequest) -> Result<DrawOutcome> {
            self.log.lock().push(Event::ShaderDraw(*request));
            Ok(*self.outcome.lock())
        }
    }

    struct Harness {
        view: VideoView<TestSource>,
        log: Log,
        shown: Arc<Mutex<Vec<MediaTime>>>,
        shader_outcome: Arc<Mutex<DrawOutcome>>,
    }

    impl Harness {
        fn new(options: PresenterOptions, frames: Vec<Frame>) -> Self {
            let log: Log = Arc::default();
            let shown = Arc::default();
            let shader_outcome = Arc::new(Mutex::new(DrawOutcome::Presented));
            let source = TestSource {
                frames: frames.into_iter().map(Arc::new).collect(),
                shown: Arc::clone(&shown),
            };
            let view = VideoView::new(
                options,
                source,
                Box::new(TestLink(Arc::clone(&log))),
                Box::new(TestFactory(Arc::clone(&log))),
                Box::new(TestShader {
                    log: Arc::clone(&log),
                    outcome: Arc::clone(&shader_outcome),
                }),
            )
            .unwrap();
            Self {
                view,
                log,
                shown,
                shader_outcome,
            }
        }

        fn events(&self) -> Vec<Event> {
            self.log.lock().clone()
        }

        fn clear_log(&self) {
            self.log.lock().clear();
        }
    }

    fn frame(index: i64) -> Frame {
        Frame::new(64, 64, PixelFormat::Nv12).with_timing(MediaTime::new(index, 30), 30.0)
    }

    fn surface_frame(index: i64) -> Frame {
        frame(index).with_surface(SurfaceId(index as u64))
    }

    #[test]
    fn test_play_forces_draw_and_starts_link() {
        let mut h = Harness::new(PresenterOptions::default(), vec![frame(0)]);
        assert_eq!(h.view.tick().unwrap(), TickReport::Skipped);

        let report = h.view.play().unwrap();
        assert_eq!(report, TickReport::Presented(PresentationPath::ShaderRender));
        assert!(h.events().contains(&Event::LinkPaused(false)));
        assert_eq!(*h.shown.lock(), vec![MediaTime::new(0, 30)]);
    }

    #[test]
    fn test_cadence_follows_frame_rate() {
        let mut h = Harness::new(PresenterOptions::default(), vec![frame(0), frame(1)]);
        h.clear_log();
        h.view.play().unwrap();
        h.view.tick().unwrap();
        let cadences: Vec<_> = h
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::LinkCadence(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(cadences.len(), 1);
        assert_eq!(cadences[0].preferred, 60);
    }

    #[test]
    fn test_no_frame_is_not_shown() {
        let mut h = Harness::new(PresenterOptions::default(), vec![]);
        assert_eq!(h.view.play().unwrap(), TickReport::NoFrame);
        assert!(h.shown.lock().is_empty());
        assert!(h.view.current_frame().is_none());
    }

    #[test]
    fn test_skipped_draw_is_dropped() {
        let mut h = Harness::new(PresenterOptions::default(), vec![frame(0)]);
        *h.shader_outcome.lock() = DrawOutcome::Skipped;
        assert_eq!(
            h.view.play().unwrap(),
            TickReport::Dropped(PresentationPath::ShaderRender)
        );
        assert!(h.shown.lock().is_empty());
    }

    #[test]
    fn test_pause_leaves_content() {
        let mut h = Harness::new(PresenterOptions::default(), vec![frame(0), frame(1), frame(2)]);
        h.view.play().unwrap();
        h.view.pause();
        h.clear_log();

        assert_eq!(h.view.tick().unwrap(), TickReport::Skipped);
        assert_eq!(h.view.tick().unwrap(), TickReport::Skipped);
        assert!(h.events().is_empty());
        assert_eq!(h.view.current_frame().unwrap().pts, MediaTime::new(0, 30));

        // Still fetches on demand while paused.
        assert_eq!(
            h.view.read_next_frame().unwrap(),
            TickReport::Presented(PresentationPath::ShaderRender)
        );
    }

    #[test]
    fn test_alternating_frames_never_show_both_sinks() {
        let frames = (0..8)
            .map(|i| if i % 2 == 0 { surface_frame(i) } else { frame(i) })
            .collect();
        let mut h = Harness::new(PresenterOptions::default(), frames);
        h.view.play().unwrap();
        for _ in 0..7 {
            h.view.tick().unwrap();
        }

        let (mut hardware, mut shader) = (false, false);
        let mut clears = 0;
        let mut removals = 0;
        for event in h.events() {
            match event {
                Event::LayerHidden(hidden) => hardware = !hidden,
                Event::ShaderVisible(visible) => shader = visible,
                Event::ShaderClear => clears += 1,
                Event::LayerRemoveImage => removals += 1,
                _ => {}
            }
            assert!(!(hardware && shader), "both sinks visible");
        }
        // Every switch after the first flushes the path being left.
        assert_eq!(clears, 3);
        assert_eq!(removals, 4);
        assert_eq!(h.shown.lock().len(), 8);
    }

    #[test]
    fn test_hardware_path_uses_override_aspect() {
        let options = PresenterOptions {
            display_aspect_override: Some(AspectRatio::new(16.0, 9.0)),
            ..Default::default()
        };
        let f = Frame::new(1440, 1080, PixelFormat::Nv12).with_surface(SurfaceId(9));
        let mut h = Harness::new(options, vec![f]);
        h.view.play().unwrap();

        let sample = h
            .events()
            .into_iter()
            .find_map(|e| match e {
                Event::LayerEnqueue(s) => Some(s),
                _ => None,
            })
            .unwrap();
        assert_eq!(sample.sample_aspect.width, 16.0);
        assert!((sample.sample_aspect.height - 12.0).abs() < 1e-4);
        assert!(sample.display_immediately);
    }

    #[test]
    fn test_shader_request_uses_sample_aspect() {
        let f = Frame::new(720, 480, PixelFormat::Nv12).with_sar(AspectRatio::new(32.0, 27.0));
        let mut h = Harness::new(PresenterOptions::default(), vec![f]);
        h.view.play().unwrap();

        let request = h
            .events()
            .into_iter()
            .find_map(|e| match e {
                Event::ShaderDraw(r) => Some(r),
                _ => None,
            })
            .unwrap();
        assert_eq!(request.projection, ProjectionMode::Plane);
        assert_eq!(request.drawable_size.width, 720.0);
        assert!((request.drawable_size.height - 405.0).abs() < 0.01);
    }

    #[test]
    fn test_properties_reported_on_change() {
        let mut dovi = frame(2);
        dovi.dovi = true;
        let mut h = Harness::new(PresenterOptions::default(), vec![frame(0), frame(1), dovi]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        h.view.set_properties_listener(move |p| sink.lock().push(*p));

        h.view.play().unwrap();
        h.view.tick().unwrap();
        h.view.tick().unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(!seen[0].dovi);
        assert!(seen[1].dovi);
    }

    #[test]
    fn test_resize_recomputes_geometry() {
        let f = Frame::new(1920, 1080, PixelFormat::Nv12);
        let mut h = Harness::new(PresenterOptions::default(), vec![f]);
        h.view.play().unwrap();

        let geometry = h.view.resize(Size::new(1000.0, 1000.0));
        assert_eq!(geometry.size.width, 1000.0);
        assert!((geometry.size.height - 562.5).abs() < 0.01);
        assert_eq!(h.view.geometry(), geometry);
    }

    #[test]
    fn test_flush_clears_both_sinks() {
        let mut h = Harness::new(PresenterOptions::default(), vec![surface_frame(0)]);
        h.view.play().unwrap();
        h.clear_log();

        h.view.flush();
        h.view.flush();
        let events = h.events();
        assert_eq!(
            events.iter().filter(|e| **e == Event::LayerRemoveImage).count(),
            2
        );
        assert_eq!(events.iter().filter(|e| **e == Event::ShaderClear).count(), 2);
        assert!(!h.view.hardware().has_image());
        assert!(h.view.current_frame().is_none());
    }

    #[test]
    fn test_invalidate_is_terminal() {
        let mut h = Harness::new(PresenterOptions::default(), vec![frame(0)]);
        h.view.invalidate();
        h.view.invalidate();
        assert_eq!(
            h.events()
                .iter()
                .filter(|e| **e == Event::LinkInvalidated)
                .count(),
            1
        );
        assert_eq!(h.view.play().unwrap(), TickReport::Skipped);
        assert_eq!(h.view.read_next_frame().unwrap(), TickReport::Skipped);
        assert!(h.shown.lock().is_empty());
    }

    #[test]
    fn test_rejects_invalid_options() {
        let options = PresenterOptions {
            max_in_flight: 0,
            ..Default::default()
        };
        let log: Log = Arc::default();
        let result = VideoView::new(
            options,
            TestSource {
                frames: VecDeque::new(),
                shown: Arc::default(),
            },
            Box::new(TestLink(Arc::clone(&log))),
            Box::new(TestFactory(Arc::clone(&log))),
            Box::new(TestShader {
                log,
                outcome: Arc::new(Mutex::new(DrawOutcome::Presented)),
            }),
        );
        assert!(result.is_err());
    }
}
