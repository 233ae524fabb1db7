//! Prism - headless presentation demo
//!
//! Drives a `VideoView` from a timer thread with synthetic frames. The shader
//! path renders into an offscreen texture; surface-backed frames go to a
//! stand-in compositor layer.
//!
//! Usage: `prism [options.json] [frame-count]`

mod compositor;
mod headset;
mod source;

use anyhow::{Context, Result};
use compositor::HeadlessCompositor;
use headset::{HeadlessHeadset, SeatedPose};
use prism_core::{limits, PresenterOptions, Size};
use prism_gpu::{FrameRenderer, GpuContext, OffscreenTarget, OutputFormats, RenderRegistry};
use prism_player::{
    Cadence, ImmersiveSession, PresentationPath, SurfaceView, ThreadTicker, TickReport, VideoView,
};
use source::SyntheticSource;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_FRAMES: u64 = 240;
const TICK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
struct RunStats {
    hardware: u64,
    shader: u64,
    dropped: u64,
    failed: u64,
    idle: u64,
}

impl RunStats {
    fn record(&mut self, report: TickReport) {
        match report {
            TickReport::Presented(PresentationPath::HardwareComposite) => self.hardware += 1,
            TickReport::Presented(PresentationPath::ShaderRender) => self.shader += 1,
            TickReport::Dropped(_) => self.dropped += 1,
            TickReport::NoFrame | TickReport::Skipped => self.idle += 1,
        }
    }

    /// Count a tick's outcome. Per-frame failures are logged and counted;
    /// only fatal errors stop the run.
    fn absorb(&mut self, tick: prism_core::Result<TickReport>) -> prism_core::Result<()> {
        match tick {
            Ok(report) => self.record(report),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!("frame not presented: {err}");
                self.failed += 1;
            }
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Prism starting...");

    let options = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read options from {path}"))?;
            PresenterOptions::from_json_str(&json)?
        }
        None => PresenterOptions::default(),
    };
    let frame_count = match std::env::args().nth(2) {
        Some(n) => n.parse().context("frame count must be a number")?,
        None => DEFAULT_FRAMES,
    };

    let context = GpuContext::new_blocking()?;
    info!(adapter = %context.adapter_info().name, "GPU ready");
    let device = Arc::clone(&context.device);
    let preferred = OutputFormats::default();
    let formats = OutputFormats::resolve(&context.renderable_formats(&[preferred.standard, preferred.deep]))?;
    let registry = RenderRegistry::new(context, formats)?;

    let renderer = FrameRenderer::new(Arc::clone(&registry), options.max_in_flight);
    let target = OffscreenTarget::new(Arc::clone(&device), 1, 1, registry.formats().standard);
    let mut shader = SurfaceView::new(renderer, target, 1.0);
    if options.is_immersive() {
        let (width, height) = options.scene_size.to_pixels();
        let eyes = OffscreenTarget::new(device, width, height, registry.formats().standard);
        shader = shader.with_immersive(ImmersiveSession {
            layer: Box::new(HeadlessHeadset::new(eyes)),
            poses: Box::new(SeatedPose),
        });
        info!(width, height, "immersive output enabled");
    }

    let (ticker, ticks) = ThreadTicker::spawn(Cadence::for_frame_rate(limits::DEFAULT_FRAME_RATE));
    let source = SyntheticSource::new(1280, 720, 30, 1, frame_count).with_surface_runs(60);

    let mut view = VideoView::new(
        options,
        source,
        Box::new(ticker),
        Box::new(HeadlessCompositor),
        Box::new(shader),
    )?;
    view.set_layer_listener(|generation| info!(generation, "compositor layer replaced"));
    view.set_properties_listener(|p| {
        info!(
            fps = p.frame_rate,
            dovi = p.dovi,
            width = p.format.width,
            height = p.format.height,
            "video properties"
        )
    });
    view.resize(Size::new(1280.0, 720.0));

    let mut stats = RunStats::default();
    stats.record(view.play()?);

    while !view.source().is_exhausted() {
        ticks
            .recv_timeout(TICK_TIMEOUT)
            .context("display link stopped ticking")?;
        stats.absorb(view.tick())?;
    }

    view.invalidate();

    if stats.dropped > 0 || stats.failed > 0 {
        warn!(dropped = stats.dropped, failed = stats.failed, "frames were not shown");
    }
    info!(
        shown = view.source().shown(),
        hardware = stats.hardware,
        shader = stats.shader,
        idle = stats.idle,
        "Prism finished"
    );

    Ok(())
}
