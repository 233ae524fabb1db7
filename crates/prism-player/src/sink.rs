//! Shader rendering path.

use prism_color::DisplayColorspace;
use prism_core::{Frame, ProjectionMode, Result, Size, StereoMode};
use prism_gpu::{DrawOutcome, DrawTarget, FrameRenderer, ImmersiveLayer, PoseProvider};
use tracing::{debug, info, trace};

/// Per-draw parameters the view resolves before handing a frame over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRequest {
    pub projection: ProjectionMode,
    pub stereo: StereoMode,
    /// Render target size in pixels.
    pub drawable_size: Size,
}

/// A surface the shader path draws into.
pub trait ShaderSink {
    fn set_visible(&mut self, visible: bool);

    /// Replace the displayed content with transparent pixels.
    fn clear(&mut self);

    fn draw(&mut self, frame: &Frame, request: &DrawRequest) -> Result<DrawOutcome>;
}

/// A colorspace or EDR change the surface should be retagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorspaceChange {
    pub colorspace: DisplayColorspace,
    pub extended_dynamic_range: bool,
}

/// Remembers the surface's colorspace so it is only retagged on change.
#[derive(Debug, Clone)]
pub struct ColorspaceTracker {
    current: DisplayColorspace,
    extended_dynamic_range: bool,
    display_headroom: f32,
}

impl ColorspaceTracker {
    /// `display_headroom` is the display's peak over SDR white (1.0 for SDR).
    pub fn new(display_headroom: f32) -> Self {
        Self {
            current: DisplayColorspace::Srgb,
            extended_dynamic_range: false,
            display_headroom,
        }
    }

    pub fn current(&self) -> DisplayColorspace {
        self.current
    }

    pub fn extended_dynamic_range(&self) -> bool {
        self.extended_dynamic_range
    }

    pub fn update(&mut self, frame: &Frame) -> Option<ColorspaceChange> {
        let colorspace = DisplayColorspace::for_frame(frame);
        let edr = colorspace.wants_extended_dynamic_range(self.display_headroom);
        if colorspace == self.current && edr == self.extended_dynamic_range {
            return None;
        }
        info!(
            from = self.current.name(),
            to = colorspace.name(),
            edr,
            "[video] surface colorspace changed"
        );
        self.current = colorspace;
        self.extended_dynamic_range = edr;
        Some(ColorspaceChange {
            colorspace,
            extended_dynamic_range: edr,
        })
    }

    /// Update from `frame` and retag `target` if the colorspace moved.
    pub fn apply(&mut self, frame: &Frame, target: &mut impl DrawTarget) -> Option<ColorspaceChange> {
        let change = self.update(frame)?;
        target.set_colorspace(change.colorspace, change.extended_dynamic_range);
        Some(change)
    }
}

/// The XR compositor and its pose source, when presenting immersively.
pub struct ImmersiveSession {
    pub layer: Box<dyn ImmersiveLayer>,
    pub poses: Box<dyn PoseProvider>,
}

/// Shader sink over a [`FrameRenderer`] and a window or offscreen target.
pub struct SurfaceView<T: DrawTarget> {
    renderer: FrameRenderer,
    target: T,
    immersive: Option<ImmersiveSession>,
    colorspace: ColorspaceTracker,
    visible: bool,
}

impl<T: DrawTarget> SurfaceView<T> {
    pub fn new(renderer: FrameRenderer, target: T, display_headroom: f32) -> Self {
        Self {
            renderer,
            target,
            immersive: None,
            colorspace: ColorspaceTracker::new(display_headroom),
            visible: false,
        }
    }

    /// Route immersive draws through `session` instead of the flat target.
    pub fn with_immersive(mut self, session: ImmersiveSession) -> Self {
        self.immersive = Some(session);
        self
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn renderer(&self) -> &FrameRenderer {
        &self.renderer
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn colorspace(&self) -> &ColorspaceTracker {
        &self.colorspace
    }
}

impl<T: DrawTarget> ShaderSink for SurfaceView<T> {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn clear(&mut self) {
        match self.target.next_drawable() {
            Some(drawable) => self.renderer.clear(drawable),
            None => trace!("no drawable to clear"),
        }
    }

    fn draw(&mut self, frame: &Frame, request: &DrawRequest) -> Result<DrawOutcome> {
        self.colorspace.apply(frame, &mut self.target);

        if request.projection == ProjectionMode::Immersive {
            if let Some(session) = self.immersive.as_mut() {
                return self.renderer.draw_immersive(
                    frame,
                    session.layer.as_mut(),
                    session.poses.as_ref(),
                    request.stereo,
                );
            }
            debug!("immersive projection without a session, drawing flat");
        }

        let (width, height) = request.drawable_size.to_pixels();
        let format = self.renderer.target_format_for(frame, request.projection)?;
        if self.target.size() != (width, height) || self.target.format() != format {
            debug!(width, height, ?format, "reconfiguring draw target");
            self.target.configure(width, height, format);
        }

        let Some(drawable) = self.target.next_drawable() else {
            trace!("no drawable available, skipping tick");
            return Ok(DrawOutcome::Skipped);
        };
        self.renderer
            .draw_flat(frame, drawable, request.projection, request.stereo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::{ColorPrimaries, PixelFormat, TransferCharacteristic};

    fn hdr_frame() -> Frame {
        let mut frame = Frame::new(64, 64, PixelFormat::P010);
        frame.primaries = ColorPrimaries::Bt2020;
        frame.transfer = TransferCharacteristic::Pq;
        frame
    }

    #[test]
    fn test_colorspace_reported_on_change_only() {
        let mut tracker = ColorspaceTracker::new(4.0);
        let sdr = Frame::new(64, 64, PixelFormat::Nv12);

        let change = tracker.update(&sdr).unwrap();
        assert_eq!(change.colorspace, DisplayColorspace::Bt709);
        assert!(change.extended_dynamic_range);
        assert!(tracker.update(&sdr).is_none());

        let change = tracker.update(&hdr_frame()).unwrap();
        assert_eq!(change.colorspace, DisplayColorspace::Bt2100Pq);
        assert!(tracker.update(&hdr_frame()).is_none());
    }

    #[derive(Default)]
    struct TaggedTarget {
        tags: Vec<(DisplayColorspace, bool)>,
    }

    impl DrawTarget for TaggedTarget {
        fn configure(&mut self, _width: u32, _height: u32, _format: wgpu::TextureFormat) {}
        fn next_drawable(&mut self) -> Option<prism_gpu::Drawable> {
            None
        }
        fn size(&self) -> (u32, u32) {
            (1, 1)
        }
        fn format(&self) -> wgpu::TextureFormat {
            wgpu::TextureFormat::Bgra8Unorm
        }
        fn set_colorspace(&mut self, colorspace: DisplayColorspace, extended_dynamic_range: bool) {
            self.tags.push((colorspace, extended_dynamic_range));
        }
    }

    #[test]
    fn test_pq_after_sdr_retags_target() {
        let mut tracker = ColorspaceTracker::new(4.0);
        let mut target = TaggedTarget::default();
        let sdr = Frame::new(64, 64, PixelFormat::Nv12);

        tracker.apply(&sdr, &mut target);
        tracker.apply(&sdr, &mut target);
        tracker.apply(&hdr_frame(), &mut target);
        tracker.apply(&hdr_frame(), &mut target);

        assert_eq!(
            target.tags,
            vec![
                (DisplayColorspace::Bt709, true),
                (DisplayColorspace::Bt2100Pq, true),
            ]
        );
    }

    #[test]
    fn test_no_edr_without_headroom() {
        let mut tracker = ColorspaceTracker::new(1.0);
        let change = tracker.update(&hdr_frame()).unwrap();
        assert!(!change.extended_dynamic_range);
        assert!(!tracker.extended_dynamic_range());
    }
}
