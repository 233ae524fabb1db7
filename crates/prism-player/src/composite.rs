//! Hardware compositing path.
//!
//! Frames backed by a shared surface are wrapped in a sample buffer and
//! enqueued on a platform display layer, which composites them without
//! touching the pixels. The layer is rebuilt, not reconfigured, when the
//! stream's format changes.

use crate::timebase::ControlTimebase;
use prism_core::{
    AspectRatio, ColorPrimaries, ColorRange, CompositorBackpressure, ContentMode, Frame,
    MediaTime, PixelFormat, SurfaceId, TransferCharacteristic, YuvMatrix,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Health of the compositor layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerStatus {
    Unknown,
    Rendering,
    Failed,
}

/// Everything a layer is configured for. A change means a new layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatDescription {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub yuv_matrix: YuvMatrix,
    pub range: ColorRange,
    pub primaries: ColorPrimaries,
    pub transfer: TransferCharacteristic,
}

impl FormatDescription {
    pub fn of(frame: &Frame) -> Self {
        Self {
            format: frame.format,
            width: frame.width,
            height: frame.height,
            yuv_matrix: frame.yuv_matrix,
            range: frame.range,
            primaries: frame.primaries,
            transfer: frame.transfer,
        }
    }
}

/// One image submitted to the compositor.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub surface: SurfaceId,
    pub format: FormatDescription,
    pub pts: MediaTime,
    pub sample_aspect: AspectRatio,
    /// Show as soon as possible instead of waiting for `pts` on the timebase.
    pub display_immediately: bool,
}

/// The platform's sample-buffer display layer.
pub trait CompositorLayer: Send {
    fn is_ready_for_more_media_data(&self) -> bool;

    fn enqueue(&mut self, sample: SampleBuffer);

    fn requires_flush_to_resume_decoding(&self) -> bool;

    fn status(&self) -> LayerStatus;

    /// Drop queued samples, keeping the displayed image.
    fn flush(&mut self);

    /// Drop queued samples and the displayed image.
    fn flush_and_remove_image(&mut self);

    fn set_hidden(&mut self, hidden: bool);

    fn set_content_mode(&mut self, mode: ContentMode);
}

pub trait CompositorLayerFactory: Send {
    fn create(
        &mut self,
        format: &FormatDescription,
        timebase: Arc<ControlTimebase>,
    ) -> Box<dyn CompositorLayer>;
}

/// What happened to a frame handed to [`HardwareCompositeSink::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Submitted,
    /// Layer not ready and the policy drops in that case.
    Dropped,
    /// The frame has no shared surface to composite.
    NoSurface,
}

type LayerListener = Box<dyn FnMut(u64) + Send>;

pub struct HardwareCompositeSink {
    factory: Box<dyn CompositorLayerFactory>,
    layer: Option<Box<dyn CompositorLayer>>,
    format: Option<FormatDescription>,
    timebase: Arc<ControlTimebase>,
    backpressure: CompositorBackpressure,
    content_mode: ContentMode,
    hidden: bool,
    generation: u64,
    has_image: bool,
    layer_listener: Option<LayerListener>,
}

impl HardwareCompositeSink {
    pub fn new(
        factory: Box<dyn CompositorLayerFactory>,
        backpressure: CompositorBackpressure,
        content_mode: ContentMode,
    ) -> Self {
        Self {
            factory,
            layer: None,
            format: None,
            timebase: Arc::new(ControlTimebase::new()),
            backpressure,
            content_mode,
            hidden: true,
            generation: 0,
            has_image: false,
            layer_listener: None,
        }
    }

    pub fn timebase(&self) -> &Arc<ControlTimebase> {
        &self.timebase
    }

    /// Number of layers built so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_image(&self) -> bool {
        self.has_image
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Called with the new generation whenever the layer is replaced.
    pub fn set_layer_listener(&mut self, listener: impl FnMut(u64) + Send + 'static) {
        self.layer_listener = Some(Box::new(listener));
    }

    pub fn enqueue(&mut self, frame: &Frame, sample_aspect: AspectRatio) -> EnqueueOutcome {
        let Some(surface) = frame.surface else {
            warn!("[video] frame without shared surface sent to compositor");
            return EnqueueOutcome::NoSurface;
        };

        let format = FormatDescription::of(frame);
        let backpressure = self.backpressure;
        let layer = self.layer_for(format);

        if !layer.is_ready_for_more_media_data() {
            match backpressure {
                CompositorBackpressure::BestEffort => {
                    debug!("[video] layer not ready for more media data, enqueueing anyway");
                }
                CompositorBackpressure::DropWhenNotReady => {
                    debug!("[video] layer not ready for more media data, dropping frame");
                    return EnqueueOutcome::Dropped;
                }
            }
        }

        layer.enqueue(SampleBuffer {
            surface,
            format,
            pts: frame.pts,
            sample_aspect,
            display_immediately: true,
        });

        if layer.requires_flush_to_resume_decoding() {
            warn!("[video] layer requires flush to resume decoding, flushing");
            layer.flush();
        } else if layer.status() == LayerStatus::Failed {
            warn!("[video] layer failed, flushing");
            layer.flush();
        }

        self.has_image = true;
        EnqueueOutcome::Submitted
    }

    /// Remove the displayed image and anything queued. Safe to repeat.
    pub fn flush(&mut self) {
        if let Some(layer) = self.layer.as_mut() {
            layer.flush_and_remove_image();
        }
        self.has_image = false;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.hidden = !visible;
        if let Some(layer) = self.layer.as_mut() {
            layer.set_hidden(self.hidden);
        }
    }

    pub fn set_content_mode(&mut self, mode: ContentMode) {
        self.content_mode = mode;
        if let Some(layer) = self.layer.as_mut() {
            layer.set_content_mode(mode);
        }
    }

    /// The current layer, rebuilt first when `format` differs from the one
    /// it was created for.
    fn layer_for(&mut self, format: FormatDescription) -> &mut Box<dyn CompositorLayer> {
        let layer = match self.layer.take() {
            Some(layer) if self.format == Some(format) => layer,
            old => {
                if let Some(mut old) = old {
                    old.flush_and_remove_image();
                    old.set_hidden(true);
                }
                self.build_layer(format)
            }
        };
        self.layer.insert(layer)
    }

    fn build_layer(&mut self, format: FormatDescription) -> Box<dyn CompositorLayer> {
        let mut layer = self.factory.create(&format, Arc::clone(&self.timebase));
        layer.set_hidden(self.hidden);
        layer.set_content_mode(self.content_mode);
        self.format = Some(format);
        self.generation += 1;
        info!(
            generation = self.generation,
            width = format.width,
            height = format.height,
            format = ?format.format,
            "[video] compositor layer rebuilt"
        );
        if let Some(listener) = self.layer_listener.as_mut() {
            listener(self.generation);
        }
        layer
    }
}
