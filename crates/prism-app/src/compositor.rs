//! Stand-in compositor layer for headless runs. Accepts every sample and
//! keeps the most recent one as the displayed image.

use prism_core::ContentMode;
use prism_player::{
    CompositorLayer, CompositorLayerFactory, ControlTimebase, FormatDescription, LayerStatus,
    SampleBuffer,
};
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Default)]
pub struct HeadlessCompositor;

impl CompositorLayerFactory for HeadlessCompositor {
    fn create(
        &mut self,
        format: &FormatDescription,
        timebase: Arc<ControlTimebase>,
    ) -> Box<dyn CompositorLayer> {
        debug!(width = format.width, height = format.height, "headless layer created");
        Box::new(HeadlessLayer {
            timebase,
            displayed: None,
            hidden: true,
        })
    }
}

struct HeadlessLayer {
    timebase: Arc<ControlTimebase>,
    displayed: Option<SampleBuffer>,
    hidden: bool,
}

impl CompositorLayer for HeadlessLayer {
    fn is_ready_for_more_media_data(&self) -> bool {
        true
    }

    fn enqueue(&mut self, sample: SampleBuffer) {
        trace!(
            pts = %sample.pts,
            clock = %self.timebase.now(),
            hidden = self.hidden,
            "sample displayed"
        );
        self.displayed = Some(sample);
    }

    fn requires_flush_to_resume_decoding(&self) -> bool {
        false
    }

    fn status(&self) -> LayerStatus {
        if self.displayed.is_some() {
            LayerStatus::Rendering
        } else {
            LayerStatus::Unknown
        }
    }

    fn flush(&mut self) {}

    fn flush_and_remove_image(&mut self) {
        self.displayed = None;
    }

    fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    fn set_content_mode(&mut self, _mode: ContentMode) {}
}
