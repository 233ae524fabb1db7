//! Stand-in XR compositor for headless immersive runs.

use glam::{Mat4, Vec3};
use prism_gpu::{DrawTarget, Drawable, EyeView, ImmersiveDrawable, ImmersiveLayer, OffscreenTarget, PoseProvider};
use std::time::Instant;
use tracing::trace;

const INTERPUPILLARY_DISTANCE: f32 = 0.064;
const DISPLAY_RATE: f64 = 90.0;
const EYE_FOV_Y: f32 = 100.0;

/// Renders both eyes side by side into one offscreen texture.
pub struct HeadlessHeadset {
    target: OffscreenTarget,
    started: Instant,
    presented: u64,
}

impl HeadlessHeadset {
    pub fn new(target: OffscreenTarget) -> Self {
        Self {
            target,
            started: Instant::now(),
            presented: 0,
        }
    }

    fn eye(offset: f32, aspect: f32) -> EyeView {
        EyeView {
            transform: Mat4::from_translation(Vec3::new(offset, 0.0, 0.0)),
            projection: Mat4::perspective_rh(EYE_FOV_Y.to_radians(), aspect, 0.05, 100.0),
        }
    }
}

impl ImmersiveLayer for HeadlessHeadset {
    fn next_drawable(&mut self) -> Option<ImmersiveDrawable> {
        let drawable = self.target.next_drawable()?;
        let aspect = (drawable.width as f32 / 2.0) / drawable.height.max(1) as f32;
        let half = INTERPUPILLARY_DISTANCE / 2.0;
        Some(ImmersiveDrawable {
            drawable,
            presentation_time: self.started.elapsed().as_secs_f64() + 1.0 / DISPLAY_RATE,
            views: [Self::eye(-half, aspect), Self::eye(half, aspect)],
        })
    }

    fn present(&mut self, drawable: Drawable, device_pose: Mat4) {
        self.presented += 1;
        trace!(presented = self.presented, pose = ?device_pose.w_axis, "headset frame");
        drawable.present();
    }
}

/// A seated user looking straight ahead.
pub struct SeatedPose;

impl PoseProvider for SeatedPose {
    fn device_pose(&self, _presentation_time: f64) -> Option<Mat4> {
        Some(Mat4::from_translation(Vec3::new(0.0, 1.2, 0.0)))
    }
}
