//! Head-mounted stereo output.
//!
//! The XR compositor and world tracking are platform services; the renderer
//! only needs a source of per-frame drawables and a pose query.

use crate::target::Drawable;
use crate::uniforms::{EyeUniforms, UniformsArray};
use glam::Mat4;

/// One eye of a stereo drawable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeView {
    /// Eye position relative to the device
    pub transform: Mat4,
    pub projection: Mat4,
}

/// A stereo image to fill, left eye in the left half of `drawable`.
pub struct ImmersiveDrawable {
    pub drawable: Drawable,
    /// Predicted time the image reaches the display, in seconds
    pub presentation_time: f64,
    pub views: [EyeView; 2],
}

/// Frame pacing and drawables of an XR compositor layer.
pub trait ImmersiveLayer {
    /// Wait for the next frame's drawable. `None` skips this tick.
    fn next_drawable(&mut self) -> Option<ImmersiveDrawable>;

    /// Submit the image along with the pose it was rendered for.
    fn present(&mut self, drawable: Drawable, device_pose: Mat4);
}

/// World-tracking device pose.
pub trait PoseProvider {
    /// Device-to-world transform predicted for `presentation_time`.
    fn device_pose(&self, presentation_time: f64) -> Option<Mat4>;
}

/// View matrices for both eyes: each eye's world transform, inverted.
pub fn eye_uniforms(device_pose: Mat4, views: &[EyeView; 2]) -> UniformsArray {
    UniformsArray {
        eyes: views.map(|eye| {
            let view = (device_pose * eye.transform).inverse();
            EyeUniforms::new(eye.projection, view)
        }),
    }
}
