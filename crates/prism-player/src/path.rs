//! Hardware compositing vs. shader rendering, decided per frame.

use prism_core::Frame;

/// Which sink presents a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentationPath {
    /// Zero-copy surface handed to the platform compositor
    HardwareComposite,
    /// Planes uploaded and converted by the GPU shader path
    ShaderRender,
}

/// A change of active path. `from` is `None` for the very first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSwitch {
    pub from: Option<PresentationPath>,
    pub to: PresentationPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathDecision {
    pub path: PresentationPath,
    /// Set when the caller must hide the old sink, show the new one and
    /// flush the old one before presenting.
    pub switch: Option<PathSwitch>,
}

/// Remembers the active path so switches are reported exactly once.
#[derive(Debug, Clone)]
pub struct PathSelector {
    prefer_hardware: bool,
    active: Option<PresentationPath>,
}

impl PathSelector {
    pub fn new(prefer_hardware: bool) -> Self {
        Self {
            prefer_hardware,
            active: None,
        }
    }

    pub fn active(&self) -> Option<PresentationPath> {
        self.active
    }

    /// Path for a frame, without changing state.
    pub fn path_for(&self, frame: &Frame) -> PresentationPath {
        if self.prefer_hardware && frame.surface.is_some() {
            PresentationPath::HardwareComposite
        } else {
            PresentationPath::ShaderRender
        }
    }

    pub fn decide(&mut self, frame: &Frame) -> PathDecision {
        let path = self.path_for(frame);
        let switch = (self.active != Some(path)).then_some(PathSwitch {
            from: self.active,
            to: path,
        });
        self.active = Some(path);
        PathDecision { path, switch }
    }
}
