//! When to fetch and draw, and at what wake-up cadence.
//!
//! The pacer is pure state: it tells the caller what a tick should do and
//! which cadence the display link should run at. Driving the link is the
//! caller's job.

use std::time::Duration;
use tracing::debug;

/// Highest content rate a cadence is derived from.
pub const MAX_FRAME_RATE: u32 = 1000;

/// Wake-up rate for the display link, in ticks per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub preferred: u32,
    pub min: u32,
    pub max: u32,
}

impl Cadence {
    /// Twice the content rate, free to range between 1× and 3×.
    ///
    /// Hints outside `1..=MAX_FRAME_RATE` are clamped; NaN counts as 1.
    pub fn for_frame_rate(fps: f32) -> Self {
        let rate = if fps.is_nan() {
            1
        } else {
            fps.ceil().clamp(1.0, MAX_FRAME_RATE as f32) as u32
        };
        Self {
            preferred: 2 * rate,
            min: rate,
            max: 3 * rate,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.preferred.max(1) as f64)
    }
}

/// The periodic wake-up source, usually the display's vsync callback.
pub trait DisplayLink {
    fn set_cadence(&mut self, cadence: Cadence);

    fn set_paused(&mut self, paused: bool);

    /// Stop for good. No ticks arrive afterwards.
    fn invalidate(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacerState {
    Paused,
    Active,
    Invalidated,
}

/// What a tick or lifecycle call asks the presenter to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    Skip,
    Fetch { force: bool },
}

#[derive(Debug, Clone)]
pub struct FramePacer {
    state: PacerState,
    frame_rate: Option<f32>,
    cadence: Option<Cadence>,
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new()
    }
}

impl FramePacer {
    pub fn new() -> Self {
        Self {
            state: PacerState::Paused,
            frame_rate: None,
            cadence: None,
        }
    }

    pub fn state(&self) -> PacerState {
        self.state
    }

    pub fn cadence(&self) -> Option<Cadence> {
        self.cadence
    }

    /// Start ticking and draw one frame right away.
    pub fn play(&mut self) -> TickAction {
        if self.state == PacerState::Invalidated {
            return TickAction::Skip;
        }
        self.state = PacerState::Active;
        TickAction::Fetch { force: true }
    }

    /// Stop advancing. The link keeps running and the last frame stays up.
    pub fn pause(&mut self) {
        if self.state == PacerState::Active {
            self.state = PacerState::Paused;
        }
    }

    pub fn on_tick(&self) -> TickAction {
        match self.state {
            PacerState::Active => TickAction::Fetch { force: false },
            PacerState::Paused | PacerState::Invalidated => TickAction::Skip,
        }
    }

    /// Fetch and draw now, whatever the state (used after seeks and resizes).
    pub fn read_next_frame(&self) -> TickAction {
        match self.state {
            PacerState::Invalidated => TickAction::Skip,
            _ => TickAction::Fetch { force: true },
        }
    }

    /// Record a frame's rate hint. Returns the new cadence when the rate
    /// changed.
    pub fn observe_frame_rate(&mut self, fps: f32) -> Option<Cadence> {
        if !fps.is_finite() || fps <= 0.0 || self.frame_rate == Some(fps) {
            return None;
        }
        self.frame_rate = Some(fps);
        let cadence = Cadence::for_frame_rate(fps);
        if self.cadence == Some(cadence) {
            return None;
        }
        debug!(fps, preferred = cadence.preferred, "cadence changed");
        self.cadence = Some(cadence);
        Some(cadence)
    }

    pub fn invalidate(&mut self) {
        self.state = PacerState::Invalidated;
    }
}
