//! Presentation clock handed to the hardware compositor.

use parking_lot::Mutex;
use prism_core::MediaTime;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Anchor {
    host: Instant,
    media: f64,
    rate: f64,
}

/// Media time driven by the monotonic host clock. Seeded at zero, rate 1.0.
///
/// Shared between the sink and its compositor layer; all methods take `&self`.
#[derive(Debug)]
pub struct ControlTimebase {
    anchor: Mutex<Anchor>,
}

impl Default for ControlTimebase {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlTimebase {
    pub fn new() -> Self {
        Self {
            anchor: Mutex::new(Anchor {
                host: Instant::now(),
                media: 0.0,
                rate: 1.0,
            }),
        }
    }

    fn seconds_at(anchor: &Anchor, host: Instant) -> f64 {
        anchor.media + host.saturating_duration_since(anchor.host).as_secs_f64() * anchor.rate
    }

    pub fn now(&self) -> MediaTime {
        let anchor = self.anchor.lock();
        MediaTime::from_seconds_f64(Self::seconds_at(&anchor, Instant::now()))
    }

    pub fn rate(&self) -> f64 {
        self.anchor.lock().rate
    }

    /// Change rate without a jump in media time.
    pub fn set_rate(&self, rate: f64) {
        let mut anchor = self.anchor.lock();
        let host = Instant::now();
        anchor.media = Self::seconds_at(&anchor, host);
        anchor.host = host;
        anchor.rate = rate;
    }

    pub fn set_time(&self, time: MediaTime) {
        let mut anchor = self.anchor.lock();
        anchor.host = Instant::now();
        anchor.media = time.to_seconds_f64();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_seeded_at_zero_rate_one() {
        let timebase = ControlTimebase::new();
        assert_eq!(timebase.rate(), 1.0);
        assert!(timebase.now().to_seconds_f64() < 0.5);
    }

    #[test]
    fn test_monotonic() {
        let timebase = ControlTimebase::new();
        let a = timebase.now();
        thread::sleep(Duration::from_millis(5));
        assert!(timebase.now() > a);
    }

    #[test]
    fn test_paused_rate_freezes_time() {
        let timebase = ControlTimebase::new();
        timebase.set_time(MediaTime::new(10, 1));
        timebase.set_rate(0.0);
        let a = timebase.now();
        thread::sleep(Duration::from_millis(5));
        assert_eq!(timebase.now(), a);
        assert!((a.to_seconds_f64() - 10.0).abs() < 0.1);
    }
}
