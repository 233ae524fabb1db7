//! A display link backed by a timer thread, for headless runs and tests.
//!
//! Ticks arrive as `Instant`s on a channel; the owner drains it from the
//! presentation thread.

use crate::pacer::{Cadence, DisplayLink};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Poll interval while paused.
const IDLE_WAIT: Duration = Duration::from_millis(100);

enum TickerCommand {
    SetInterval(Duration),
    SetPaused(bool),
    Stop,
}

pub struct ThreadTicker {
    handle: Option<JoinHandle<()>>,
    command_tx: Sender<TickerCommand>,
}

impl ThreadTicker {
    /// Start the timer thread, paused, at `initial` cadence.
    pub fn spawn(initial: Cadence) -> (Self, Receiver<Instant>) {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (tick_tx, tick_rx) = crossbeam_channel::bounded(1);
        let interval = initial.interval();

        let handle = thread::Builder::new()
            .name("prism-ticker".into())
            .spawn(move || tick_loop(interval, command_rx, tick_tx))
            .ok();
        if handle.is_none() {
            error!("failed to spawn ticker thread");
        }

        (
            Self {
                handle,
                command_tx,
            },
            tick_rx,
        )
    }
}

impl DisplayLink for ThreadTicker {
    fn set_cadence(&mut self, cadence: Cadence) {
        let _ = self
            .command_tx
            .send(TickerCommand::SetInterval(cadence.interval()));
    }

    fn set_paused(&mut self, paused: bool) {
        let _ = self.command_tx.send(TickerCommand::SetPaused(paused));
    }

    fn invalidate(&mut self) {
        let _ = self.command_tx.send(TickerCommand::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        self.invalidate();
    }
}

fn tick_loop(mut interval: Duration, commands: Receiver<TickerCommand>, ticks: Sender<Instant>) {
    let mut paused = true;
    let mut deadline = Instant::now() + interval;

    loop {
        let wait = if paused {
            IDLE_WAIT
        } else {
            deadline.saturating_duration_since(Instant::now())
        };

        match commands.recv_timeout(wait) {
            Ok(TickerCommand::SetInterval(next)) => {
                debug!(?next, "ticker interval");
                interval = next;
                deadline = Instant::now() + interval;
            }
            Ok(TickerCommand::SetPaused(p)) => {
                paused = p;
                deadline = Instant::now() + interval;
            }
            Ok(TickerCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) if paused => {}
            Err(RecvTimeoutError::Timeout) => {
                let now = Instant::now();
                // A full channel means the consumer is behind; drop the tick.
                if let Err(TrySendError::Disconnected(_)) = ticks.try_send(now) {
                    break;
                }
                deadline += interval;
                if deadline < now {
                    deadline = now + interval;
                }
            }
        }
    }

    info!("ticker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paused_until_resumed() {
        let (mut ticker, ticks) = ThreadTicker::spawn(Cadence::for_frame_rate(100.0));
        assert!(ticks.recv_timeout(Duration::from_millis(50)).is_err());

        ticker.set_paused(false);
        assert!(ticks.recv_timeout(Duration::from_millis(500)).is_ok());
        ticker.invalidate();
    }

    #[test]
    fn test_invalidate_stops_ticks() {
        let (mut ticker, ticks) = ThreadTicker::spawn(Cadence::for_frame_rate(100.0));
        ticker.set_paused(false);
        ticker.invalidate();
        while ticks.try_recv().is_ok() {}
        assert!(ticks.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
