//! Counting permits bounding GPU submissions in flight.
//!
//! The tick thread acquires a permit before encoding a frame; the permit is
//! moved into the queue's completion callback and released there.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

struct PermitState {
    available: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}

/// A fixed pool of submission permits. Cloning shares the pool.
#[derive(Clone)]
pub struct InFlightPermits {
    state: Arc<PermitState>,
}

impl InFlightPermits {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Arc::new(PermitState {
                available: Mutex::new(capacity),
                released: Condvar::new(),
                capacity,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.state.capacity
    }

    /// Permits currently held by encoded-but-not-completed frames.
    pub fn outstanding(&self) -> usize {
        self.state.capacity - *self.state.available.lock()
    }

    /// Take a permit if one is free.
    pub fn try_acquire(&self) -> Option<InFlightPermit> {
        let mut available = self.state.available.lock();
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(InFlightPermit {
            state: Arc::clone(&self.state),
        })
    }

    /// Block until a permit is free.
    pub fn acquire(&self) -> InFlightPermit {
        let mut available = self.state.available.lock();
        while *available == 0 {
            self.state.released.wait(&mut available);
        }
        *available -= 1;
        InFlightPermit {
            state: Arc::clone(&self.state),
        }
    }
}

/// One held permit. Dropping it returns the permit to the pool.
pub struct InFlightPermit {
    state: Arc<PermitState>,
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        let mut available = self.state.available.lock();
        *available += 1;
        self.state.released.notify_one();
    }
}
