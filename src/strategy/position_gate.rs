use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds how many lifecycles may be past the filter pipeline at once.
///
/// Capacity 1 in single-position mode, `max_positions` otherwise, unbounded
/// when that is 0.
#[derive(Debug)]
pub struct PositionGate {
    semaphore: Option<Arc<Semaphore>>,
    capacity: Option<usize>,
}

/// Held by a lifecycle until it reaches a terminal state
#[derive(Debug)]
pub struct GatePermit {
    _permit: Option<OwnedSemaphorePermit>,
}

impl PositionGate {
    pub fn new(one_token_at_a_time: bool, max_positions: usize) -> Self {
        let capacity = if one_token_at_a_time {
            Some(1)
        } else if max_positions > 0 {
            Some(max_positions)
        } else {
            None
        };

        Self {
            semaphore: capacity.map(|c| Arc::new(Semaphore::new(c))),
            capacity,
        }
    }

    pub fn single() -> Self {
        Self::new(true, 0)
    }

    pub fn unbounded() -> Self {
        Self::new(false, 0)
    }

    pub fn is_single_position(&self) -> bool {
        self.capacity == Some(1)
    }

    /// Atomically claims a slot; `None` when every slot is taken
    pub fn try_acquire(&self) -> Option<GatePermit> {
        match &self.semaphore {
            Some(semaphore) => Arc::clone(semaphore)
                .try_acquire_owned()
                .ok()
                .map(|permit| GatePermit { _permit: Some(permit) }),
            None => Some(GatePermit { _permit: None }),
        }
    }

    pub fn is_saturated(&self) -> bool {
        self.semaphore
            .as_ref()
            .map(|s| s.available_permits() == 0)
            .unwrap_or(false)
    }

    /// Free slots, `None` when unbounded
    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
