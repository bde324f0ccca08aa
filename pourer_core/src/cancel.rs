//! Cooperative cancellation threaded from the top-level caller into every
//! blocking step (planning retries, action execution, sample pacing).
use crate::error::PourError;
use pourer_traits::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Token that never trips unless cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an existing flag (e.g. one flipped by a Ctrl-C handler).
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self {
            flag,
            deadline: None,
        }
    }

    /// Same flag, plus a deadline `budget` after the clock's current time.
    pub fn with_timeout(&self, clock: &dyn Clock, budget: Duration) -> Self {
        let deadline = clock.now() + budget;
        Self {
            flag: self.flag.clone(),
            deadline: Some(match self.deadline {
                Some(existing) => existing.min(deadline),
                None => deadline,
            }),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `Err` once cancelled or past the deadline.
    pub fn check(&self, clock: &dyn Clock) -> Result<(), PourError> {
        if self.is_cancelled() {
            return Err(PourError::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && clock.now() >= deadline
        {
            return Err(PourError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Sleep `total` in slices, bailing out early on cancellation.
    pub fn sleep(&self, clock: &dyn Clock, total: Duration) -> Result<(), PourError> {
        const SLICE: Duration = Duration::from_millis(20);
        let mut left = total;
        while !left.is_zero() {
            self.check(clock)?;
            let step = left.min(SLICE);
            clock.sleep(step);
            left -= step;
        }
        self.check(clock)
    }
}
