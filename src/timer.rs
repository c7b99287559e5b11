use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Pending,
    Fired,
    Cancelled,
}

/// One-shot deadline polled from the event loop.
///
/// `poll` reports the deadline at most once; after `cancel` it never does.
#[derive(Debug)]
pub struct CancellableTimer {
    deadline: Instant,
    state: TimerState,
}

impl CancellableTimer {
    pub fn new(started_at: Instant, delay: Duration) -> Self {
        Self {
            deadline: started_at + delay,
            state: TimerState::Pending,
        }
    }

    /// Returns true exactly once, on the first poll at or after the deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.state == TimerState::Pending && now >= self.deadline {
            self.state = TimerState::Fired;
            return true;
        }
        false
    }

    pub fn cancel(&mut self) {
        if self.state == TimerState::Pending {
            self.state = TimerState::Cancelled;
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == TimerState::Pending
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }
}
