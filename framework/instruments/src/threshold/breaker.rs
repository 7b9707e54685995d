use std::time::Duration;

/// State of an abort-on-fail threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Not breached, or nothing observed yet.
    Armed,
    /// Breached before the abort delay elapsed. Reverts to [BreakerState::Armed] if the condition
    /// recovers before the delay is over.
    BreachedPendingGrace { since: Duration },
    /// Breached after the abort delay. Latched for the rest of the run.
    Tripped { at: Duration },
}

/// Debounces abort decisions for a single threshold.
///
/// Times are offsets from the start of the run.
#[derive(Debug, Clone)]
pub struct AbortBreaker {
    grace: Duration,
    state: BreakerState,
}

impl AbortBreaker {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            state: BreakerState::Armed,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn is_tripped(&self) -> bool {
        matches!(self.state, BreakerState::Tripped { .. })
    }

    /// Feed one evaluation. Returns `true` only for the observation that trips the breaker.
    pub fn observe(&mut self, breached: bool, elapsed: Duration) -> bool {
        let next = match (self.state, breached) {
            (BreakerState::Tripped { .. }, _) => return false,
            (_, false) => BreakerState::Armed,
            (_, true) if elapsed >= self.grace => BreakerState::Tripped { at: elapsed },
            (BreakerState::BreachedPendingGrace { since }, true) => {
                BreakerState::BreachedPendingGrace { since }
            }
            (BreakerState::Armed, true) => BreakerState::BreachedPendingGrace { since: elapsed },
        };

        self.state = next;
        self.is_tripped()
    }
}
