//! Background timers
//!
//! Every timer owns one background thread that runs an explicit state
//! machine over a command channel:
//!
//! ```text
//!            reset                      expiry (single-shot)
//!   Idle ───────────▶ Armed(deadline) ───────────────────────▶ Idle
//!    ▲                 │  ▲    │
//!    └──── stop ───────┘  └────┘ reset / set_interval: new deadline
//!
//!   any state ── cancel ──▶ Cancelled (waiter exits)
//! ```
//!
//! After every command the next deadline is recomputed. When a deadline
//! passes, commands already queued are applied first, so a reset racing an
//! expiry postpones the action instead of firing it twice or dropping it.

mod repeat;
mod resettable;
mod worker;

use std::time::{Duration, Instant};

use thiserror::Error;

pub use repeat::RepeatTimer;
pub use resettable::ResettableTimer;

/// Upper bound for joining a waiter during cancellation
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Snapshot of a timer's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Not counting; waiting for a reset
    Idle,
    /// Counting down to the deadline
    Armed(Instant),
    /// Terminal; the waiter has exited or is exiting
    Cancelled,
}

impl TimerState {
    /// Check if the timer is counting down
    pub fn is_armed(&self) -> bool {
        matches!(self, TimerState::Armed(_))
    }
}

/// Timer errors
#[derive(Debug, Error)]
pub enum TimerError {
    /// Interval must be longer than zero
    #[error("timer interval must be positive")]
    InvalidInterval,
    /// Background thread could not be spawned
    #[error("failed to spawn timer thread: {0}")]
    Spawn(#[from] std::io::Error),
    /// `start()` called twice
    #[error("timer already started")]
    AlreadyStarted,
    /// The timer was cancelled
    #[error("timer cancelled")]
    Cancelled,
}

/// Operations shared by both timer variants
pub trait TimerControl: Send + Sync {
    /// Spawn the background waiter
    fn start(&self) -> Result<(), TimerError>;

    /// Stop the waiter and join it (bounded); repeated calls are no-ops
    fn cancel(&self);

    /// Current state
    fn state(&self) -> TimerState;

    /// Name used in logs and the thread name
    fn name(&self) -> &str;
}

pub(crate) fn check_interval(interval: Duration) -> Result<Duration, TimerError> {
    if interval.is_zero() {
        Err(TimerError::InvalidInterval)
    } else {
        Ok(interval)
    }
}
