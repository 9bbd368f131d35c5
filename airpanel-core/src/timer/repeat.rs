//! Periodic timer

use std::time::Duration;

use super::worker::{Command, Kind, TimerCore};
use super::{check_interval, TimerControl, TimerError, TimerState};

/// Fires its action every `interval` until cancelled
///
/// Deadlines advance by whole periods from the start, so a slow action does
/// not make the timer drift. Periods that an overrunning action misses
/// entirely are skipped, not replayed.
pub struct RepeatTimer {
    core: TimerCore,
}

impl RepeatTimer {
    /// Create a new timer; the first period begins at [`start`](Self::start)
    pub fn new<F>(name: &str, interval: Duration, action: F) -> Result<Self, TimerError>
    where
        F: FnMut() + Send + 'static,
    {
        let interval = check_interval(interval)?;
        Ok(Self {
            core: TimerCore::new(name, Kind::Repeat, interval, Box::new(action)),
        })
    }

    /// Create and start in one step
    pub fn spawn<F>(name: &str, interval: Duration, action: F) -> Result<Self, TimerError>
    where
        F: FnMut() + Send + 'static,
    {
        let timer = Self::new(name, interval, action)?;
        timer.start()?;
        Ok(timer)
    }

    /// Spawn the background waiter, armed for one period
    pub fn start(&self) -> Result<(), TimerError> {
        self.core.start()
    }

    /// Replace the period
    ///
    /// The pending wait is re-aimed at the start of the current period plus
    /// `interval`; if that moment has already passed the action fires at once.
    pub fn set_interval(&self, interval: Duration) -> Result<(), TimerError> {
        let interval = check_interval(interval)?;
        self.core.send(Command::SetInterval(interval))
    }

    /// Current period
    pub fn interval(&self) -> Duration {
        self.core.interval()
    }

    /// Terminate the waiter; repeated calls are no-ops
    pub fn cancel(&self) {
        self.core.cancel();
    }

    /// Current state
    pub fn state(&self) -> TimerState {
        self.core.state()
    }

    /// Number of times the action has completed
    pub fn fired(&self) -> u64 {
        self.core.fired()
    }
}

impl TimerControl for RepeatTimer {
    fn start(&self) -> Result<(), TimerError> {
        RepeatTimer::start(self)
    }

    fn cancel(&self) {
        RepeatTimer::cancel(self)
    }

    fn state(&self) -> TimerState {
        RepeatTimer::state(self)
    }

    fn name(&self) -> &str {
        self.core.name()
    }
}
