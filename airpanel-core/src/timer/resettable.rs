//! Single-shot timer that can be rearmed before it expires

use std::time::{Duration, Instant};

use super::worker::{Command, Kind, TimerCore};
use super::{check_interval, TimerControl, TimerError, TimerState};

/// Single-shot countdown
///
/// Starts idle. [`reset`](Self::reset) arms it for `interval` from now;
/// each further reset before expiry pushes the deadline out again, so the
/// action fires once, `interval` after the last reset. [`stop`](Self::stop)
/// disarms it without firing and keeps the waiter alive.
pub struct ResettableTimer {
    core: TimerCore,
}

impl ResettableTimer {
    /// Create a new timer; it does nothing until started and reset
    pub fn new<F>(name: &str, interval: Duration, action: F) -> Result<Self, TimerError>
    where
        F: FnMut() + Send + 'static,
    {
        let interval = check_interval(interval)?;
        Ok(Self {
            core: TimerCore::new(name, Kind::SingleShot, interval, Box::new(action)),
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

    /// Spawn the background waiter (idle)
    pub fn start(&self) -> Result<(), TimerError> {
        self.core.start()
    }

    /// Restart the countdown from now, optionally with a new interval
    pub fn reset(&self, interval: Option<Duration>) -> Result<(), TimerError> {
        let interval = interval.map(check_interval).transpose()?;
        self.core.send(Command::Reset {
            at: Instant::now(),
            interval,
        })
    }

    /// Disarm without firing; a later [`reset`](Self::reset) rearms
    pub fn stop(&self) -> Result<(), TimerError> {
        self.core.send(Command::Stop)
    }

    /// Terminate the waiter; repeated calls are no-ops
    pub fn cancel(&self) {
        self.core.cancel();
    }

    /// Current state
    pub fn state(&self) -> TimerState {
        self.core.state()
    }

    /// Current interval
    pub fn interval(&self) -> Duration {
        self.core.interval()
    }

    /// Number of times the action has completed
    pub fn fired(&self) -> u64 {
        self.core.fired()
    }
}

impl TimerControl for ResettableTimer {
    fn start(&self) -> Result<(), TimerError> {
        ResettableTimer::start(self)
    }

    fn cancel(&self) {
        ResettableTimer::cancel(self)
    }

    fn state(&self) -> TimerState {
        ResettableTimer::state(self)
    }

    fn name(&self) -> &str {
        self.core.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::thread;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn channel_timer(interval: Duration) -> (ResettableTimer, crossbeam_channel::Receiver<Instant>) {
        let (tx, rx) = unbounded();
        let timer = ResettableTimer::spawn("test", interval, move || {
            let _ = tx.send(Instant::now());
        })
        .unwrap();
        (timer, rx)
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(matches!(
            ResettableTimer::new("zero", Duration::ZERO, || {}),
            Err(TimerError::InvalidInterval)
        ));
    }

    #[test]
    fn test_idle_until_reset() {
        let (timer, rx) = channel_timer(ms(20));
        assert!(rx.recv_timeout(ms(100)).is_err());
        assert_eq!(timer.state(), TimerState::Idle);
        timer.cancel();
    }

    #[test]
    fn test_fires_once_after_reset() {
        let (timer, rx) = channel_timer(ms(40));
        let armed_at = Instant::now();
        timer.reset(None).unwrap();
        let fired_at = rx.recv_timeout(ms(1000)).unwrap();
        assert!(fired_at.duration_since(armed_at) >= ms(40));
        assert!(rx.recv_timeout(ms(150)).is_err());
        assert_eq!(timer.fired(), 1);
        assert_eq!(timer.state(), TimerState::Idle);
        timer.cancel();
    }

    #[test]
    fn test_resets_postpone_single_fire() {
        let (timer, rx) = channel_timer(ms(80));
        let mut last = Instant::now();
        for _ in 0..5 {
            timer.reset(None).unwrap();
            last = Instant::now();
            thread::sleep(ms(20));
        }
        let fired_at = rx.recv_timeout(ms(1000)).unwrap();
        assert!(fired_at.duration_since(last) >= ms(75));
        assert!(rx.recv_timeout(ms(200)).is_err());
        assert_eq!(timer.fired(), 1);
        timer.cancel();
    }

    #[test]
    fn test_stop_suspends() {
        let (timer, rx) = channel_timer(ms(50));
        timer.reset(None).unwrap();
        timer.stop().unwrap();
        assert!(rx.recv_timeout(ms(150)).is_err());

        timer.reset(Some(ms(20))).unwrap();
        assert!(rx.recv_timeout(ms(1000)).is_ok());
        assert_eq!(timer.interval(), ms(20));
        timer.cancel();
    }

    #[test]
    fn test_cancel_idempotent() {
        let (timer, _rx) = channel_timer(ms(10));
        timer.cancel();
        assert_eq!(timer.state(), TimerState::Cancelled);
        timer.cancel();
        assert_eq!(timer.state(), TimerState::Cancelled);
        assert!(matches!(timer.reset(None), Err(TimerError::Cancelled)));
    }

    #[test]
    fn test_cancel_before_start() {
        let timer = ResettableTimer::new("never", ms(10), || {}).unwrap();
        timer.cancel();
        assert_eq!(timer.state(), TimerState::Cancelled);
        assert!(matches!(timer.start(), Err(TimerError::Cancelled)));
    }

    #[test]
    fn test_double_start() {
        let timer = ResettableTimer::spawn("twice", ms(10), || {}).unwrap();
        assert!(matches!(timer.start(), Err(TimerError::AlreadyStarted)));
    }
}
