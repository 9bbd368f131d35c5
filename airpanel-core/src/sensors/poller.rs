//! One polling timer per measurement

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use super::{Readings, Sensor, SensorKind, DEFAULT_PERIOD};
use crate::config::ConfigSection;
use crate::timer::{RepeatTimer, TimerControl, TimerError};

struct Poll {
    kind: SensorKind,
    timer: RepeatTimer,
}

/// Polls each measurement at its configured period
///
/// A failed read skips that cycle only; the next one is attempted at the
/// regular period, without backoff.
pub struct SensorPoller {
    polls: Vec<Poll>,
}

impl SensorPoller {
    /// Create one timer per source; periods come from `config`
    pub fn new<I>(sources: I, readings: Arc<Readings>, config: &ConfigSection) -> Result<Self, TimerError>
    where
        I: IntoIterator<Item = (SensorKind, Arc<dyn Sensor>)>,
    {
        let mut polls = Vec::new();
        for (kind, sensor) in sources {
            let period = period(config, kind);
            let readings = Arc::clone(&readings);
            let timer = RepeatTimer::new(
                &format!("poll-{}", kind.flag_key().to_lowercase()),
                period,
                move || match sensor.read(kind) {
                    Ok(value) => readings.add(kind, value),
                    Err(e) => warn!("{}, skipping cycle", e),
                },
            )?;
            polls.push(Poll { kind, timer });
        }
        Ok(Self { polls })
    }

    /// Start every polling timer
    pub fn start(&self) -> Result<(), TimerError> {
        for poll in &self.polls {
            poll.timer.start()?;
        }
        info!("sensor polling started ({} measurements)", self.polls.len());
        Ok(())
    }

    /// Re-read the periods and retime only the timers whose period changed
    ///
    /// Returns the number of retimed timers.
    pub fn apply_config(&self, config: &ConfigSection) -> usize {
        let mut changed = 0;
        for poll in &self.polls {
            let period = period(config, poll.kind);
            if period == poll.timer.interval() {
                continue;
            }
            match poll.timer.set_interval(period) {
                Ok(()) => {
                    info!("{} period now {:?}", poll.kind, period);
                    changed += 1;
                }
                Err(e) => warn!("{} period not applied: {}", poll.kind, e),
            }
        }
        changed
    }

    /// Current period of one measurement
    pub fn period(&self, kind: SensorKind) -> Option<Duration> {
        self.polls
            .iter()
            .find(|poll| poll.kind == kind)
            .map(|poll| poll.timer.interval())
    }

    /// The polling timers, one per measurement
    pub fn timers(&self) -> impl Iterator<Item = &dyn TimerControl> {
        self.polls.iter().map(|poll| &poll.timer as &dyn TimerControl)
    }

    /// Cancel every polling timer
    pub fn cancel(&self) {
        for poll in &self.polls {
            poll.timer.cancel();
        }
        info!("sensor polling stopped");
    }
}

fn period(config: &ConfigSection, kind: SensorKind) -> Duration {
    Duration::from_secs(config.get_u64(kind.period_key(), DEFAULT_PERIOD))
}
