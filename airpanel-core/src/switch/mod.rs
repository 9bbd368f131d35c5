//! Debounced push buttons
//!
//! A [`Switch`] subscribes to raw edges of one pin and turns them into
//! stable key events:
//!
//! ```text
//!  raw edge != committed ──▶ debounce.reset()
//!  raw edge == committed ──▶ debounce.stop()
//!  debounce expiry       ──▶ commit level
//!                              pressed:  emit click, long.reset()
//!                              released: long.stop()
//!  long expiry (pressed) ──▶ emit long-press
//! ```
//!
//! `NoChange` notifications are ignored entirely.

mod button;

use std::sync::Arc;
use std::time::Duration;

use airpanel_display::KeyEvent;
use airpanel_hal::{GpioError, Level, Pull};
use thiserror::Error;

use crate::timer::TimerError;

pub use button::Switch;

/// Default debounce window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Default long-press threshold, measured from the committed press
pub const DEFAULT_LONG_PRESS: Duration = Duration::from_millis(500);

/// Receives debounced key events
///
/// Called from timer threads, never with a switch lock held.
pub type KeyHandler = Arc<dyn Fn(KeyEvent) + Send + Sync>;

/// Switch errors
#[derive(Debug, Error)]
pub enum SwitchError {
    /// Pin setup or edge subscription failed
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),
    /// Debounce or long-press timer could not be created
    #[error("timer error: {0}")]
    Timer(#[from] TimerError),
}

/// Electrical and timing parameters of a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchConfig {
    /// Time a level must be stable before it is committed
    pub debounce: Duration,
    /// Hold time after the committed press before a long-press is reported
    pub long_press: Duration,
    /// Pull resistor applied to the pin
    pub pull: Pull,
    /// Level that means "pressed"
    pub active: Level,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            long_press: DEFAULT_LONG_PRESS,
            pull: Pull::Down,
            active: Level::High,
        }
    }
}

impl SwitchConfig {
    /// Create a config with custom timings and the default wiring
    pub fn with_timing(debounce: Duration, long_press: Duration) -> Self {
        Self {
            debounce,
            long_press,
            ..Self::default()
        }
    }
}
