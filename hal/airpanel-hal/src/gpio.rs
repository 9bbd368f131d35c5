//! GPIO pin abstractions
//!
//! Provides the edge-notification interface used by the button handling in
//! the core. Implementations wrap a GPIO daemon or, for tests, [`SimGpio`].
//!
//! [`SimGpio`]: crate::sim::SimGpio

use thiserror::Error;

/// Raw level reported by a read or an edge notification
///
/// `NoChange` is reported by some backends when a watchdog or bounce
/// notification fires without a real transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Logic 0
    Low,
    /// Logic 1
    High,
    /// No transition happened
    NoChange,
}

impl Level {
    /// Convert a boolean pin state into a level
    pub fn from_bool(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }

    /// Check if the level is high
    pub fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    /// Check if the level is low
    pub fn is_low(self) -> bool {
        matches!(self, Level::Low)
    }

    /// Opposite logic level; `NoChange` stays `NoChange`
    pub fn inverse(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
            Level::NoChange => Level::NoChange,
        }
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Digital input
    Input,
    /// Digital output
    Output,
}

/// Internal pull resistor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    /// Floating input
    Off,
    /// Pull towards ground, pressed button reads high
    Down,
    /// Pull towards supply, pressed button reads low
    Up,
}

/// Which transitions an edge callback is interested in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Low to high
    Rising,
    /// High to low
    Falling,
    /// Any transition
    Either,
}

impl Edge {
    /// Check if a reported level matches this edge selection
    ///
    /// `NoChange` notifications are delivered to every subscription.
    pub fn matches(self, level: Level) -> bool {
        match (self, level) {
            (_, Level::NoChange) => true,
            (Edge::Either, _) => true,
            (Edge::Rising, Level::High) => true,
            (Edge::Falling, Level::Low) => true,
            _ => false,
        }
    }
}

/// GPIO errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpioError {
    /// Pin number not available on this backend
    #[error("invalid pin {0}")]
    InvalidPin(u8),
    /// Backend (daemon, device file) is not reachable
    #[error("GPIO backend not connected")]
    NotConnected,
    /// Edge subscription could not be registered
    #[error("edge subscription failed on pin {0}")]
    Subscription(u8),
}

/// Edge notification callback
///
/// Called with the pin number and the new level on the backend's callback
/// thread.
pub type EdgeCallback = Box<dyn Fn(u8, Level) + Send + Sync>;

/// Handle for a registered edge callback
pub trait EdgeSubscription: Send {
    /// Stop delivering notifications
    ///
    /// Edges reported after this returns are not delivered. A notification
    /// the backend was already dispatching may still reach the callback
    /// once, so callbacks must tolerate running after cancel. Calling this
    /// more than once is a no-op.
    fn cancel(&mut self);
}

/// GPIO collaborator
///
/// Implementations must be shareable between the thread that sets up the
/// switches and the backend's callback thread.
pub trait Gpio: Send + Sync {
    /// Configure pin direction
    fn set_mode(&self, pin: u8, mode: PinMode) -> Result<(), GpioError>;

    /// Configure the pull resistor
    fn set_pull(&self, pin: u8, pull: Pull) -> Result<(), GpioError>;

    /// Sample the current level
    fn read(&self, pin: u8) -> Result<Level, GpioError>;

    /// Subscribe to edges on a pin
    fn register_edge_callback(
        &self,
        pin: u8,
        edge: Edge,
        callback: EdgeCallback,
    ) -> Result<Box<dyn EdgeSubscription>, GpioError>;
}
