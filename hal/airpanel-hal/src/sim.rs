//! Simulated pin bank
//!
//! Software GPIO backend used by tests and the desktop build. Levels are
//! driven explicitly with [`SimGpio::drive`], which invokes the matching
//! edge callbacks synchronously on the calling thread, the same way a GPIO
//! daemon delivers notifications on its own callback thread.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use log::{debug, trace};

use crate::gpio::{Edge, EdgeCallback, EdgeSubscription, Gpio, GpioError, Level, PinMode, Pull};

/// Number of pins on the simulated header (BCM 0-27)
pub const SIM_PIN_COUNT: u8 = 28;

/// Per-pin simulated state
#[derive(Debug, Clone, Copy)]
struct PinState {
    level: Level,
    mode: PinMode,
    pull: Pull,
}

impl Default for PinState {
    fn default() -> Self {
        Self {
            level: Level::Low,
            mode: PinMode::Input,
            pull: Pull::Off,
        }
    }
}

struct Subscriber {
    id: u64,
    pin: u8,
    edge: Edge,
    callback: Arc<EdgeCallback>,
}

#[derive(Default)]
struct Bank {
    pins: HashMap<u8, PinState>,
    subscribers: Vec<Subscriber>,
    next_id: u64,
    disconnected: bool,
}

/// Shared handle to a simulated pin bank
///
/// Clones refer to the same bank.
#[derive(Clone, Default)]
pub struct SimGpio {
    bank: Arc<Mutex<Bank>>,
}

impl SimGpio {
    /// Create a bank with every pin low
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Bank> {
        // A panicking callback never holds the bank lock, so the data is intact
        self.bank.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_pin(pin: u8) -> Result<(), GpioError> {
        if pin < SIM_PIN_COUNT {
            Ok(())
        } else {
            Err(GpioError::InvalidPin(pin))
        }
    }

    /// Drive a pin to a level and deliver the edge to subscribers
    ///
    /// `Level::NoChange` leaves the stored level untouched but is still
    /// delivered, mimicking a bounce/watchdog report.
    ///
    /// Subscribers are snapshotted before dispatch and called without the
    /// bank lock held. A subscription cancelled while a `drive` is in flight
    /// still receives that one edge.
    pub fn drive(&self, pin: u8, level: Level) {
        let callbacks: Vec<Arc<EdgeCallback>> = {
            let mut bank = self.lock();
            if level != Level::NoChange {
                bank.pins.entry(pin).or_default().level = level;
            }
            bank.subscribers
                .iter()
                .filter(|s| s.pin == pin && s.edge.matches(level))
                .map(|s| Arc::clone(&s.callback))
                .collect()
        };

        trace!("sim pin {} -> {:?} ({} subscribers)", pin, level, callbacks.len());
        for callback in callbacks {
            callback(pin, level);
        }
    }

    /// Report a notification without a transition
    pub fn pulse_noise(&self, pin: u8) {
        self.drive(pin, Level::NoChange);
    }

    /// Number of live subscriptions on a pin
    pub fn subscriptions(&self, pin: u8) -> usize {
        self.lock().subscribers.iter().filter(|s| s.pin == pin).count()
    }

    /// Configured pull resistor of a pin
    pub fn pull(&self, pin: u8) -> Pull {
        self.lock().pins.get(&pin).copied().unwrap_or_default().pull
    }

    /// Configured direction of a pin
    pub fn mode(&self, pin: u8) -> PinMode {
        self.lock().pins.get(&pin).copied().unwrap_or_default().mode
    }

    /// Simulate the backend going away; every call fails afterwards
    pub fn disconnect(&self) {
        self.lock().disconnected = true;
    }

    fn connected(&self) -> Result<MutexGuard<'_, Bank>, GpioError> {
        let bank = self.lock();
        if bank.disconnected {
            Err(GpioError::NotConnected)
        } else {
            Ok(bank)
        }
    }
}

impl Gpio for SimGpio {
    fn set_mode(&self, pin: u8, mode: PinMode) -> Result<(), GpioError> {
        Self::check_pin(pin)?;
        self.connected()?.pins.entry(pin).or_default().mode = mode;
        Ok(())
    }

    fn set_pull(&self, pin: u8, pull: Pull) -> Result<(), GpioError> {
        Self::check_pin(pin)?;
        let mut bank = self.connected()?;
        let state = bank.pins.entry(pin).or_default();
        state.pull = pull;
        // An untouched input settles at its pull level
        state.level = match pull {
            Pull::Up => Level::High,
            Pull::Down | Pull::Off => state.level,
        };
        Ok(())
    }

    fn read(&self, pin: u8) -> Result<Level, GpioError> {
        Self::check_pin(pin)?;
        let bank = self.connected()?;
        Ok(bank.pins.get(&pin).copied().unwrap_or_default().level)
    }

    fn register_edge_callback(
        &self,
        pin: u8,
        edge: Edge,
        callback: EdgeCallback,
    ) -> Result<Box<dyn EdgeSubscription>, GpioError> {
        Self::check_pin(pin)?;
        let mut bank = self.connected()?;
        let id = bank.next_id;
        bank.next_id += 1;
        bank.subscribers.push(Subscriber {
            id,
            pin,
            edge,
            callback: Arc::new(callback),
        });
        debug!("sim pin {} subscribed ({:?}), id {}", pin, edge, id);

        Ok(Box::new(SimSubscription {
            bank: Arc::downgrade(&self.bank),
            id: Some(id),
        }))
    }
}

/// Subscription handle returned by [`SimGpio`]
struct SimSubscription {
    bank: Weak<Mutex<Bank>>,
    id: Option<u64>,
}

impl EdgeSubscription for SimSubscription {
    fn cancel(&mut self) {
        let Some(id) = self.id.take() else {
            debug!("sim subscription already cancelled");
            return;
        };
        if let Some(bank) = self.bank.upgrade() {
            let mut bank = bank.lock().unwrap_or_else(|e| e.into_inner());
            bank.subscribers.retain(|s| s.id != id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_drive_updates_level() {
        let gpio = SimGpio::new();
        assert_eq!(gpio.read(5).unwrap(), Level::Low);
        gpio.drive(5, Level::High);
        assert_eq!(gpio.read(5).unwrap(), Level::High);
        gpio.pulse_noise(5);
        assert_eq!(gpio.read(5).unwrap(), Level::High);
    }

    #[test]
    fn test_callbacks_follow_edge_filter() {
        let gpio = SimGpio::new();
        let rising = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&rising);
        let _sub = gpio
            .register_edge_callback(
                6,
                Edge::Rising,
                Box::new(move |_, level| {
                    if level == Level::High {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                }),
            )
            .unwrap();

        gpio.drive(6, Level::High);
        gpio.drive(6, Level::Low);
        gpio.drive(6, Level::High);
        assert_eq!(rising.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let gpio = SimGpio::new();
        let mut sub = gpio
            .register_edge_callback(13, Edge::Either, Box::new(|_, _| {}))
            .unwrap();
        assert_eq!(gpio.subscriptions(13), 1);
        sub.cancel();
        sub.cancel();
        assert_eq!(gpio.subscriptions(13), 0);
    }

    #[test]
    fn test_cancel_during_dispatch() {
        let gpio = SimGpio::new();
        let late: Arc<Mutex<Option<Box<dyn EdgeSubscription>>>> = Arc::new(Mutex::new(None));
        let seen = Arc::new(AtomicUsize::new(0));

        let slot = Arc::clone(&late);
        let _first = gpio
            .register_edge_callback(
                7,
                Edge::Either,
                Box::new(move |_, _| {
                    if let Some(mut sub) = slot.lock().unwrap().take() {
                        sub.cancel();
                    }
                }),
            )
            .unwrap();
        let counter = Arc::clone(&seen);
        let second = gpio
            .register_edge_callback(
                7,
                Edge::Either,
                Box::new(move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        *late.lock().unwrap() = Some(second);

        // Cancelled mid-dispatch: the in-flight edge still arrives
        gpio.drive(7, Level::High);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(gpio.subscriptions(7), 1);

        gpio.drive(7, Level::Low);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalid_pin_and_disconnect() {
        let gpio = SimGpio::new();
        assert_eq!(gpio.read(40), Err(GpioError::InvalidPin(40)));
        gpio.disconnect();
        assert_eq!(gpio.read(4), Err(GpioError::NotConnected));
    }

    #[test]
    fn test_pull_up_settles_high() {
        let gpio = SimGpio::new();
        gpio.set_pull(19, Pull::Up).unwrap();
        assert_eq!(gpio.pull(19), Pull::Up);
        assert_eq!(gpio.read(19).unwrap(), Level::High);
    }
}
