//! Switch implementation

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use airpanel_display::{Key, KeyEvent};
use airpanel_hal::{Edge, EdgeSubscription, Gpio, Level, PinMode};
use log::{debug, info, trace, warn};

use super::{KeyHandler, SwitchConfig, SwitchError};
use crate::sync::lock;
use crate::timer::ResettableTimer;

/// Levels seen by one switch
#[derive(Debug, Clone, Copy)]
struct Levels {
    /// Last raw level reported by the backend
    raw: Level,
    /// Debounced level
    committed: Level,
}

/// One debounced push button
pub struct Switch {
    key: Key,
    pin: u8,
    active: Level,
    levels: Arc<Mutex<Levels>>,
    commits: Arc<AtomicU64>,
    debounce: Arc<ResettableTimer>,
    long_press: Arc<ResettableTimer>,
    subscription: Mutex<Option<Box<dyn EdgeSubscription>>>,
    closed: AtomicBool,
}

impl Switch {
    /// Configure `pin` as an input and start tracking it
    ///
    /// `handler` receives a click when a press is committed and a
    /// long-press when the button is still held `config.long_press` later.
    pub fn new(
        key: Key,
        pin: u8,
        gpio: &dyn Gpio,
        handler: KeyHandler,
        config: SwitchConfig,
    ) -> Result<Self, SwitchError> {
        gpio.set_mode(pin, PinMode::Input)?;
        gpio.set_pull(pin, config.pull)?;
        let initial = match gpio.read(pin)? {
            Level::NoChange => config.active.inverse(),
            level => level,
        };

        let levels = Arc::new(Mutex::new(Levels {
            raw: initial,
            committed: initial,
        }));
        let commits = Arc::new(AtomicU64::new(0));
        let active = config.active;

        let long_press = {
            let levels = Arc::clone(&levels);
            let handler = Arc::clone(&handler);
            Arc::new(ResettableTimer::spawn(
                &format!("{:?}-long", key).to_lowercase(),
                config.long_press,
                move || {
                    let held = lock(&levels).committed == active;
                    if held {
                        debug!("{:?} long press", key);
                        handler(KeyEvent::long(key));
                    }
                },
            )?)
        };

        let debounce = {
            let levels = Arc::clone(&levels);
            let commits = Arc::clone(&commits);
            let long_press = Arc::clone(&long_press);
            Arc::new(ResettableTimer::spawn(
                &format!("{:?}-debounce", key).to_lowercase(),
                config.debounce,
                move || {
                    let committed = {
                        let mut levels = lock(&levels);
                        if levels.raw == levels.committed {
                            return;
                        }
                        levels.committed = levels.raw;
                        levels.committed
                    };
                    commits.fetch_add(1, Ordering::SeqCst);

                    if committed == active {
                        trace!("{:?} pressed", key);
                        handler(KeyEvent::click(key));
                        if let Err(e) = long_press.reset(None) {
                            warn!("{:?} long-press timer: {}", key, e);
                        }
                    } else {
                        trace!("{:?} released", key);
                        if let Err(e) = long_press.stop() {
                            warn!("{:?} long-press timer: {}", key, e);
                        }
                    }
                },
            )?)
        };

        let subscription = {
            let levels = Arc::clone(&levels);
            let debounce = Arc::clone(&debounce);
            gpio.register_edge_callback(
                pin,
                Edge::Either,
                Box::new(move |_pin, level| {
                    if level == Level::NoChange {
                        return;
                    }
                    let mut levels = lock(&levels);
                    levels.raw = level;
                    let result = if level != levels.committed {
                        debounce.reset(None)
                    } else {
                        debounce.stop()
                    };
                    if let Err(e) = result {
                        debug!("{:?} edge after teardown: {}", key, e);
                    }
                }),
            )?
        };

        info!("switch {:?} on pin {} ready", key, pin);
        Ok(Self {
            key,
            pin,
            active,
            levels,
            commits,
            debounce,
            long_press,
            subscription: Mutex::new(Some(subscription)),
            closed: AtomicBool::new(false),
        })
    }

    /// Key reported by this switch
    pub fn key(&self) -> Key {
        self.key
    }

    /// Pin the switch listens on
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Debounced state
    pub fn is_pressed(&self) -> bool {
        lock(&self.levels).committed == self.active
    }

    /// Number of committed level changes so far
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Unsubscribe from edges and cancel both timers
    ///
    /// Returns once both timer threads have exited or the bounded join
    /// gave up. An edge the backend was already dispatching may still run
    /// the edge callback afterwards; it finds the debounce timer cancelled
    /// and emits nothing. Repeated calls are no-ops.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(mut subscription) = lock(&self.subscription).take() {
            subscription.cancel();
        }
        self.debounce.cancel();
        self.long_press.cancel();
        info!("switch {:?} closed", self.key);
    }
}

impl Drop for Switch {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airpanel_hal::SimGpio;
    use crossbeam_channel::{unbounded, Receiver};
    use proptest::prelude::*;
    use std::thread;
    use std::time::{Duration, Instant};

    const PIN: u8 = 5;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn switch(
        gpio: &SimGpio,
        debounce: u64,
        long_press: u64,
    ) -> (Switch, Receiver<(KeyEvent, Instant)>) {
        let (tx, rx) = unbounded();
        let handler: KeyHandler = Arc::new(move |event| {
            let _ = tx.send((event, Instant::now()));
        });
        let switch = Switch::new(
            Key::Up,
            PIN,
            gpio,
            handler,
            SwitchConfig::with_timing(ms(debounce), ms(long_press)),
        )
        .unwrap();
        (switch, rx)
    }

    #[test]
    fn test_configures_pin() {
        let gpio = SimGpio::new();
        let (switch, _rx) = switch(&gpio, 50, 500);
        assert_eq!(gpio.mode(PIN), PinMode::Input);
        assert_eq!(gpio.pull(PIN), airpanel_hal::Pull::Down);
        assert_eq!(gpio.subscriptions(PIN), 1);
        assert!(!switch.is_pressed());
        assert_eq!(switch.pin(), PIN);
        assert_eq!(switch.key(), Key::Up);
    }

    #[test]
    fn test_hold_emits_click_then_long_press() {
        let gpio = SimGpio::new();
        let (switch, rx) = switch(&gpio, 50, 500);

        let pressed_at = Instant::now();
        gpio.drive(PIN, Level::High);
        thread::sleep(ms(600));
        gpio.drive(PIN, Level::Low);
        let released_at = Instant::now();
        // The release is only committed once the debounce window passes
        assert!(switch.is_pressed());
        while switch.is_pressed() {
            assert!(released_at.elapsed() < ms(1000), "release never committed");
            thread::sleep(ms(2));
        }
        let release_after = pressed_at.elapsed();
        assert!(released_at.elapsed() >= ms(50));
        assert!(release_after >= ms(650) && release_after < ms(900));

        let (click, click_at) = rx.recv_timeout(ms(1000)).unwrap();
        assert_eq!(click, KeyEvent::click(Key::Up));
        let click_after = click_at.duration_since(pressed_at);
        assert!(click_after >= ms(50) && click_after < ms(300));

        let (long, long_at) = rx.recv_timeout(ms(1000)).unwrap();
        assert_eq!(long, KeyEvent::long(Key::Up));
        assert!(long_at.duration_since(pressed_at) >= ms(550));

        thread::sleep(ms(150));
        assert!(rx.try_recv().is_err());
        assert!(!switch.is_pressed());
        assert_eq!(switch.commits(), 2);
    }

    #[test]
    fn test_short_press_has_no_long_press() {
        let gpio = SimGpio::new();
        let (switch, rx) = switch(&gpio, 30, 300);

        gpio.drive(PIN, Level::High);
        thread::sleep(ms(120));
        gpio.drive(PIN, Level::Low);

        assert_eq!(rx.recv_timeout(ms(1000)).unwrap().0, KeyEvent::click(Key::Up));
        assert!(rx.recv_timeout(ms(500)).is_err());
        assert_eq!(switch.commits(), 2);
    }

    #[test]
    fn test_bounce_back_cancels_commit() {
        let gpio = SimGpio::new();
        let (switch, rx) = switch(&gpio, 60, 500);

        gpio.drive(PIN, Level::High);
        thread::sleep(ms(10));
        gpio.drive(PIN, Level::Low);

        assert!(rx.recv_timeout(ms(200)).is_err());
        assert_eq!(switch.commits(), 0);
    }

    #[test]
    fn test_no_change_is_ignored() {
        let gpio = SimGpio::new();
        let (switch, rx) = switch(&gpio, 60, 500);

        gpio.drive(PIN, Level::High);
        thread::sleep(ms(30));
        gpio.pulse_noise(PIN);

        // Commit happens 60ms after the real edge, not after the noise
        assert!(rx.recv_timeout(ms(1000)).is_ok());
        assert_eq!(switch.commits(), 1);
        assert!(switch.is_pressed());
    }

    #[test]
    fn test_close_unsubscribes() {
        let gpio = SimGpio::new();
        let (switch, rx) = switch(&gpio, 20, 200);
        switch.close();
        assert_eq!(gpio.subscriptions(PIN), 0);

        gpio.drive(PIN, Level::High);
        assert!(rx.recv_timeout(ms(100)).is_err());
        switch.close();
    }

    #[test]
    fn test_edge_in_flight_at_close_is_dropped() {
        let gpio = SimGpio::new();
        let target: Arc<Mutex<Option<Arc<Switch>>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&target);
        // Registered first, so it runs ahead of the switch's own callback
        let _closer = gpio
            .register_edge_callback(
                PIN,
                Edge::Either,
                Box::new(move |_, _| {
                    if let Some(switch) = slot.lock().unwrap().take() {
                        switch.close();
                    }
                }),
            )
            .unwrap();
        let (switch, rx) = switch(&gpio, 20, 200);
        let switch = Arc::new(switch);
        *target.lock().unwrap() = Some(Arc::clone(&switch));

        gpio.drive(PIN, Level::High);
        assert_eq!(gpio.subscriptions(PIN), 1);
        assert!(rx.recv_timeout(ms(200)).is_err());
        assert!(!switch.is_pressed());
        assert_eq!(switch.commits(), 0);
    }

    #[test]
    fn test_invalid_pin() {
        let gpio = SimGpio::new();
        let handler: KeyHandler = Arc::new(|_| {});
        assert!(matches!(
            Switch::new(Key::Ok, 200, &gpio, handler, SwitchConfig::default()),
            Err(SwitchError::Gpio(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn test_burst_commits_once(bounces in 1usize..24) {
            let gpio = SimGpio::new();
            let (switch, rx) = switch(&gpio, 40, 1000);

            for i in 0..bounces {
                let level = if i % 2 == 0 { Level::High } else { Level::Low };
                gpio.drive(PIN, level);
            }
            gpio.drive(PIN, Level::High);

            let first = rx.recv_timeout(ms(1000));
            prop_assert!(first.is_ok());
            thread::sleep(ms(100));
            prop_assert!(rx.try_recv().is_err());
            prop_assert_eq!(switch.commits(), 1);
        }
    }
}
