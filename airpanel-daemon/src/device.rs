//! Appliance wiring
//!
//! Builds every component from the settings files, starts them, and shuts
//! them down in order once the stop flag is raised.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use airpanel_core::config::{
    ConfigSection, ConfigStore, ConfigWatcher, DEFAULT_VIEW_PERIOD, DISPLAY_SECTION,
    SENSORS_SECTION, VIEW_PERIOD_KEY,
};
use airpanel_core::interface::{IdleView, Interface};
use airpanel_core::menu::{MenuEngine, MenuError};
use airpanel_core::sensors::{Readings, SensorPoller};
use airpanel_core::switch::{KeyHandler, Switch, SwitchConfig, SwitchError};
use airpanel_core::timer::{RepeatTimer, TimerControl, TimerError};
use airpanel_display::{Key, KeyEvent, TextDisplay};
use airpanel_hal::SimGpio;
use log::{debug, info, warn};
use thiserror::Error;

use crate::{console, menus, simulated};

/// Button wiring (BCM numbering)
const PINS: [(Key, u8); 4] = [(Key::Up, 5), (Key::Down, 19), (Key::Cancel, 6), (Key::Ok, 13)];

/// How often `run` checks the stop flag
const STOP_POLL: Duration = Duration::from_millis(100);

/// Pin a key is wired to
pub fn pin_for(key: Key) -> u8 {
    PINS.iter()
        .find(|(k, _)| *k == key)
        .map_or(0, |&(_, pin)| pin)
}

/// Daemon settings, from the command line
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: PathBuf,
    pub display_config: PathBuf,
    pub rows: usize,
    pub cols: usize,
    pub watch_period: u64,
    pub console: bool,
    pub allow_power: bool,
}

/// Startup and runtime errors
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("menu: {0}")]
    Menu(#[from] MenuError),
    #[error("switch: {0}")]
    Switch(#[from] SwitchError),
    #[error("timer: {0}")]
    Timer(#[from] TimerError),
    #[error("I/O: {0}")]
    Io(#[from] io::Error),
}

/// The running appliance
pub struct Device {
    gpio: SimGpio,
    interface: Arc<Interface<TextDisplay>>,
    switches: Vec<Switch>,
    poller: Arc<SensorPoller>,
    watcher: ConfigWatcher,
    view_timer: Arc<RepeatTimer>,
}

impl Device {
    /// Build every component; nothing runs until [`start`](Self::start)
    pub fn new(settings: &Settings) -> Result<Self, DeviceError> {
        let store = Arc::new(ConfigStore::new());
        let sensors = ConfigSection::new(Arc::clone(&store), &settings.config, SENSORS_SECTION);
        let display_settings =
            ConfigSection::new(Arc::clone(&store), &settings.display_config, DISPLAY_SECTION);

        let readings = Arc::new(Readings::with_sink(Arc::new(simulated::LogSink)));

        let mut display = TextDisplay::new(settings.rows, settings.cols);
        if settings.console {
            display = display.with_presenter(console::presenter());
        }
        let menu = MenuEngine::new(
            menus::build(&sensors, &display_settings, settings.allow_power),
            settings.rows,
        )?;
        let idle = IdleView::new(Arc::clone(&readings), display_settings.clone());
        let interface = Arc::new(Interface::new(menu, display, idle));

        let gpio = SimGpio::new();
        let handler: KeyHandler = {
            let interface = Arc::clone(&interface);
            Arc::new(move |event: KeyEvent| interface.key_press(event))
        };
        let switches = PINS
            .iter()
            .map(|&(key, pin)| {
                Switch::new(key, pin, &gpio, Arc::clone(&handler), SwitchConfig::default())
            })
            .collect::<Result<Vec<_>, _>>()?;

        let poller = Arc::new(SensorPoller::new(simulated::sources(), readings, &sensors)?);

        let view_timer = {
            let interface = Arc::clone(&interface);
            Arc::new(RepeatTimer::new(
                "idle-view",
                view_period(&display_settings),
                move || interface.rotate_idle(),
            )?)
        };

        let watcher = ConfigWatcher::new(Duration::from_secs(settings.watch_period))?;
        watcher.watch(&settings.config);
        watcher.watch(&settings.display_config);
        {
            let poller = Arc::clone(&poller);
            let view_timer = Arc::clone(&view_timer);
            let interface = Arc::clone(&interface);
            watcher.add_listener(move |path: &Path| {
                if path == sensors.path() {
                    poller.apply_config(&sensors);
                } else if path == display_settings.path() {
                    apply_view_period(&view_timer, &display_settings);
                    interface.show_idle();
                }
            });
        }

        Ok(Self {
            gpio,
            interface,
            switches,
            poller,
            watcher,
            view_timer,
        })
    }

    /// Simulated pin bank the buttons are wired to
    pub fn gpio(&self) -> &SimGpio {
        &self.gpio
    }

    /// Background timers in shutdown order: sensors, watcher, idle view
    fn timers(&self) -> Vec<&dyn TimerControl> {
        let mut timers: Vec<&dyn TimerControl> = self.poller.timers().collect();
        timers.push(self.watcher.timer());
        timers.push(&*self.view_timer);
        timers
    }

    /// Show the idle view and start every timer
    pub fn start(&self) -> Result<(), DeviceError> {
        self.interface.show_idle();
        for timer in self.timers() {
            timer.start()?;
        }
        info!("device started");
        Ok(())
    }

    /// Start, block until `stop` is raised, then close
    pub fn run(&self, stop: &AtomicBool) -> Result<(), DeviceError> {
        let started = self.start();
        if started.is_ok() {
            while !stop.load(Ordering::SeqCst) {
                thread::sleep(STOP_POLL);
            }
            info!("stop requested");
        }
        self.close();
        started
    }

    /// Shut down: buttons, sensor timers, watcher, idle view, then the panel
    pub fn close(&self) {
        for switch in &self.switches {
            switch.close();
        }
        for timer in self.timers() {
            timer.cancel();
            debug!("{} stopped", timer.name());
        }
        self.interface.close();
        info!("device closed");
    }
}

fn view_period(display: &ConfigSection) -> Duration {
    Duration::from_secs(display.get_u64(VIEW_PERIOD_KEY, DEFAULT_VIEW_PERIOD))
}

fn apply_view_period(timer: &RepeatTimer, display: &ConfigSection) {
    let period = view_period(display);
    if period == timer.interval() {
        return;
    }
    match timer.set_interval(period) {
        Ok(()) => info!("view period now {:?}", period),
        Err(e) => warn!("view period not applied: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airpanel_core::sensors::SensorKind;
    use airpanel_core::timer::TimerState;
    use airpanel_hal::Level;
    use std::fs;

    fn settings(dir: &tempfile::TempDir) -> Settings {
        Settings {
            config: dir.path().join("sensors.toml"),
            display_config: dir.path().join("display.toml"),
            rows: 4,
            cols: 20,
            watch_period: 10,
            console: false,
            allow_power: false,
        }
    }

    fn click(gpio: &SimGpio, key: Key) {
        gpio.drive(pin_for(key), Level::High);
        thread::sleep(Duration::from_millis(150));
        gpio.drive(pin_for(key), Level::Low);
        thread::sleep(Duration::from_millis(150));
    }

    #[test]
    fn test_pin_wiring() {
        assert_eq!(pin_for(Key::Up), 5);
        assert_eq!(pin_for(Key::Down), 19);
        assert_eq!(pin_for(Key::Cancel), 6);
        assert_eq!(pin_for(Key::Ok), 13);
    }

    #[test]
    fn test_zero_watch_period_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(&dir);
        settings.watch_period = 0;
        assert!(matches!(Device::new(&settings), Err(DeviceError::Timer(_))));
    }

    #[test]
    fn test_button_opens_menu() {
        let dir = tempfile::tempdir().unwrap();
        let device = Device::new(&settings(&dir)).unwrap();
        device.start().unwrap();
        assert!(!device.interface.is_open());

        click(device.gpio(), Key::Ok);
        assert!(device.interface.is_open());
        click(device.gpio(), Key::Cancel);
        assert!(!device.interface.is_open());

        device.close();
        assert!(!device.interface.with_display(|d| d.is_on()));
    }

    #[test]
    fn test_sensor_edit_retimes_poller() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir);
        let device = Device::new(&settings).unwrap();
        assert_eq!(
            device.poller.period(SensorKind::Pressure),
            Some(Duration::from_secs(10))
        );

        fs::write(
            &settings.config,
            "[sensors_config]\npressure_bmp280_freq = \"30\"\n",
        )
        .unwrap();
        assert_eq!(device.watcher.check(), vec![settings.config.clone()]);
        assert_eq!(
            device.poller.period(SensorKind::Pressure),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            device.poller.period(SensorKind::Humidity),
            Some(Duration::from_secs(10))
        );
        device.close();
    }

    #[test]
    fn test_display_edit_retimes_view() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir);
        let device = Device::new(&settings).unwrap();
        assert_eq!(device.view_timer.interval(), Duration::from_secs(5));

        fs::write(
            &settings.display_config,
            "[display_config]\nview_period = \"20\"\n",
        )
        .unwrap();
        device.watcher.check();
        assert_eq!(device.view_timer.interval(), Duration::from_secs(20));
        device.close();
    }

    #[test]
    fn test_run_returns_after_stop() {
        let dir = tempfile::tempdir().unwrap();
        let device = Device::new(&settings(&dir)).unwrap();
        let stop = AtomicBool::new(true);
        device.run(&stop).unwrap();
        assert!(!device.interface.with_display(|d| d.is_on()));
    }

    #[test]
    fn test_close_cancels_every_timer() {
        let dir = tempfile::tempdir().unwrap();
        let device = Device::new(&settings(&dir)).unwrap();
        device.start().unwrap();

        let timers = device.timers();
        // Six measurements, the watcher and the idle view
        assert_eq!(timers.len(), 8);
        assert_eq!(timers[6].name(), "config-watch");
        assert_eq!(timers[7].name(), "idle-view");

        device.close();
        for timer in device.timers() {
            assert_eq!(timer.state(), TimerState::Cancelled, "{}", timer.name());
            assert!(timer.start().is_err());
        }
    }
}
