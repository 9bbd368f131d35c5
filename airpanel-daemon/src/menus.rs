//! The appliance's settings menu

use std::process::Command;

use airpanel_core::config::{ConfigSection, DEFAULT_VIEW_PERIOD, VIEW_PERIOD_KEY};
use airpanel_core::menu::{FrequencyChoice, MenuItem, OnOffSetting};
use airpanel_core::sensors::{SensorKind, DEFAULT_PERIOD};
use log::{error, info, warn};

const CLIMATE_PERIODS: &[u64] = &[5, 10, 15, 30, 60, 120, 240];
const PRESSURE_PERIODS: &[u64] = &[1, 2, 3, 5, 10, 15, 30, 60, 120, 240];
const PARTICLE_PERIODS: &[u64] = &[3, 5, 10, 15, 30, 60, 120, 240];
const VIEW_PERIODS: &[u64] = &[4, 5, 10, 20];

/// System power actions behind the last two root entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Reboot,
    PowerOff,
}

impl PowerAction {
    fn verb(self) -> &'static str {
        match self {
            PowerAction::Reboot => "reboot",
            PowerAction::PowerOff => "poweroff",
        }
    }

    /// Ask systemd for the action; only logs unless `allowed`
    pub fn run(self, allowed: bool) {
        if !allowed {
            warn!("{} requested, ignored (power actions disabled)", self.verb());
            return;
        }
        info!("running systemctl {}", self.verb());
        match Command::new("systemctl").arg(self.verb()).status() {
            Ok(status) if status.success() => {}
            Ok(status) => error!("systemctl {} failed: {}", self.verb(), status),
            Err(e) => error!("systemctl {} failed: {}", self.verb(), e),
        }
    }
}

fn periods(kind: SensorKind) -> &'static [u64] {
    match kind {
        SensorKind::Temperature | SensorKind::Humidity => CLIMATE_PERIODS,
        SensorKind::Pressure => PRESSURE_PERIODS,
        SensorKind::Pm1 | SensorKind::Pm25 | SensorKind::Pm10 => PARTICLE_PERIODS,
    }
}

/// Build the root menu
///
/// `sensors` is the shared sensor settings section and `display` the
/// panel's own.
pub fn build(sensors: &ConfigSection, display: &ConfigSection, allow_power: bool) -> MenuItem {
    let measurement_periods = SensorKind::ALL
        .into_iter()
        .map(|kind| {
            let choice = FrequencyChoice::new(
                kind.name(),
                sensors.clone(),
                kind.period_key(),
                periods(kind).to_vec(),
                DEFAULT_PERIOD,
            );
            MenuItem::leaf(kind.name(), choice)
        })
        .collect();

    let show_measurements = SensorKind::ALL
        .into_iter()
        .map(|kind| {
            let setting = OnOffSetting::new(kind.name(), display.clone(), kind.flag_key());
            MenuItem::leaf(kind.name(), setting)
        })
        .collect();

    let view_period = FrequencyChoice::new(
        "View Period",
        display.clone(),
        VIEW_PERIOD_KEY,
        VIEW_PERIODS.to_vec(),
        DEFAULT_VIEW_PERIOD,
    );

    MenuItem::list(
        "",
        vec![
            MenuItem::list("Measurements Period", measurement_periods),
            MenuItem::list(
                "Display Settings",
                vec![
                    MenuItem::leaf("View Period", view_period),
                    MenuItem::list("Show Measurements", show_measurements),
                ],
            ),
            MenuItem::leaf("Reboot", move |_: &mut String| PowerAction::Reboot.run(allow_power)),
            MenuItem::leaf("Power off", move |_: &mut String| {
                PowerAction::PowerOff.run(allow_power)
            }),
        ],
    )
}
