//! Sensor polling
//!
//! The measurements themselves come from external [`Sensor`] drivers. This
//! module keeps the latest value of each measurement and polls every one on
//! its own [`RepeatTimer`](crate::timer::RepeatTimer), at the period stored
//! in the sensor settings.

mod poller;
mod readings;

use core::fmt;

use thiserror::Error;

pub use poller::SensorPoller;
pub use readings::{ReadingSink, Readings};

/// Polling period used when the settings have no valid value, in seconds
pub const DEFAULT_PERIOD: u64 = 10;

/// Measurements the appliance reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SensorKind {
    /// Air temperature (DHT22)
    Temperature,
    /// Relative humidity (DHT22)
    Humidity,
    /// Air pressure (BMP280)
    Pressure,
    /// PM1.0 particle concentration (PMSA003-C)
    Pm1,
    /// PM2.5 particle concentration (PMSA003-C)
    Pm25,
    /// PM10 particle concentration (PMSA003-C)
    Pm10,
}

impl SensorKind {
    /// All measurements, in display order
    pub const ALL: [SensorKind; 6] = [
        SensorKind::Temperature,
        SensorKind::Humidity,
        SensorKind::Pressure,
        SensorKind::Pm1,
        SensorKind::Pm25,
        SensorKind::Pm10,
    ];

    /// Position in [`ALL`](Self::ALL)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Settings key holding the polling period
    pub fn period_key(self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature_dht22_freq",
            SensorKind::Humidity => "humidity_dht22_freq",
            SensorKind::Pressure => "pressure_bmp280_freq",
            SensorKind::Pm1 => "particle_pm1_pmsa003-c_freq",
            SensorKind::Pm25 => "particle_pm25_pmsa003-c_freq",
            SensorKind::Pm10 => "particle_pm10_pmsa003-c_freq",
        }
    }

    /// Display settings key of the show/hide flag
    pub fn flag_key(self) -> &'static str {
        match self {
            SensorKind::Temperature => "TEMPERATURE",
            SensorKind::Humidity => "HUMIDITY",
            SensorKind::Pressure => "PRESSURE",
            SensorKind::Pm1 => "PM1",
            SensorKind::Pm25 => "PM2_5",
            SensorKind::Pm10 => "PM10",
        }
    }

    /// Human readable name
    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Temperature => "Temperature",
            SensorKind::Humidity => "Humidity",
            SensorKind::Pressure => "Pressure",
            SensorKind::Pm1 => "PM1",
            SensorKind::Pm25 => "PM2.5",
            SensorKind::Pm10 => "PM10",
        }
    }

    /// Unit suffix
    pub fn unit(self) -> &'static str {
        match self {
            SensorKind::Temperature => "C",
            SensorKind::Humidity => "%",
            SensorKind::Pressure => "hPa",
            SensorKind::Pm1 | SensorKind::Pm25 | SensorKind::Pm10 => "ug/m3",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sensor errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    /// Device did not answer or returned garbage
    #[error("{0} unavailable: {1}")]
    Unavailable(SensorKind, String),
    /// Device does not measure this kind
    #[error("sensor cannot measure {0}")]
    WrongKind(SensorKind),
}

/// External measurement driver
pub trait Sensor: Send + Sync {
    /// Take one measurement
    fn read(&self, kind: SensorKind) -> Result<f32, SensorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_keys() {
        assert_eq!(SensorKind::Pm25.period_key(), "particle_pm25_pmsa003-c_freq");
        assert_eq!(SensorKind::Pm25.flag_key(), "PM2_5");
        assert_eq!(SensorKind::Pm25.to_string(), "PM2.5");
        for (i, kind) in SensorKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }
}
