//! Simulated sensor devices
//!
//! Stand-ins for the DHT22, BMP280 and PMSA003-C drivers. Values drift
//! slowly over time so the idle view has something to show.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use airpanel_core::sensors::{ReadingSink, Sensor, SensorError, SensorKind};
use log::debug;

/// One simulated device measuring a fixed set of kinds
pub struct SimulatedSensor {
    name: &'static str,
    kinds: &'static [SensorKind],
    started: Instant,
    /// Every n-th read fails; 0 never fails
    fail_every: u32,
    reads: AtomicU32,
}

impl SimulatedSensor {
    /// Create a new device
    pub fn new(name: &'static str, kinds: &'static [SensorKind], fail_every: u32) -> Self {
        Self {
            name,
            kinds,
            started: Instant::now(),
            fail_every,
            reads: AtomicU32::new(0),
        }
    }

    fn value(&self, kind: SensorKind) -> f32 {
        let t = self.started.elapsed().as_secs_f32();
        match kind {
            SensorKind::Temperature => 22.0 + 3.0 * (t / 120.0).sin(),
            SensorKind::Humidity => 50.0 + 10.0 * (t / 180.0).sin(),
            SensorKind::Pressure => 1013.0 + 4.0 * (t / 600.0).sin(),
            SensorKind::Pm1 => 4.0 + 2.0 * (t / 90.0).sin().abs(),
            SensorKind::Pm25 => 8.0 + 4.0 * (t / 90.0).sin().abs(),
            SensorKind::Pm10 => 12.0 + 6.0 * (t / 90.0).sin().abs(),
        }
    }
}

impl Sensor for SimulatedSensor {
    fn read(&self, kind: SensorKind) -> Result<f32, SensorError> {
        if !self.kinds.contains(&kind) {
            return Err(SensorError::WrongKind(kind));
        }
        let read = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every > 0 && read % self.fail_every == 0 {
            return Err(SensorError::Unavailable(kind, format!("{} checksum error", self.name)));
        }
        Ok(self.value(kind))
    }
}

/// The appliance's three devices, wired to the kinds they measure
pub fn sources() -> Vec<(SensorKind, Arc<dyn Sensor>)> {
    let dht: Arc<dyn Sensor> = Arc::new(SimulatedSensor::new(
        "dht22",
        &[SensorKind::Temperature, SensorKind::Humidity],
        // One-wire reads of the DHT22 fail now and then
        7,
    ));
    let bmp: Arc<dyn Sensor> = Arc::new(SimulatedSensor::new("bmp280", &[SensorKind::Pressure], 0));
    let pmsa: Arc<dyn Sensor> = Arc::new(SimulatedSensor::new(
        "pmsa003-c",
        &[SensorKind::Pm1, SensorKind::Pm25, SensorKind::Pm10],
        0,
    ));

    vec![
        (SensorKind::Temperature, Arc::clone(&dht)),
        (SensorKind::Humidity, dht),
        (SensorKind::Pressure, bmp),
        (SensorKind::Pm1, Arc::clone(&pmsa)),
        (SensorKind::Pm25, Arc::clone(&pmsa)),
        (SensorKind::Pm10, pmsa),
    ]
}

/// Sink that logs every value in place of the time-series database
pub struct LogSink;

impl ReadingSink for LogSink {
    fn add(&self, kind: SensorKind, value: f32) {
        debug!("reading {}={}", kind.flag_key(), value);
    }
}
