//! Latest measurement values

use std::sync::{Arc, Mutex};

use log::trace;

use super::SensorKind;
use crate::sync::lock;

/// Receives every stored measurement (time-series database writer)
pub trait ReadingSink: Send + Sync {
    /// Record one value
    fn add(&self, kind: SensorKind, value: f32);
}

/// Thread-safe table of the latest value per measurement
#[derive(Default)]
pub struct Readings {
    values: Mutex<[Option<f32>; 6]>,
    sink: Option<Arc<dyn ReadingSink>>,
}

impl Readings {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table that forwards every value to `sink`
    pub fn with_sink(sink: Arc<dyn ReadingSink>) -> Self {
        Self {
            values: Mutex::new([None; 6]),
            sink: Some(sink),
        }
    }

    /// Latest value, if any was measured yet
    pub fn get(&self, kind: SensorKind) -> Option<f32> {
        lock(&self.values)[kind.index()]
    }

    /// Store a value and forward it to the sink
    pub fn add(&self, kind: SensorKind, value: f32) {
        lock(&self.values)[kind.index()] = Some(value);
        trace!("{} = {}", kind, value);
        if let Some(sink) = &self.sink {
            sink.add(kind, value);
        }
    }

    /// Format a measurement for the panel, `--` when unknown
    pub fn format(&self, kind: SensorKind) -> String {
        match self.get(kind) {
            Some(value) => format!("{:.1} {}", value, kind.unit()),
            None => "--".to_string(),
        }
    }
}
