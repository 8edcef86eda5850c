// Telemetry series domain models
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub time_ms: i64,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

/// One normalized reading extracted from a snapshot document.
#[derive(Debug, Clone)]
pub struct SnapshotReading {
    pub time_ms: i64,
    pub path: String,
    pub value: f64,
}

impl SnapshotReading {
    pub fn new(time_ms: i64, path: String, value: f64) -> Self {
        Self {
            time_ms,
            path,
            value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricSeries {
    pub path: String,
    pub unit_group: Option<&'static str>,
    pub points: Vec<SeriesPoint>,
}

impl MetricSeries {
    pub fn new(path: String, unit_group: Option<&'static str>, points: Vec<SeriesPoint>) -> Self {
        Self {
            path,
            unit_group,
            points,
        }
    }
}

/// The most recent published telemetry document, flattened to dotted paths.
/// Only finite numeric readings are kept; the vessel position is pulled out
/// separately since it is the one non-scalar value the viewer needs.
#[derive(Debug, Clone, Default)]
pub struct LatestDocument {
    pub numbers: HashMap<String, f64>,
    pub position: Option<(f64, f64)>,
}

impl LatestDocument {
    pub fn numeric(&self, path: &str) -> Option<f64> {
        self.numbers.get(path).copied()
    }
}
