// Sailing performance - polar speed, performance ratio, VMG from the live context
use crate::domain::polar::{performance_pct, vmg_kn, PolarTable};
use crate::domain::telemetry::LatestDocument;
use crate::domain::units::ms_to_knots;
use std::sync::Arc;

/// Live inputs for one load cycle, converted to degrees and knots at this
/// boundary. The engine itself never sees radians or m/s.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavContext {
    pub twa_deg: Option<f64>,
    pub tws_kn: Option<f64>,
    pub sog_kn: Option<f64>,
    pub bearing_deg: Option<f64>,
}

impl NavContext {
    /// SignalK publishes angles in radians and speeds in m/s.
    pub fn from_latest(doc: &LatestDocument) -> Self {
        Self {
            twa_deg: doc
                .numeric("environment.wind.angleTrueWater")
                .map(f64::to_degrees),
            tws_kn: doc.numeric("environment.wind.speedTrue").map(ms_to_knots),
            sog_kn: doc.numeric("navigation.speedOverGround").map(ms_to_knots),
            bearing_deg: doc
                .numeric("navigation.courseGreatCircle.nextPoint.bearingTrue")
                .map(f64::to_degrees),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VmgStatus {
    /// No destination is configured. Reported explicitly rather than as a
    /// numeric 0, which would read as "no progress".
    NoDestination,
    Toward { vmg_kn: f64, polar_vmg_kn: f64 },
}

#[derive(Debug, Clone, Copy)]
pub struct PerformancePanel {
    pub polar_speed_kn: f64,
    pub performance_pct: f64,
    pub vmg: VmgStatus,
}

pub struct PerformanceService {
    polar: Arc<PolarTable>,
}

impl PerformanceService {
    pub fn new(polar: Arc<PolarTable>) -> Self {
        Self { polar }
    }

    /// Computes the performance panel, or None while wind or speed readings
    /// are missing from the context.
    pub fn report(&self, context: &NavContext) -> Option<PerformancePanel> {
        let twa = context.twa_deg?;
        let tws = context.tws_kn?;
        let sog = context.sog_kn?;
        let polar_speed = self.polar.polar_speed_kn(twa, tws)?;

        let vmg = match context.bearing_deg {
            Some(bearing) => VmgStatus::Toward {
                vmg_kn: vmg_kn(sog, bearing),
                polar_vmg_kn: vmg_kn(polar_speed, bearing),
            },
            None => VmgStatus::NoDestination,
        };

        Some(PerformancePanel {
            polar_speed_kn: polar_speed,
            performance_pct: performance_pct(sog, polar_speed),
            vmg,
        })
    }
}
