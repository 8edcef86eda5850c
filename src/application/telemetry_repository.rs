// Repository traits for the published telemetry documents
use crate::domain::station::TidePrediction;
use crate::domain::telemetry::{LatestDocument, SnapshotReading};
use crate::domain::track::PositionSample;
use async_trait::async_trait;

/// One entry of the snapshots index: a reference to a timestamped snapshot
/// file. The timestamp is the fallback when the file itself carries none.
#[derive(Debug, Clone)]
pub struct SnapshotRef {
    pub file: String,
    pub time_ms: Option<i64>,
}

#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// The most recent published telemetry document.
    async fn fetch_latest(&self) -> anyhow::Result<LatestDocument>;

    /// The snapshots index: references to the rolling window of snapshot files.
    async fn fetch_snapshot_index(&self) -> anyhow::Result<Vec<SnapshotRef>>;

    /// One referenced snapshot file, normalized to (time, path, value)
    /// readings. Non-numeric values are already dropped.
    async fn fetch_snapshot(&self, snapshot: &SnapshotRef) -> anyhow::Result<Vec<SnapshotReading>>;

    /// The positions index, normalized. Records with invalid coordinates are
    /// already dropped.
    async fn fetch_positions(&self) -> anyhow::Result<Vec<PositionSample>>;
}

#[async_trait]
pub trait TideRepository: Send + Sync {
    /// Tide predictions for a station. The source API only serves forward
    /// predictions; callers window them from "now".
    async fn fetch_predictions(&self, station_id: &str) -> anyhow::Result<Vec<TidePrediction>>;
}

/// Local key-value store for user preferences (unit selections).
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}
