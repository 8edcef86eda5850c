// Track reconstruction - position history to calendar-day polylines
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::track::{bucket_by_day, DayTrack, LegendEntry, PositionSample};
use crate::domain::units::{UnitRegistry, NOT_AVAILABLE};
use anyhow::Context;
use chrono::{Local, LocalResult, TimeZone, Utc};
use std::sync::Arc;

const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Clone)]
pub struct TrackView {
    pub tracks: Vec<DayTrack>,
    pub legend: Vec<LegendEntry>,
}

pub struct TrackService {
    repository: Arc<dyn TelemetryRepository>,
    registry: Arc<UnitRegistry>,
    retention_days: i64,
}

impl TrackService {
    pub fn new(
        repository: Arc<dyn TelemetryRepository>,
        registry: Arc<UnitRegistry>,
        retention_days: i64,
    ) -> Self {
        Self {
            repository,
            registry,
            retention_days,
        }
    }

    pub async fn build_tracks(&self) -> anyhow::Result<TrackView> {
        let records = self
            .repository
            .fetch_positions()
            .await
            .context("fetching positions index")?;
        let total = records.len();

        let cutoff_ms = Utc::now().timestamp_millis() - self.retention_days * DAY_MS;
        let kept: Vec<PositionSample> = records
            .into_iter()
            .filter(|s| s.has_valid_coordinates())
            // records without a timestamp cannot be window-filtered; keep them
            .filter(|s| s.time_ms.is_none_or(|t| t >= cutoff_ms))
            .collect();
        tracing::debug!("Keeping {} of {} position records", kept.len(), total);

        let mut tracks = bucket_by_day(kept);
        for track in &mut tracks {
            track.labels = track.points.iter().map(|p| self.point_label(p)).collect();
        }

        let legend = tracks
            .iter()
            .map(|t| LegendEntry {
                day_key: t.day_key.clone(),
                color: t.color,
                sample_count: t.points.len(),
            })
            .collect();

        Ok(TrackView { tracks, legend })
    }

    /// Tooltip line for one track vertex: local time, speed, course.
    fn point_label(&self, sample: &PositionSample) -> String {
        let time = match sample.time_ms {
            Some(ms) => match Local.timestamp_millis_opt(ms) {
                LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
                _ => NOT_AVAILABLE.to_string(),
            },
            None => NOT_AVAILABLE.to_string(),
        };
        let speed = self.registry.format("speed", sample.sog_ms);
        let course = match sample.cog_deg.filter(|c| c.is_finite()) {
            Some(course) => format!("{:.0}°", course),
            None => NOT_AVAILABLE.to_string(),
        };
        format!("{} | {} | {}", time, speed, course)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::telemetry_repository::SnapshotRef;
    use crate::domain::telemetry::{LatestDocument, SnapshotReading};
    use crate::domain::track::UNKNOWN_DAY;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FakePositions {
        records: Vec<PositionSample>,
    }

    #[async_trait]
    impl TelemetryRepository for FakePositions {
        async fn fetch_latest(&self) -> anyhow::Result<LatestDocument> {
            Ok(LatestDocument::default())
        }

        async fn fetch_snapshot_index(&self) -> anyhow::Result<Vec<SnapshotRef>> {
            Ok(Vec::new())
        }

        async fn fetch_snapshot(&self, _: &SnapshotRef) -> anyhow::Result<Vec<SnapshotReading>> {
            Ok(Vec::new())
        }

        async fn fetch_positions(&self) -> anyhow::Result<Vec<PositionSample>> {
            Ok(self.records.clone())
        }
    }

    fn service(records: Vec<PositionSample>) -> TrackService {
        TrackService::new(
            Arc::new(FakePositions { records }),
            Arc::new(UnitRegistry::from_indices(&HashMap::new())),
            24,
        )
    }

    fn position(time_ms: Option<i64>, lat: f64, lon: f64) -> PositionSample {
        PositionSample {
            latitude: lat,
            longitude: lon,
            time_ms,
            sog_ms: Some(2.5),
            cog_deg: Some(180.0),
        }
    }

    #[tokio::test]
    async fn test_missing_timestamp_lands_in_unknown_bucket() {
        let now = Utc::now().timestamp_millis();
        let view = service(vec![
            position(Some(now), 37.80, -122.46),
            position(None, 37.81, -122.45),
        ])
        .build_tracks()
        .await
        .unwrap();

        assert_eq!(view.tracks.len(), 2);
        let unknown = view.tracks.last().unwrap();
        assert_eq!(unknown.day_key, UNKNOWN_DAY);
        assert_eq!(unknown.points.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_coordinates_are_dropped() {
        let now = Utc::now().timestamp_millis();
        let view = service(vec![
            position(Some(now), f64::NAN, -122.46),
            position(Some(now), 37.80, -122.46),
        ])
        .build_tracks()
        .await
        .unwrap();

        assert_eq!(view.tracks.len(), 1);
        assert_eq!(view.tracks[0].points.len(), 1);
    }

    #[tokio::test]
    async fn test_records_outside_retention_window_are_dropped() {
        let now = Utc::now().timestamp_millis();
        let view = service(vec![
            position(Some(now - 30 * DAY_MS), 37.70, -122.40),
            position(Some(now), 37.80, -122.46),
        ])
        .build_tracks()
        .await
        .unwrap();

        assert_eq!(view.tracks.len(), 1);
    }

    #[tokio::test]
    async fn test_labels_and_legend_match_buckets() {
        let now = Utc::now().timestamp_millis();
        let view = service(vec![
            position(Some(now - DAY_MS), 37.79, -122.45),
            position(Some(now), 37.80, -122.46),
            position(Some(now), 37.81, -122.47),
        ])
        .build_tracks()
        .await
        .unwrap();

        assert_eq!(view.legend.len(), view.tracks.len());
        for (track, entry) in view.tracks.iter().zip(&view.legend) {
            assert_eq!(track.labels.len(), track.points.len());
            assert_eq!(entry.sample_count, track.points.len());
            assert_eq!(entry.color, track.color);
        }
        // speed formatted with the default unit
        assert!(view.tracks[0].labels[0].contains("kn"));
    }
}
