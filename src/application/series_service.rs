// Snapshot series builder - merges the rolling snapshot window into per-metric series
use crate::application::telemetry_repository::{SnapshotRef, TelemetryRepository};
use crate::domain::telemetry::{MetricSeries, SeriesPoint};
use crate::domain::units::path_group;
use anyhow::Context;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

pub type SeriesMap = BTreeMap<String, MetricSeries>;

/// Builds per-metric trend series from the snapshot window. The build is a
/// single-flight operation per window size: concurrent first callers share
/// one fetch wave and one sorted result for the life of the session.
pub struct SeriesService {
    repository: Arc<dyn TelemetryRepository>,
    window: usize,
    cells: Mutex<HashMap<usize, Arc<OnceCell<Arc<SeriesMap>>>>>,
    building: AtomicUsize,
}

impl SeriesService {
    pub fn new(repository: Arc<dyn TelemetryRepository>, window: usize) -> Self {
        Self {
            repository,
            window,
            cells: Mutex::new(HashMap::new()),
            building: AtomicUsize::new(0),
        }
    }

    pub async fn build(&self) -> anyhow::Result<Arc<SeriesMap>> {
        self.build_window(self.window).await
    }

    pub async fn build_window(&self, window: usize) -> anyhow::Result<Arc<SeriesMap>> {
        let cell = {
            let mut cells = self.cells.lock().expect("series cache lock");
            cells.entry(window).or_default().clone()
        };
        cell.get_or_try_init(|| self.build_uncached(window))
            .await
            .map(Arc::clone)
    }

    /// Whether a build is currently in flight.
    pub fn is_building(&self) -> bool {
        self.building.load(Ordering::SeqCst) > 0
    }

    async fn build_uncached(&self, window: usize) -> anyhow::Result<Arc<SeriesMap>> {
        self.building.fetch_add(1, Ordering::SeqCst);
        let result = self.build_inner(window).await;
        self.building.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn build_inner(&self, window: usize) -> anyhow::Result<Arc<SeriesMap>> {
        let index = self
            .repository
            .fetch_snapshot_index()
            .await
            .context("fetching snapshot index")?;

        // One fetch per distinct file, most recent `window` references
        let mut seen = HashSet::new();
        let mut refs: Vec<SnapshotRef> = index
            .into_iter()
            .filter(|r| seen.insert(r.file.clone()))
            .collect();
        refs.sort_by_key(|r| r.time_ms);
        if refs.len() > window {
            refs.drain(..refs.len() - window);
        }

        let fetches = refs.iter().map(|r| self.repository.fetch_snapshot(r));
        let results = futures::future::join_all(fetches).await;

        let mut merged: BTreeMap<String, Vec<SeriesPoint>> = BTreeMap::new();
        for (snapshot, result) in refs.iter().zip(results) {
            match result {
                Ok(readings) => {
                    for reading in readings {
                        merged
                            .entry(reading.path)
                            .or_default()
                            .push(SeriesPoint::new(reading.time_ms, reading.value));
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping snapshot {}: {}", snapshot.file, e);
                }
            }
        }

        let mut series = SeriesMap::new();
        for (path, mut points) in merged {
            // stable sort keeps duplicate timestamps in arrival order
            points.sort_by_key(|p| p.time_ms);
            if points.len() > window {
                points.drain(..points.len() - window);
            }
            let unit_group = path_group(&path);
            series.insert(path.clone(), MetricSeries::new(path, unit_group, points));
        }

        tracing::debug!("Built {} metric series from {} snapshots", series.len(), refs.len());
        Ok(Arc::new(series))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::{LatestDocument, SnapshotReading};
    use crate::domain::track::PositionSample;
    use async_trait::async_trait;

    const SOG: &str = "navigation.speedOverGround";

    #[derive(Default)]
    struct FakeRepository {
        index: Vec<SnapshotRef>,
        snapshots: HashMap<String, Vec<SnapshotReading>>,
        failing_files: HashSet<String>,
        fail_index: bool,
        index_fetches: AtomicUsize,
    }

    #[async_trait]
    impl TelemetryRepository for FakeRepository {
        async fn fetch_latest(&self) -> anyhow::Result<LatestDocument> {
            Ok(LatestDocument::default())
        }

        async fn fetch_snapshot_index(&self) -> anyhow::Result<Vec<SnapshotRef>> {
            self.index_fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail_index {
                anyhow::bail!("index unavailable");
            }
            Ok(self.index.clone())
        }

        async fn fetch_snapshot(
            &self,
            snapshot: &SnapshotRef,
        ) -> anyhow::Result<Vec<SnapshotReading>> {
            if self.failing_files.contains(&snapshot.file) {
                anyhow::bail!("404 not found");
            }
            Ok(self.snapshots.get(&snapshot.file).cloned().unwrap_or_default())
        }

        async fn fetch_positions(&self) -> anyhow::Result<Vec<PositionSample>> {
            Ok(Vec::new())
        }
    }

    fn reference(file: &str, time_ms: i64) -> SnapshotRef {
        SnapshotRef {
            file: file.to_string(),
            time_ms: Some(time_ms),
        }
    }

    fn reading(time_ms: i64, path: &str, value: f64) -> SnapshotReading {
        SnapshotReading::new(time_ms, path.to_string(), value)
    }

    fn repo_with(
        index: Vec<SnapshotRef>,
        snapshots: Vec<(&str, Vec<SnapshotReading>)>,
    ) -> FakeRepository {
        FakeRepository {
            index,
            snapshots: snapshots
                .into_iter()
                .map(|(f, r)| (f.to_string(), r))
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_three_file_window_yields_ascending_series() {
        let repo = repo_with(
            vec![
                reference("s1.json", 1_000),
                reference("s2.json", 2_000),
                reference("s3.json", 3_000),
            ],
            vec![
                ("s1.json", vec![reading(1_000, SOG, 1.0)]),
                ("s2.json", vec![reading(2_000, SOG, 2.0)]),
                ("s3.json", vec![reading(3_000, SOG, 3.0)]),
            ],
        );
        let service = SeriesService::new(Arc::new(repo), 60);

        let series = service.build().await.unwrap();
        let points = &series.get(SOG).unwrap().points;
        assert_eq!(points.len(), 3);
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        assert!(points.windows(2).all(|w| w[0].time_ms <= w[1].time_ms));
    }

    #[tokio::test]
    async fn test_overlapping_paths_merge_sorted() {
        let repo = repo_with(
            vec![reference("a.json", 0), reference("b.json", 0)],
            vec![
                (
                    "a.json",
                    vec![
                        reading(3_000, SOG, 3.0),
                        reading(1_000, "environment.wind.speedTrue", 6.0),
                    ],
                ),
                ("b.json", vec![reading(2_000, SOG, 2.0)]),
            ],
        );
        let service = SeriesService::new(Arc::new(repo), 60);

        let series = service.build().await.unwrap();
        assert_eq!(series.len(), 2);
        let times: Vec<i64> = series.get(SOG).unwrap().points.iter().map(|p| p.time_ms).collect();
        assert_eq!(times, vec![2_000, 3_000]);
    }

    #[tokio::test]
    async fn test_duplicate_timestamps_are_kept() {
        let repo = repo_with(
            vec![reference("a.json", 0), reference("b.json", 0)],
            vec![
                ("a.json", vec![reading(1_000, SOG, 1.0)]),
                ("b.json", vec![reading(1_000, SOG, 1.5)]),
            ],
        );
        let service = SeriesService::new(Arc::new(repo), 60);

        let series = service.build().await.unwrap();
        assert_eq!(series.get(SOG).unwrap().points.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_file_references_fetch_once() {
        let repo = repo_with(
            vec![reference("a.json", 1_000), reference("a.json", 1_000)],
            vec![("a.json", vec![reading(1_000, SOG, 1.0)])],
        );
        let service = SeriesService::new(Arc::new(repo), 60);

        let series = service.build().await.unwrap();
        assert_eq!(series.get(SOG).unwrap().points.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_snapshot_is_skipped_not_fatal() {
        let mut repo = repo_with(
            vec![reference("ok.json", 1_000), reference("gone.json", 2_000)],
            vec![("ok.json", vec![reading(1_000, SOG, 1.0)])],
        );
        repo.failing_files.insert("gone.json".to_string());
        let service = SeriesService::new(Arc::new(repo), 60);

        let series = service.build().await.unwrap();
        assert_eq!(series.get(SOG).unwrap().points.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_index_is_an_error() {
        let repo = FakeRepository {
            fail_index: true,
            ..Default::default()
        };
        let service = SeriesService::new(Arc::new(repo), 60);
        assert!(service.build().await.is_err());
    }

    #[tokio::test]
    async fn test_series_capped_to_window() {
        let repo = repo_with(
            vec![
                reference("s1.json", 1_000),
                reference("s2.json", 2_000),
                reference("s3.json", 3_000),
            ],
            vec![
                ("s1.json", vec![reading(1_000, SOG, 1.0)]),
                ("s2.json", vec![reading(2_000, SOG, 2.0)]),
                ("s3.json", vec![reading(3_000, SOG, 3.0)]),
            ],
        );
        let service = SeriesService::new(Arc::new(repo), 2);

        let series = service.build().await.unwrap();
        let values: Vec<f64> = series.get(SOG).unwrap().points.iter().map(|p| p.value).collect();
        // the two most recent survive
        assert_eq!(values, vec![2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_concurrent_builds_share_one_fetch_wave() {
        let repo = Arc::new(repo_with(
            vec![reference("a.json", 1_000)],
            vec![("a.json", vec![reading(1_000, SOG, 1.0)])],
        ));
        let service = Arc::new(SeriesService::new(repo.clone(), 60));

        let (first, second) = tokio::join!(service.build(), service.build());
        assert!(first.is_ok() && second.is_ok());
        assert_eq!(repo.index_fetches.load(Ordering::SeqCst), 1);
        assert!(!service.is_building());
    }

    #[tokio::test]
    async fn test_unit_group_resolved_by_path() {
        let repo = repo_with(
            vec![reference("a.json", 1_000)],
            vec![(
                "a.json",
                vec![
                    reading(1_000, SOG, 1.0),
                    reading(1_000, "tanks.freshWater.level", 0.5),
                ],
            )],
        );
        let service = SeriesService::new(Arc::new(repo), 60);

        let series = service.build().await.unwrap();
        assert_eq!(series.get(SOG).unwrap().unit_group, Some("speed"));
        assert_eq!(series.get("tanks.freshWater.level").unwrap().unit_group, None);
    }
}
