// Dashboard load cycle - non-blocking fan-out of the independent panels
use crate::application::performance_service::{NavContext, PerformancePanel, PerformanceService};
use crate::application::series_service::{SeriesMap, SeriesService};
use crate::application::telemetry_repository::TelemetryRepository;
use crate::application::tide_service::{TidePanel, TideService};
use crate::application::track_service::{TrackService, TrackView};
use crate::domain::telemetry::LatestDocument;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

const PANEL_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Series,
    Track,
    Tide,
    Performance,
}

impl Panel {
    pub fn name(&self) -> &'static str {
        match self {
            Panel::Series => "trends",
            Panel::Track => "track",
            Panel::Tide => "tide",
            Panel::Performance => "performance",
        }
    }
}

/// One message to the presentation sink. A panel either delivers its data or
/// a human-readable status; a failed panel never blocks the others.
#[derive(Debug)]
pub enum PanelUpdate {
    Series(Arc<SeriesMap>),
    Track(TrackView),
    Tide(TidePanel),
    Performance(PerformancePanel),
    Unavailable { panel: Panel, status: String },
    Complete { panels: usize, duration_ms: i64 },
}

pub struct DashboardService {
    repository: Arc<dyn TelemetryRepository>,
    series: Arc<SeriesService>,
    tracks: Arc<TrackService>,
    tides: Arc<TideService>,
    performance: Arc<PerformanceService>,
    fallback_position: (f64, f64),
}

impl DashboardService {
    pub fn new(
        repository: Arc<dyn TelemetryRepository>,
        series: Arc<SeriesService>,
        tracks: Arc<TrackService>,
        tides: Arc<TideService>,
        performance: Arc<PerformanceService>,
        fallback_position: (f64, f64),
    ) -> Self {
        Self {
            repository,
            series,
            tracks,
            tides,
            performance,
            fallback_position,
        }
    }

    /// Runs one load cycle. The panels are kicked off without awaiting one
    /// another, so a slow tide API cannot delay the track or trend panels;
    /// each update arrives on the channel as its panel finishes, followed by
    /// a completion event once every panel has reported.
    pub async fn load_cycle(&self) -> mpsc::Receiver<PanelUpdate> {
        let (tx, rx) = mpsc::channel(100);
        let started = Instant::now();

        // The current nav/env document is captured once up front: the
        // performance panel and the station query both read it.
        let latest = match self.repository.fetch_latest().await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("Latest telemetry unavailable: {}", e);
                LatestDocument::default()
            }
        };

        let context = NavContext::from_latest(&latest);
        let update = match self.performance.report(&context) {
            Some(panel) => PanelUpdate::Performance(panel),
            None => PanelUpdate::Unavailable {
                panel: Panel::Performance,
                status: "awaiting wind and speed readings".to_string(),
            },
        };
        let _ = tx.send(update).await;

        let mut handles = Vec::new();

        let series = self.series.clone();
        let series_tx = tx.clone();
        handles.push(tokio::spawn(async move {
            let update = match series.build().await {
                Ok(map) => PanelUpdate::Series(map),
                Err(e) => PanelUpdate::Unavailable {
                    panel: Panel::Series,
                    status: format!("trend data unavailable: {e:#}"),
                },
            };
            let _ = series_tx.send(update).await;
        }));

        let tracks = self.tracks.clone();
        let track_tx = tx.clone();
        handles.push(tokio::spawn(async move {
            let update = match tracks.build_tracks().await {
                Ok(view) => PanelUpdate::Track(view),
                Err(e) => PanelUpdate::Unavailable {
                    panel: Panel::Track,
                    status: format!("track history unavailable: {e:#}"),
                },
            };
            let _ = track_tx.send(update).await;
        }));

        let (lat, lon) = latest.position.unwrap_or(self.fallback_position);
        let tides = self.tides.clone();
        let tide_tx = tx.clone();
        handles.push(tokio::spawn(async move {
            let update = match tides.resolve(lat, lon).await {
                Ok(panel) => PanelUpdate::Tide(panel),
                Err(e) => PanelUpdate::Unavailable {
                    panel: Panel::Tide,
                    status: e.to_string(),
                },
            };
            let _ = tide_tx.send(update).await;
        }));

        // Completion after every panel task has reported
        tokio::spawn(async move {
            for handle in handles {
                let _ = handle.await;
            }
            let _ = tx
                .send(PanelUpdate::Complete {
                    panels: PANEL_COUNT,
                    duration_ms: started.elapsed().as_millis() as i64,
                })
                .await;
        });

        rx
    }
}
