// Presentation sink - where computed panels leave the analytics core
use crate::application::dashboard_service::PanelUpdate;
use crate::application::performance_service::VmgStatus;
use crate::domain::units::UnitRegistry;
use std::sync::Arc;
use tokio::sync::mpsc;

/// The rendering layer as the core sees it: a one-way target for computed
/// values and formatted strings.
pub trait DashboardSink: Send + Sync {
    fn render(&self, update: PanelUpdate);
}

/// Writes panel summaries to the log. Stands in for the page renderer when
/// the viewer runs headless.
pub struct LogSink {
    registry: Arc<UnitRegistry>,
}

impl LogSink {
    pub fn new(registry: Arc<UnitRegistry>) -> Self {
        Self { registry }
    }
}

impl DashboardSink for LogSink {
    fn render(&self, update: PanelUpdate) {
        match update {
            PanelUpdate::Series(map) => {
                tracing::info!("trends: {} metric series", map.len());
                for (path, series) in map.iter() {
                    let latest = series.points.last().map(|p| p.value);
                    tracing::info!(
                        "  {}: {} samples, latest {}",
                        path,
                        series.points.len(),
                        self.registry.format_path(path, latest)
                    );
                }
            }
            PanelUpdate::Track(view) => {
                tracing::info!("track: {} day segments", view.tracks.len());
                for entry in &view.legend {
                    tracing::info!(
                        "  {} [{}]: {} points",
                        entry.day_key,
                        entry.color,
                        entry.sample_count
                    );
                }
            }
            PanelUpdate::Tide(panel) => {
                tracing::info!(
                    "tide station {} ({}) at {:.1} km, {} predictions",
                    panel.station.name,
                    panel.station.id,
                    panel.distance_km,
                    panel.predictions.len()
                );
            }
            PanelUpdate::Performance(panel) => {
                tracing::info!(
                    "performance: polar speed {:.1} kn, {:.0}% of polar",
                    panel.polar_speed_kn,
                    panel.performance_pct
                );
                match panel.vmg {
                    VmgStatus::Toward {
                        vmg_kn,
                        polar_vmg_kn,
                    } => {
                        tracing::info!("  VMG {:.1} kn (polar {:.1} kn)", vmg_kn, polar_vmg_kn)
                    }
                    VmgStatus::NoDestination => tracing::info!("  VMG: no destination set"),
                }
            }
            PanelUpdate::Unavailable { panel, status } => {
                tracing::warn!("{} panel unavailable: {}", panel.name(), status);
            }
            PanelUpdate::Complete {
                panels,
                duration_ms,
            } => {
                tracing::info!("load cycle complete: {} panels in {} ms", panels, duration_ms);
            }
        }
    }
}

/// Drains one load cycle's updates into the sink, returning after the
/// completion event.
pub async fn drain(mut rx: mpsc::Receiver<PanelUpdate>, sink: &dyn DashboardSink) {
    while let Some(update) = rx.recv().await {
        let complete = matches!(update, PanelUpdate::Complete { .. });
        sink.render(update);
        if complete {
            break;
        }
    }
}
