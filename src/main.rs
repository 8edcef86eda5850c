// Main entry point - Dependency injection and refresh loop
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::sync::Arc;
use std::time::Duration;

use crate::application::dashboard_service::DashboardService;
use crate::application::performance_service::PerformanceService;
use crate::application::series_service::SeriesService;
use crate::application::telemetry_repository::TelemetryRepository;
use crate::application::tide_service::TideService;
use crate::application::track_service::TrackService;
use crate::infrastructure::config::{load_polar_table, load_station_table, load_vessel_config};
use crate::infrastructure::http_repository::{HttpTelemetryRepository, HttpTideRepository};
use crate::infrastructure::preferences::{load_unit_registry, FilePreferenceStore};
use crate::presentation::sink::{drain, LogSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration and the static reference tables
    let config = load_vessel_config()?;
    let stations = load_station_table(&config.sources.station_table)?;
    let polar = Arc::new(load_polar_table(&config.sources.polar_table)?);

    let preferences = Arc::new(FilePreferenceStore::open(&config.sources.preferences_file)?);
    let registry = Arc::new(load_unit_registry(preferences.as_ref()));

    // Create repositories (infrastructure layer)
    let repository: Arc<dyn TelemetryRepository> =
        Arc::new(HttpTelemetryRepository::new(&config)?);
    let tides = Arc::new(HttpTideRepository::new(&config)?);

    // Create services (application layer)
    let dashboard = DashboardService::new(
        repository.clone(),
        Arc::new(SeriesService::new(
            repository.clone(),
            config.windows.series_window,
        )),
        Arc::new(TrackService::new(
            repository.clone(),
            registry.clone(),
            config.windows.retention_days,
        )),
        Arc::new(TideService::new(
            tides,
            stations,
            config.tides.home_bay,
            config.tides.pinned_station.clone(),
            config.tides.fallback_station.clone(),
            config.tides.forward_hours,
        )),
        Arc::new(PerformanceService::new(polar)),
        (config.vessel.fallback_lat, config.vessel.fallback_lon),
    );

    let sink = LogSink::new(registry.clone());

    println!(
        "Starting vessel-telemetry viewer for {} (refresh every {} min)",
        config.vessel.name, config.windows.refresh_minutes
    );

    // The first tick fires immediately; each cycle is awaited before the
    // next, so a slow cycle delays the next tick instead of racing it.
    let mut ticker =
        tokio::time::interval(Duration::from_secs(config.windows.refresh_minutes * 60));
    loop {
        ticker.tick().await;
        let rx = dashboard.load_cycle().await;
        drain(rx, &sink).await;
    }
}
