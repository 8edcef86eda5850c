// Viewer configuration and static reference tables
use crate::domain::geo::BoundingBox;
use crate::domain::polar::PolarTable;
use crate::domain::station::Station;
use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct VesselConfig {
    pub vessel: VesselSettings,
    pub sources: SourceSettings,
    pub tides: TideSettings,
    #[serde(default)]
    pub windows: WindowSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VesselSettings {
    pub name: String,
    /// Default location used when the latest document carries no GPS fix.
    pub fallback_lat: f64,
    pub fallback_lon: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    /// Base URL the publishing pipeline writes the telemetry documents under.
    pub base_url: String,
    #[serde(default = "default_latest_file")]
    pub latest_file: String,
    #[serde(default = "default_snapshot_index_file")]
    pub snapshot_index_file: String,
    #[serde(default = "default_positions_file")]
    pub positions_file: String,
    pub station_table: String,
    pub polar_table: String,
    #[serde(default = "default_preferences_file")]
    pub preferences_file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TideSettings {
    pub api_url: String,
    pub pinned_station: String,
    pub fallback_station: String,
    pub home_bay: BoundingBox,
    #[serde(default = "default_forward_hours")]
    pub forward_hours: i64,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct WindowSettings {
    #[serde(default = "default_series_window")]
    pub series_window: usize,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    #[serde(default = "default_refresh_minutes")]
    pub refresh_minutes: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            series_window: default_series_window(),
            retention_days: default_retention_days(),
            refresh_minutes: default_refresh_minutes(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_latest_file() -> String {
    "latest.json".to_string()
}

fn default_snapshot_index_file() -> String {
    "snapshots/index.json".to_string()
}

fn default_positions_file() -> String {
    "positions.json".to_string()
}

fn default_preferences_file() -> String {
    "config/preferences.toml".to_string()
}

fn default_forward_hours() -> i64 {
    48
}

fn default_series_window() -> usize {
    60
}

fn default_retention_days() -> i64 {
    24
}

fn default_refresh_minutes() -> u64 {
    60
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

pub fn load_vessel_config() -> anyhow::Result<VesselConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/vessel"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_station_table(path: &str) -> anyhow::Result<Vec<Station>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading station table {}", path))?;
    let stations: Vec<Station> =
        serde_json::from_str(&text).with_context(|| format!("parsing station table {}", path))?;
    if stations.is_empty() {
        tracing::warn!("Station table {} is empty", path);
    }
    Ok(stations)
}

pub fn load_polar_table(path: &str) -> anyhow::Result<PolarTable> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading polar table {}", path))?;
    PolarTable::parse(&text).with_context(|| format!("parsing polar table {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_window_defaults_apply_when_section_missing() {
        let toml = r#"
            [vessel]
            name = "Aletheia"
            fallback_lat = 37.8063
            fallback_lon = -122.4659

            [sources]
            base_url = "https://example.org/telemetry"
            station_table = "config/stations.json"
            polar_table = "config/polar.txt"

            [tides]
            api_url = "https://tides.example.org/api"
            pinned_station = "9414290"
            fallback_station = "9414290"

            [tides.home_bay]
            min_lat = 37.70
            max_lat = 37.90
            min_lon = -122.55
            max_lon = -122.35
        "#;
        let settings = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap();
        let parsed: VesselConfig = settings.try_deserialize().unwrap();

        assert_eq!(parsed.windows.series_window, 60);
        assert_eq!(parsed.windows.retention_days, 24);
        assert_eq!(parsed.sources.latest_file, "latest.json");
        assert_eq!(parsed.tides.forward_hours, 48);
        assert!(parsed.tides.home_bay.contains(37.80, -122.46));
    }

    #[test]
    fn test_load_station_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "9414290", "name": "San Francisco", "lat": 37.8063, "lon": -122.4659}}]"#
        )
        .unwrap();

        let stations = load_station_table(file.path().to_str().unwrap()).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].id, "9414290");
    }

    #[test]
    fn test_load_polar_table_rejects_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(load_polar_table(file.path().to_str().unwrap()).is_err());
    }
}
