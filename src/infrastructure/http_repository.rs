// HTTP repository over the published telemetry documents
use crate::application::telemetry_repository::{SnapshotRef, TelemetryRepository, TideRepository};
use crate::domain::station::TidePrediction;
use crate::domain::telemetry::{LatestDocument, SnapshotReading};
use crate::domain::track::PositionSample;
use crate::infrastructure::config::VesselConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpTelemetryRepository {
    client: reqwest::Client,
    base_url: String,
    latest_file: String,
    snapshot_index_file: String,
    positions_file: String,
}

impl HttpTelemetryRepository {
    pub fn new(config: &VesselConfig) -> Result<Self> {
        let client = build_client(config)?;
        Ok(Self {
            client,
            base_url: config.sources.base_url.trim_end_matches('/').to_string(),
            latest_file: config.sources.latest_file.clone(),
            snapshot_index_file: config.sources.snapshot_index_file.clone(),
            positions_file: config.sources.positions_file.clone(),
        })
    }

    fn url(&self, file: &str) -> String {
        format!("{}/{}", self.base_url, file)
    }

    async fn get_json<T: DeserializeOwned>(&self, file: &str) -> Result<T> {
        let url = self.url(file);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("requesting {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("{} returned status {}", url, response.status());
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("parsing {}", url))
    }
}

// A hung publisher endpoint fails that panel's cycle instead of wedging it.
fn build_client(config: &VesselConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.windows.fetch_timeout_secs))
        .build()
        .context("building HTTP client")
}

#[async_trait]
impl TelemetryRepository for HttpTelemetryRepository {
    async fn fetch_latest(&self) -> Result<LatestDocument> {
        let root: serde_json::Value = self.get_json(&self.latest_file).await?;
        Ok(flatten_latest(&root))
    }

    async fn fetch_snapshot_index(&self) -> Result<Vec<SnapshotRef>> {
        let entries: Vec<IndexEntry> = self.get_json(&self.snapshot_index_file).await?;
        Ok(entries
            .into_iter()
            .map(|entry| SnapshotRef {
                time_ms: index_time_ms(entry.timestamp.as_ref()),
                file: entry.file,
            })
            .collect())
    }

    async fn fetch_snapshot(&self, snapshot: &SnapshotRef) -> Result<Vec<SnapshotReading>> {
        let document: SnapshotDocument = self.get_json(&snapshot.file).await?;
        Ok(normalize_snapshot(document, snapshot.time_ms))
    }

    async fn fetch_positions(&self) -> Result<Vec<PositionSample>> {
        // Individual malformed records are a data-quality condition and are
        // dropped; only an unreadable index is an error.
        let records: Vec<serde_json::Value> = self.get_json(&self.positions_file).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| serde_json::from_value::<PositionRecord>(record).ok())
            .filter_map(normalize_position)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    file: String,
    #[serde(default)]
    timestamp: Option<serde_json::Value>,
}

/// Index timestamps appear as RFC 3339 strings or as epoch milliseconds.
fn index_time_ms(timestamp: Option<&serde_json::Value>) -> Option<i64> {
    match timestamp? {
        serde_json::Value::String(s) => parse_time_ms(Some(s)),
        serde_json::Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// A snapshot document on the wire: either a path/value list under one outer
/// timestamp, or a legacy flat map of dotted path to number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotDocument {
    PathValues {
        #[serde(default)]
        timestamp: Option<String>,
        values: Vec<PathValue>,
    },
    Flat {
        #[serde(default)]
        timestamp: Option<String>,
        #[serde(flatten)]
        metrics: HashMap<String, serde_json::Value>,
    },
}

#[derive(Debug, Deserialize)]
struct PathValue {
    path: String,
    value: serde_json::Value,
}

fn finite_number(value: &serde_json::Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

fn parse_time_ms(timestamp: Option<&str>) -> Option<i64> {
    timestamp
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.timestamp_millis())
}

/// Normalizes either wire shape to (time, path, value) readings. Non-numeric
/// and non-finite values are dropped. A document with no usable timestamp at
/// all yields nothing: a reading without a time cannot be sorted into a series.
fn normalize_snapshot(document: SnapshotDocument, fallback_ms: Option<i64>) -> Vec<SnapshotReading> {
    match document {
        SnapshotDocument::PathValues { timestamp, values } => {
            let Some(time_ms) = parse_time_ms(timestamp.as_deref()).or(fallback_ms) else {
                return Vec::new();
            };
            values
                .into_iter()
                .filter_map(|pv| {
                    finite_number(&pv.value).map(|v| SnapshotReading::new(time_ms, pv.path, v))
                })
                .collect()
        }
        SnapshotDocument::Flat { timestamp, metrics } => {
            let Some(time_ms) = parse_time_ms(timestamp.as_deref()).or(fallback_ms) else {
                return Vec::new();
            };
            metrics
                .into_iter()
                .filter_map(|(path, value)| {
                    finite_number(&value).map(|v| SnapshotReading::new(time_ms, path, v))
                })
                .collect()
        }
    }
}

/// A position record on the wire: SignalK-style values array, or legacy flat
/// fields.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PositionRecord {
    SignalK {
        #[serde(default)]
        timestamp: Option<String>,
        values: Vec<PathValue>,
    },
    Flat {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        timestamp: Option<String>,
        #[serde(default, rename = "speedOverGround")]
        speed_over_ground: Option<f64>,
        #[serde(default, rename = "courseOverGroundTrue")]
        course_over_ground: Option<f64>,
    },
}

fn normalize_position(record: PositionRecord) -> Option<PositionSample> {
    let sample = match record {
        PositionRecord::Flat {
            latitude,
            longitude,
            timestamp,
            speed_over_ground,
            course_over_ground,
        } => PositionSample {
            latitude,
            longitude,
            time_ms: parse_time_ms(timestamp.as_deref()),
            sog_ms: speed_over_ground.filter(|v| v.is_finite()),
            // legacy records already carry degrees
            cog_deg: course_over_ground.filter(|v| v.is_finite()),
        },
        PositionRecord::SignalK { timestamp, values } => {
            let mut latitude = f64::NAN;
            let mut longitude = f64::NAN;
            let mut sog_ms = None;
            let mut cog_deg = None;
            for pv in &values {
                match pv.path.as_str() {
                    "navigation.position" => {
                        if let Some(lat) = pv.value.get("latitude").and_then(finite_number) {
                            latitude = lat;
                        }
                        if let Some(lon) = pv.value.get("longitude").and_then(finite_number) {
                            longitude = lon;
                        }
                    }
                    "navigation.speedOverGround" => sog_ms = finite_number(&pv.value),
                    // SignalK publishes course in radians
                    "navigation.courseOverGroundTrue" => {
                        cog_deg = finite_number(&pv.value).map(f64::to_degrees)
                    }
                    _ => {}
                }
            }
            PositionSample {
                latitude,
                longitude,
                time_ms: parse_time_ms(timestamp.as_deref()),
                sog_ms,
                cog_deg,
            }
        }
    };
    sample.has_valid_coordinates().then_some(sample)
}

/// Walks the SignalK-shaped latest document: any node with a `value` key is a
/// leaf reading under its dotted path.
fn flatten_latest(root: &serde_json::Value) -> LatestDocument {
    let mut document = LatestDocument::default();
    if let Some(map) = root.as_object() {
        for (key, node) in map {
            flatten_node(key, node, &mut document);
        }
    }
    document
}

fn flatten_node(path: &str, node: &serde_json::Value, document: &mut LatestDocument) {
    let Some(map) = node.as_object() else {
        return;
    };

    if let Some(value) = map.get("value") {
        if path == "navigation.position" {
            let lat = value.get("latitude").and_then(finite_number);
            let lon = value.get("longitude").and_then(finite_number);
            if let (Some(lat), Some(lon)) = (lat, lon) {
                document.position = Some((lat, lon));
            }
        } else if let Some(number) = finite_number(value) {
            document.numbers.insert(path.to_string(), number);
        }
        return;
    }

    for (key, child) in map {
        flatten_node(&format!("{}.{}", path, key), child, document);
    }
}

#[derive(Debug, Clone)]
pub struct HttpTideRepository {
    client: reqwest::Client,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct TideResponse {
    #[serde(default)]
    predictions: Option<Vec<TideRow>>,
    #[serde(default)]
    error: Option<TideErrorPayload>,
}

#[derive(Debug, Deserialize)]
struct TideErrorPayload {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TideRow {
    t: String,
    v: String,
}

impl HttpTideRepository {
    pub fn new(config: &VesselConfig) -> Result<Self> {
        let client = build_client(config)?;
        Ok(Self {
            client,
            api_url: config.tides.api_url.clone(),
        })
    }

    fn prediction_url(&self, station_id: &str) -> String {
        format!(
            "{}?product=predictions&datum=MLLW&units=metric&time_zone=gmt&format=json&station={}",
            self.api_url,
            urlencoding::encode(station_id)
        )
    }
}

#[async_trait]
impl TideRepository for HttpTideRepository {
    async fn fetch_predictions(&self, station_id: &str) -> Result<Vec<TidePrediction>> {
        let url = self.prediction_url(station_id);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("requesting tide predictions for station {}", station_id))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "tide API returned status {} for station {}",
                response.status(),
                station_id
            );
        }

        let data: TideResponse = response
            .json()
            .await
            .context("parsing tide prediction response")?;

        // Some failures come back as HTTP 200 with an error payload
        if let Some(error) = data.error {
            anyhow::bail!("tide API error for station {}: {}", station_id, error.message);
        }

        Ok(data
            .predictions
            .unwrap_or_default()
            .iter()
            .filter_map(parse_tide_row)
            .collect())
    }
}

fn parse_tide_row(row: &TideRow) -> Option<TidePrediction> {
    let time = NaiveDateTime::parse_from_str(&row.t, "%Y-%m-%d %H:%M").ok()?;
    let height = row.v.trim().parse::<f64>().ok().filter(|h| h.is_finite())?;
    Some(TidePrediction::new(time.and_utc().timestamp_millis(), height))
}
