// Station resolution and tide predictions with a bounded fallback retry
use crate::application::telemetry_repository::TideRepository;
use crate::domain::geo::{haversine_km, BoundingBox};
use crate::domain::station::{pick_station, Station, TidePrediction};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

/// Why the tide panel has no data. Configuration problems are distinct from
/// network failures so "temporarily unreachable" cannot be mistaken for
/// "never configured".
#[derive(Debug, Error)]
pub enum TideError {
    #[error("no tide stations configured")]
    NoStations,
    #[error("station lookup failed")]
    Lookup,
    #[error("tide predictions unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct TidePanel {
    pub station: Station,
    pub distance_km: f64,
    pub predictions: Vec<TidePrediction>,
}

pub struct TideService {
    tides: Arc<dyn TideRepository>,
    stations: Vec<Station>,
    home_bay: BoundingBox,
    pinned_station: String,
    fallback_station: String,
    forward_hours: i64,
}

impl TideService {
    pub fn new(
        tides: Arc<dyn TideRepository>,
        stations: Vec<Station>,
        home_bay: BoundingBox,
        pinned_station: String,
        fallback_station: String,
        forward_hours: i64,
    ) -> Self {
        Self {
            tides,
            stations,
            home_bay,
            pinned_station,
            fallback_station,
            forward_hours,
        }
    }

    /// Resolves the station for the given coordinates and fetches its
    /// predictions. A failed fetch is retried exactly once against the
    /// fallback station, unless the target already is the fallback.
    pub async fn resolve(&self, lat: f64, lon: f64) -> Result<TidePanel, TideError> {
        if self.stations.is_empty() {
            return Err(TideError::NoStations);
        }

        let (target, distance_km) = pick_station(
            &self.stations,
            lat,
            lon,
            &self.home_bay,
            &self.pinned_station,
        )
        .ok_or(TideError::Lookup)?;
        let target = target.clone();

        match self.forward_window(&target.id).await {
            Ok(predictions) => Ok(TidePanel {
                station: target,
                distance_km,
                predictions,
            }),
            Err(primary) if target.id != self.fallback_station => {
                tracing::warn!(
                    "Tide fetch for station {} failed, retrying fallback {}: {}",
                    target.id,
                    self.fallback_station,
                    primary
                );
                let Some(fallback) = self.stations.iter().find(|s| s.id == self.fallback_station)
                else {
                    return Err(TideError::Unavailable(primary.to_string()));
                };
                match self.forward_window(&fallback.id).await {
                    Ok(predictions) => Ok(TidePanel {
                        station: fallback.clone(),
                        distance_km: haversine_km(lat, lon, fallback.lat, fallback.lon),
                        predictions,
                    }),
                    Err(retry) => Err(TideError::Unavailable(format!(
                        "{primary}; fallback {}: {retry}",
                        fallback.id
                    ))),
                }
            }
            Err(primary) => Err(TideError::Unavailable(primary.to_string())),
        }
    }

    /// Predictions for a station, restricted to the forward window from now.
    /// The source API serves no historical data, so nothing is backfilled.
    async fn forward_window(&self, station_id: &str) -> anyhow::Result<Vec<TidePrediction>> {
        let predictions = self.tides.fetch_predictions(station_id).await?;
        let now_ms = Utc::now().timestamp_millis();
        let end_ms = now_ms + self.forward_hours * 3_600_000;
        Ok(predictions
            .into_iter()
            .filter(|p| p.time_ms >= now_ms && p.time_ms <= end_ms)
            .collect())
    }
}
