// Reference station table and nearest-station selection
use crate::domain::geo::{haversine_km, BoundingBox};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TidePrediction {
    pub time_ms: i64,
    pub height_m: f64,
}

impl TidePrediction {
    pub fn new(time_ms: i64, height_m: f64) -> Self {
        Self { time_ms, height_m }
    }
}

/// Nearest station by great-circle distance. Ties keep the earlier table row.
pub fn find_nearest(stations: &[Station], lat: f64, lon: f64) -> Option<(&Station, f64)> {
    let mut best: Option<(&Station, f64)> = None;
    for station in stations {
        let distance = haversine_km(lat, lon, station.lat, station.lon);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((station, distance)),
        }
    }
    best
}

/// Station to query for tide predictions. Inside the home-bay box the pinned
/// station wins outright when the table has it; the pin exists because the
/// geometrically nearest station there sits in a side channel with
/// unrepresentative predictions.
pub fn pick_station<'a>(
    stations: &'a [Station],
    lat: f64,
    lon: f64,
    home_bay: &BoundingBox,
    pinned_id: &str,
) -> Option<(&'a Station, f64)> {
    if home_bay.contains(lat, lon) {
        if let Some(station) = stations.iter().find(|s| s.id == pinned_id) {
            let distance = haversine_km(lat, lon, station.lat, station.lon);
            return Some((station, distance));
        }
    }
    find_nearest(stations, lat, lon)
}
