// Position history and calendar-day track bucketing
use chrono::{Local, LocalResult, TimeZone};
use std::collections::BTreeMap;

/// Bucket key for samples that carry no timestamp. Sorts after every
/// `YYYY-MM-DD` key, so the bucket always lands at the end of the list.
pub const UNKNOWN_DAY: &str = "unknown";

/// 24 distinct track colors; day N wears color N mod 24.
pub const TRACK_PALETTE: [&str; 24] = [
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
    "#bcf60c", "#fabebe", "#008080", "#e6beff", "#9a6324", "#fffac8", "#800000", "#aaffc3",
    "#808000", "#ffd8b1", "#000075", "#808080", "#ffe4e1", "#556b2f", "#ff1493", "#00ced1",
];

#[derive(Debug, Clone)]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    pub time_ms: Option<i64>,
    pub sog_ms: Option<f64>,
    pub cog_deg: Option<f64>,
}

impl PositionSample {
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Local calendar day this sample belongs to.
    pub fn day_key(&self) -> String {
        match self.time_ms {
            Some(ms) => match Local.timestamp_millis_opt(ms) {
                LocalResult::Single(dt) => dt.format("%Y-%m-%d").to_string(),
                _ => UNKNOWN_DAY.to_string(),
            },
            None => UNKNOWN_DAY.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DayTrack {
    pub day_key: String,
    pub color: &'static str,
    pub points: Vec<PositionSample>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LegendEntry {
    pub day_key: String,
    pub color: &'static str,
    pub sample_count: usize,
}

/// Buckets samples by local calendar day. Day keys come out ascending
/// (lexicographic order on `YYYY-MM-DD` is chronological order) and samples
/// keep their source order inside each bucket.
pub fn bucket_by_day(samples: Vec<PositionSample>) -> Vec<DayTrack> {
    let mut buckets: BTreeMap<String, Vec<PositionSample>> = BTreeMap::new();
    for sample in samples {
        buckets.entry(sample.day_key()).or_default().push(sample);
    }

    buckets
        .into_iter()
        .enumerate()
        .map(|(day_index, (day_key, points))| DayTrack {
            day_key,
            color: TRACK_PALETTE[day_index % TRACK_PALETTE.len()],
            points,
            labels: Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time_ms: Option<i64>, lat: f64) -> PositionSample {
        PositionSample {
            latitude: lat,
            longitude: -122.4,
            time_ms,
            sog_ms: Some(3.0),
            cog_deg: Some(270.0),
        }
    }

    const DAY_MS: i64 = 86_400_000;

    #[test]
    fn test_same_day_shares_one_bucket_and_color() {
        let base = 1_700_000_000_000;
        let tracks = bucket_by_day(vec![
            sample(Some(base), 37.80),
            sample(Some(base + 60_000), 37.81),
        ]);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].points.len(), 2);
    }

    #[test]
    fn test_distinct_days_get_distinct_colors_within_palette() {
        let base = 1_700_000_000_000;
        let samples: Vec<PositionSample> = (0..24)
            .map(|day| sample(Some(base + day * DAY_MS), 37.80))
            .collect();
        let tracks = bucket_by_day(samples);
        assert_eq!(tracks.len(), 24);
        let mut colors: Vec<&str> = tracks.iter().map(|t| t.color).collect();
        colors.sort();
        colors.dedup();
        assert_eq!(colors.len(), 24);
    }

    #[test]
    fn test_palette_wraps_after_24_days() {
        let base = 1_700_000_000_000;
        let samples: Vec<PositionSample> = (0..30)
            .map(|day| sample(Some(base + day * DAY_MS), 37.80))
            .collect();
        let tracks = bucket_by_day(samples);
        assert_eq!(tracks.len(), 30);
        assert_eq!(tracks[24].color, tracks[0].color);
        assert_eq!(tracks[25].color, tracks[1].color);
    }

    #[test]
    fn test_missing_timestamp_goes_to_unknown_bucket() {
        let tracks = bucket_by_day(vec![
            sample(Some(1_700_000_000_000), 37.80),
            sample(None, 37.81),
        ]);
        assert_eq!(tracks.len(), 2);
        // "unknown" sorts after any date key
        assert_eq!(tracks[1].day_key, UNKNOWN_DAY);
        assert_eq!(tracks[1].points.len(), 1);
    }

    #[test]
    fn test_source_order_preserved_within_bucket() {
        let base = 1_700_000_000_000;
        // deliberately out of chronological order
        let tracks = bucket_by_day(vec![
            sample(Some(base + 120_000), 37.82),
            sample(Some(base), 37.80),
            sample(Some(base + 60_000), 37.81),
        ]);
        assert_eq!(tracks.len(), 1);
        let lats: Vec<f64> = tracks[0].points.iter().map(|p| p.latitude).collect();
        assert_eq!(lats, vec![37.82, 37.80, 37.81]);
    }
}
