// Polar speed table and sailing performance math
use thiserror::Error;

/// The 0° row is excluded from nearest-row selection above this angle.
/// That row holds zero boat speed for every wind bucket, and without the
/// cutoff it would win "closest row" for small but real wind angles.
const ZERO_ROW_CUTOFF_DEG: f64 = 10.0;

#[derive(Debug, Error)]
pub enum PolarError {
    #[error("polar table has no usable rows")]
    EmptyTable,
}

#[derive(Debug, Clone)]
pub struct PolarRow {
    pub twa_deg: f64,
    pub speeds_kn: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct PolarTable {
    pub wind_buckets_kn: Vec<f64>,
    pub rows: Vec<PolarRow>,
}

impl PolarTable {
    /// Parses the semicolon-delimited polar text. The header row carries the
    /// wind-speed bucket boundaries after a leading label cell; each further
    /// row is `twa;speed;speed;...`. Unparseable rows are skipped.
    pub fn parse(text: &str) -> Result<Self, PolarError> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());

        let header = lines.next().ok_or(PolarError::EmptyTable)?;
        let wind_buckets_kn: Vec<f64> = header
            .split(';')
            .skip(1)
            .filter_map(|cell| cell.trim().parse::<f64>().ok())
            .collect();

        let mut rows = Vec::new();
        for line in lines {
            let mut cells = line.split(';');
            let Some(twa_deg) = cells.next().and_then(|c| c.trim().parse::<f64>().ok()) else {
                continue;
            };
            let speeds_kn: Vec<f64> = cells
                .filter_map(|cell| cell.trim().parse::<f64>().ok())
                .collect();
            rows.push(PolarRow { twa_deg, speeds_kn });
        }

        if wind_buckets_kn.is_empty() || rows.is_empty() {
            return Err(PolarError::EmptyTable);
        }

        Ok(Self {
            wind_buckets_kn,
            rows,
        })
    }

    /// Column for a wind speed: the first boundary at or above it, or the
    /// last column once the wind blows past the top of the table.
    pub fn bucket_index(&self, tws_kn: f64) -> usize {
        self.wind_buckets_kn
            .iter()
            .position(|boundary| *boundary >= tws_kn)
            .unwrap_or(self.wind_buckets_kn.len() - 1)
    }

    /// Row with the smallest angular difference to the (absolute) wind angle.
    /// Ties keep the earlier table row.
    pub fn nearest_row(&self, twa_deg: f64) -> Option<&PolarRow> {
        let twa = twa_deg.abs();
        let mut best: Option<(&PolarRow, f64)> = None;
        for row in &self.rows {
            if row.twa_deg == 0.0 && twa > ZERO_ROW_CUTOFF_DEG {
                continue;
            }
            let difference = (row.twa_deg - twa).abs();
            match best {
                Some((_, best_difference)) if difference >= best_difference => {}
                _ => best = Some((row, difference)),
            }
        }
        best.map(|(row, _)| row)
    }

    /// Expected boat speed for the given true wind angle and speed, both in
    /// the units the table is written in (degrees, knots).
    pub fn polar_speed_kn(&self, twa_deg: f64, tws_kn: f64) -> Option<f64> {
        let column = self.bucket_index(tws_kn);
        self.nearest_row(twa_deg)
            .map(|row| row.speeds_kn.get(column).copied().unwrap_or(0.0))
    }
}

/// Actual speed as a percentage of polar speed. A zero polar speed reports
/// 0% rather than dividing.
pub fn performance_pct(sog_kn: f64, polar_kn: f64) -> f64 {
    if polar_kn == 0.0 {
        0.0
    } else {
        sog_kn / polar_kn * 100.0
    }
}

/// Component of speed directed toward a destination bearing (degrees off the
/// course line).
pub fn vmg_kn(speed_kn: f64, bearing_deg: f64) -> f64 {
    speed_kn * bearing_deg.to_radians().cos()
}
