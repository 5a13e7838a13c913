//! Forecast series generators with predictable, verifiable values.

use chrono::{DateTime, Duration, TimeZone, Utc};
use series_storage::SeriesData;
use system_data::ForecastInput;

/// Fixed reference time used across the test suite: 2024-01-01T00:00:00Z.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// `t0() + hours`.
pub fn hour(hours: i64) -> DateTime<Utc> {
    t0() + Duration::hours(hours)
}

/// `count` timestamps one hour apart starting at `start`.
pub fn hourly(start: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
    (0..count).map(|i| start + Duration::hours(i as i64)).collect()
}

/// Values `0.0, 1.0, ..., len - 1`, so a value equals its row index.
pub fn ramp(len: usize) -> Vec<f64> {
    (0..len).map(|i| i as f64).collect()
}

/// One column per percentile; cell value is `row + percentile`.
pub fn percentile_series(rows: usize, percentiles: &[f64]) -> SeriesData {
    let mut values = Vec::with_capacity(rows * percentiles.len());
    for row in 0..rows {
        for p in percentiles {
            values.push(row as f64 + p);
        }
    }
    SeriesData::new(values, percentiles.len()).unwrap_or_else(|_| SeriesData::single(Vec::new()))
}

/// `scenarios` columns; cell value is `scenario * 100 + row`.
pub fn scenario_series(rows: usize, scenarios: usize) -> SeriesData {
    let mut values = Vec::with_capacity(rows * scenarios);
    for row in 0..rows {
        for scenario in 0..scenarios {
            values.push((scenario * 100 + row) as f64);
        }
    }
    SeriesData::new(values, scenarios).unwrap_or_else(|_| SeriesData::single(Vec::new()))
}

/// Hourly deterministic ramp forecast of `horizon` rows.
pub fn hourly_ramp(label: &str, initial_time: DateTime<Utc>, horizon: usize) -> ForecastInput {
    ForecastInput::deterministic(label, Duration::hours(1), initial_time, ramp(horizon))
}
