//! Public forecast values and forecast creation input.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use series_storage::SeriesData;

use super::metadata::{ForecastKind, ForecastMetadata, ForecastWindow};
use crate::error::{Result, SystemDataError};
use crate::time::advance;

/// A forecast window joined with its values.
///
/// Built per query; the metadata describes the requested window, not the
/// stored record it was cut from.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    metadata: ForecastMetadata,
    data: SeriesData,
}

impl Forecast {
    pub(crate) fn new(metadata: ForecastMetadata, data: SeriesData) -> Self {
        Self { metadata, data }
    }

    pub fn metadata(&self) -> &ForecastMetadata {
        &self.metadata
    }

    pub fn data(&self) -> &SeriesData {
        &self.data
    }

    /// Values in row-major order.
    pub fn values(&self) -> &[f64] {
        self.data.values()
    }

    pub fn kind(&self) -> ForecastKind {
        self.metadata.kind()
    }

    pub fn label(&self) -> &str {
        self.metadata.label()
    }

    pub fn initial_time(&self) -> DateTime<Utc> {
        self.metadata.initial_time()
    }

    pub fn resolution(&self) -> Duration {
        self.metadata.resolution()
    }

    pub fn horizon(&self) -> usize {
        self.metadata.horizon()
    }

    /// Timestamp of every row.
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        (0..self.horizon())
            .map_while(|step| advance(self.initial_time(), self.resolution(), step))
            .collect()
    }

    /// Multiply every value by `factor`.
    pub fn scaled(mut self, factor: f64) -> Self {
        self.data.scale(factor);
        self
    }

    pub fn into_parts(self) -> (ForecastMetadata, SeriesData) {
        (self.metadata, self.data)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum InputKind {
    Deterministic,
    Probabilistic(Vec<f64>),
    ScenarioBased,
}

/// Values and timing for a new forecast.
///
/// The registry writes `data` to the storage backend and stores the
/// resulting metadata; the horizon is the number of rows in `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastInput {
    label: String,
    resolution: Duration,
    initial_time: DateTime<Utc>,
    data: SeriesData,
    kind: InputKind,
    scaling_factor_field: Option<String>,
}

impl ForecastInput {
    pub fn deterministic(
        label: impl Into<String>,
        resolution: Duration,
        initial_time: DateTime<Utc>,
        values: Vec<f64>,
    ) -> Self {
        Self {
            label: label.into(),
            resolution,
            initial_time,
            data: SeriesData::single(values),
            kind: InputKind::Deterministic,
            scaling_factor_field: None,
        }
    }

    /// One column of `data` per entry of `percentiles`.
    pub fn probabilistic(
        label: impl Into<String>,
        resolution: Duration,
        initial_time: DateTime<Utc>,
        percentiles: Vec<f64>,
        data: SeriesData,
    ) -> Self {
        Self {
            label: label.into(),
            resolution,
            initial_time,
            data,
            kind: InputKind::Probabilistic(percentiles),
            scaling_factor_field: None,
        }
    }

    /// One column of `data` per scenario.
    pub fn scenarios(
        label: impl Into<String>,
        resolution: Duration,
        initial_time: DateTime<Utc>,
        data: SeriesData,
    ) -> Self {
        Self {
            label: label.into(),
            resolution,
            initial_time,
            data,
            kind: InputKind::ScenarioBased,
            scaling_factor_field: None,
        }
    }

    /// Scale retrieved values by this numeric field of the owning component.
    pub fn with_scaling_factor_field(mut self, field: impl Into<String>) -> Self {
        self.scaling_factor_field = Some(field.into());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn initial_time(&self) -> DateTime<Utc> {
        self.initial_time
    }

    pub fn horizon(&self) -> usize {
        self.data.rows()
    }

    /// Build the metadata record, checking the data shape against the kind.
    pub fn metadata(&self, array_ref: Uuid) -> Result<ForecastMetadata> {
        let mut window = ForecastWindow::new(
            self.label.clone(),
            self.resolution,
            self.initial_time,
            self.horizon(),
            array_ref,
        )?;
        window.scaling_factor_field = self.scaling_factor_field.clone();

        let metadata = match &self.kind {
            InputKind::Deterministic => ForecastMetadata::deterministic(window),
            InputKind::Probabilistic(percentiles) => {
                ForecastMetadata::probabilistic(window, percentiles.clone())
            }
            InputKind::ScenarioBased => {
                ForecastMetadata::scenario_based(window, self.data.columns())
            }
        };
        metadata.validate()?;

        if metadata.columns() != self.data.columns() {
            return Err(SystemDataError::validation(format!(
                "forecast '{}' expects {} columns but data has {}",
                self.label,
                metadata.columns(),
                self.data.columns()
            )));
        }

        Ok(metadata)
    }

    pub(crate) fn into_data(self) -> SeriesData {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_deterministic_metadata() {
        let input = ForecastInput::deterministic("load", Duration::hours(1), t0(), vec![1.0; 24])
            .with_scaling_factor_field("max_active_power");
        let array_ref = Uuid::new_v4();
        let metadata = input.metadata(array_ref).unwrap();

        assert_eq!(metadata.kind(), ForecastKind::Deterministic);
        assert_eq!(metadata.horizon(), 24);
        assert_eq!(metadata.array_ref(), array_ref);
        assert_eq!(metadata.scaling_factor_field(), Some("max_active_power"));
    }

    #[test]
    fn test_empty_values_rejected() {
        let input = ForecastInput::deterministic("load", Duration::hours(1), t0(), vec![]);
        assert!(matches!(
            input.metadata(Uuid::new_v4()),
            Err(SystemDataError::Validation(_))
        ));
    }

    #[test]
    fn test_percentile_column_mismatch() {
        let data = SeriesData::new(vec![0.0; 8], 2).unwrap();
        let input =
            ForecastInput::probabilistic("load", Duration::hours(1), t0(), vec![0.1, 0.5, 0.9], data);
        assert!(matches!(
            input.metadata(Uuid::new_v4()),
            Err(SystemDataError::Validation(_))
        ));
    }

    #[test]
    fn test_scenarios_take_column_count() {
        let data = SeriesData::new(vec![0.0; 12], 3).unwrap();
        let input = ForecastInput::scenarios("load", Duration::hours(1), t0(), data);
        let metadata = input.metadata(Uuid::new_v4()).unwrap();
        assert_eq!(metadata.columns(), 3);
        assert_eq!(metadata.horizon(), 4);
    }

    #[test]
    fn test_forecast_timestamps_and_scaling() {
        let window = ForecastWindow::new("load", Duration::minutes(30), t0(), 3, Uuid::new_v4()).unwrap();
        let forecast = Forecast::new(
            ForecastMetadata::deterministic(window),
            SeriesData::single(vec![1.0, 2.0, 3.0]),
        );

        let times = forecast.timestamps();
        assert_eq!(times.len(), 3);
        assert_eq!(times[2], t0() + Duration::hours(1));

        let scaled = forecast.scaled(10.0);
        assert_eq!(scaled.values(), &[10.0, 20.0, 30.0]);
    }
}
