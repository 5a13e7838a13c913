//! Forecast keys and stored metadata records.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SystemDataError};
use crate::time::{advance, duration_ms, is_whole_millis};

/// Index key of a forecast within one component.
///
/// Ordered by initial time; the label only breaks ties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForecastKey {
    pub label: String,
    pub initial_time: DateTime<Utc>,
}

impl ForecastKey {
    pub fn new(label: impl Into<String>, initial_time: DateTime<Utc>) -> Self {
        Self {
            label: label.into(),
            initial_time,
        }
    }
}

impl Ord for ForecastKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.initial_time
            .cmp(&other.initial_time)
            .then_with(|| self.label.cmp(&other.label))
    }
}

impl PartialOrd for ForecastKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ForecastKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' at {}", self.label, self.initial_time)
    }
}

/// Kind of forecast a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForecastKind {
    Deterministic,
    Probabilistic,
    ScenarioBased,
}

impl ForecastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deterministic => "Deterministic",
            Self::Probabilistic => "Probabilistic",
            Self::ScenarioBased => "ScenarioBased",
        }
    }
}

impl fmt::Display for ForecastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The time window and array location shared by every forecast kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastWindow {
    /// Label, e.g. the field the forecast drives ("max_active_power").
    pub label: String,
    /// Time between consecutive rows.
    #[serde(with = "duration_ms")]
    pub resolution: Duration,
    /// Timestamp of the first row.
    pub initial_time: DateTime<Utc>,
    /// Row offset of the window inside the stored array.
    pub start_index: usize,
    /// Number of rows in the window.
    pub horizon: usize,
    /// Reference of the array in the storage backend.
    pub array_ref: Uuid,
    /// Component field the values are multiplied by on scaled retrieval.
    #[serde(default)]
    pub scaling_factor_field: Option<String>,
}

impl ForecastWindow {
    /// Create a window starting at row 0 of its array.
    pub fn new(
        label: impl Into<String>,
        resolution: Duration,
        initial_time: DateTime<Utc>,
        horizon: usize,
        array_ref: Uuid,
    ) -> Result<Self> {
        let window = Self {
            label: label.into(),
            resolution,
            initial_time,
            start_index: 0,
            horizon,
            array_ref,
            scaling_factor_field: None,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn with_scaling_factor_field(mut self, field: impl Into<String>) -> Self {
        self.scaling_factor_field = Some(field.into());
        self
    }

    /// Check horizon > 0, a positive whole-millisecond resolution and an
    /// end time inside the supported date range.
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(SystemDataError::validation(format!(
                "forecast '{}' has a horizon of 0",
                self.label
            )));
        }
        if self.resolution <= Duration::zero() {
            return Err(SystemDataError::validation(format!(
                "forecast '{}' has a non-positive resolution",
                self.label
            )));
        }
        if !is_whole_millis(self.resolution) {
            return Err(SystemDataError::validation(format!(
                "forecast '{}' has a resolution of {}, which is not a whole number of milliseconds",
                self.label, self.resolution
            )));
        }
        if self.end_time().is_none() {
            return Err(SystemDataError::validation(format!(
                "forecast '{}' of {} rows at {} ends past the supported date range",
                self.label, self.horizon, self.initial_time
            )));
        }
        Ok(())
    }

    /// Timestamp just past the last row, if representable.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        advance(self.initial_time, self.resolution, self.horizon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeterministicMetadata {
    pub window: ForecastWindow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilisticMetadata {
    pub window: ForecastWindow,
    /// One array column per percentile.
    pub percentiles: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioBasedMetadata {
    pub window: ForecastWindow,
    /// One array column per scenario.
    pub scenario_count: usize,
}

/// A stored forecast record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ForecastMetadata {
    Deterministic(DeterministicMetadata),
    Probabilistic(ProbabilisticMetadata),
    ScenarioBased(ScenarioBasedMetadata),
}

impl ForecastMetadata {
    pub fn deterministic(window: ForecastWindow) -> Self {
        Self::Deterministic(DeterministicMetadata { window })
    }

    pub fn probabilistic(window: ForecastWindow, percentiles: Vec<f64>) -> Self {
        Self::Probabilistic(ProbabilisticMetadata {
            window,
            percentiles,
        })
    }

    pub fn scenario_based(window: ForecastWindow, scenario_count: usize) -> Self {
        Self::ScenarioBased(ScenarioBasedMetadata {
            window,
            scenario_count,
        })
    }

    pub fn kind(&self) -> ForecastKind {
        match self {
            Self::Deterministic(_) => ForecastKind::Deterministic,
            Self::Probabilistic(_) => ForecastKind::Probabilistic,
            Self::ScenarioBased(_) => ForecastKind::ScenarioBased,
        }
    }

    pub fn window(&self) -> &ForecastWindow {
        match self {
            Self::Deterministic(m) => &m.window,
            Self::Probabilistic(m) => &m.window,
            Self::ScenarioBased(m) => &m.window,
        }
    }

    fn window_mut(&mut self) -> &mut ForecastWindow {
        match self {
            Self::Deterministic(m) => &mut m.window,
            Self::Probabilistic(m) => &mut m.window,
            Self::ScenarioBased(m) => &mut m.window,
        }
    }

    pub fn label(&self) -> &str {
        &self.window().label
    }

    pub fn resolution(&self) -> Duration {
        self.window().resolution
    }

    pub fn initial_time(&self) -> DateTime<Utc> {
        self.window().initial_time
    }

    pub fn start_index(&self) -> usize {
        self.window().start_index
    }

    pub fn horizon(&self) -> usize {
        self.window().horizon
    }

    pub fn array_ref(&self) -> Uuid {
        self.window().array_ref
    }

    pub fn scaling_factor_field(&self) -> Option<&str> {
        self.window().scaling_factor_field.as_deref()
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.window().end_time()
    }

    pub fn key(&self) -> ForecastKey {
        ForecastKey::new(self.label(), self.initial_time())
    }

    /// Number of array columns the record's kind implies.
    pub fn columns(&self) -> usize {
        match self {
            Self::Deterministic(_) => 1,
            Self::Probabilistic(m) => m.percentiles.len(),
            Self::ScenarioBased(m) => m.scenario_count,
        }
    }

    /// Check the window plus kind-specific fields.
    pub fn validate(&self) -> Result<()> {
        self.window().validate()?;
        match self {
            Self::Deterministic(_) => Ok(()),
            Self::Probabilistic(m) => {
                if m.percentiles.is_empty() {
                    return Err(SystemDataError::validation(format!(
                        "probabilistic forecast '{}' has no percentiles",
                        self.label()
                    )));
                }
                if m.percentiles.iter().any(|p| !(0.0..=1.0).contains(p)) {
                    return Err(SystemDataError::validation(format!(
                        "probabilistic forecast '{}' has percentiles outside [0, 1]",
                        self.label()
                    )));
                }
                Ok(())
            }
            Self::ScenarioBased(m) => {
                if m.scenario_count == 0 {
                    return Err(SystemDataError::validation(format!(
                        "scenario forecast '{}' has no scenarios",
                        self.label()
                    )));
                }
                Ok(())
            }
        }
    }

    /// Same record pointing at another array.
    pub(crate) fn with_array_ref(mut self, array_ref: Uuid) -> Self {
        self.window_mut().array_ref = array_ref;
        self
    }

    /// Copy of this record describing a sub-window of its array.
    pub(crate) fn sub_window(
        &self,
        initial_time: DateTime<Utc>,
        start_index: usize,
        horizon: usize,
    ) -> Self {
        let mut metadata = self.clone();
        let window = metadata.window_mut();
        window.initial_time = initial_time;
        window.start_index = start_index;
        window.horizon = horizon;
        metadata
    }
}
