//! Timing summary of the forecasts held by a registry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::container::Forecasts;
use crate::time::duration_ms;

/// Resolution, horizon and initial-time range of a set of forecasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    #[serde(with = "duration_ms")]
    pub resolution: Duration,
    pub horizon: usize,
    /// Gap between consecutive initial times; `None` with a single one.
    #[serde(default, with = "optional_duration_ms")]
    pub interval: Option<Duration>,
    pub first_initial_time: DateTime<Utc>,
    pub last_initial_time: DateTime<Utc>,
    pub initial_time_count: usize,
}

impl ForecastSummary {
    /// Summarize one container; `None` when it is empty.
    pub fn from_forecasts(forecasts: &Forecasts) -> Option<Self> {
        let times = forecasts.unique_initial_times();
        let (first, last) = (*times.first()?, *times.last()?);
        Some(Self {
            resolution: forecasts.resolution()?,
            horizon: forecasts.horizon()?,
            interval: forecasts.interval(),
            first_initial_time: first,
            last_initial_time: last,
            initial_time_count: times.len(),
        })
    }
}

mod optional_duration_ms {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.num_milliseconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<i64>::deserialize(deserializer).map(|v| v.map(Duration::milliseconds))
    }
}
