//! Forecast metadata, per-component containers and window arithmetic.

mod container;
mod forecast;
mod metadata;
mod summary;
pub mod window;

pub use container::Forecasts;
pub use forecast::{Forecast, ForecastInput};
pub use metadata::{
    DeterministicMetadata, ForecastKey, ForecastKind, ForecastMetadata, ForecastWindow,
    ProbabilisticMetadata, ScenarioBasedMetadata,
};
pub use summary::ForecastSummary;
