//! In-memory data layer for simulation models.
//!
//! This crate holds typed domain objects ("components") in a registry
//! indexed by their concrete Rust type, and attaches to each component an
//! index of forecast time series whose values live in an external
//! [`TimeSeriesStorage`] backend. It enables:
//!
//! - **Per-type name uniqueness**: two components of one type never share
//!   a name, while different types may reuse names freely
//! - **Polymorphic lookup**: components are found by exact type or by any
//!   [`Capability`] their type declares
//! - **Windowed forecasts**: one long stored array serves any sub-window
//!   query without duplicating storage
//! - **Coordinated cleanup**: removing a component releases its arrays in
//!   the backend before the metadata disappears
//!
//! # Architecture
//!
//! ```text
//! ComponentRegistry::add(component)
//!      │
//!      ├─► Field range validation (ValidationDescriptors)
//!      ├─► Structural validation (Component::validate)
//!      └─► Bind storage into the component's Forecasts
//!
//! ComponentRegistry::get_forecast(name, label, initial_time, horizon)
//!      │
//!      ├─► Registry lookup by type + name
//!      ├─► Forecasts: find the covering stored record
//!      ├─► TimeSeriesStorage::read_range(array_ref, offset, horizon)
//!      └─► Forecast value (optionally scaled by a component field)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use series_storage::InMemoryStorage;
//! use system_data::{ComponentRegistry, ForecastInput, ValidationDescriptors};
//!
//! let storage = Arc::new(InMemoryStorage::new());
//! let mut registry = ComponentRegistry::new(storage, ValidationDescriptors::default());
//! registry.add(generator)?;
//!
//! registry.add_forecast::<ThermalGenerator>(
//!     "gen1",
//!     ForecastInput::deterministic("max_active_power", resolution, t0, values),
//! )?;
//! let window = registry.get_forecast::<ThermalGenerator>("gen1", "max_active_power", t0, 4)?;
//! ```

pub mod component;
pub mod config;
pub mod error;
pub mod forecasts;
pub mod registry;
pub mod serialization;
pub mod time;
pub mod validation;

// Re-export commonly used types at crate root
pub use component::{
    normalize_type_name, AsAny, Capability, Component, ComponentSelector, ComponentType,
    JsonProjection, TypeKey,
};
pub use config::SystemDataConfig;
pub use error::{Result, SystemDataError};
pub use forecasts::{
    DeterministicMetadata, Forecast, ForecastInput, ForecastKey, ForecastKind, ForecastMetadata,
    ForecastSummary, ForecastWindow, Forecasts, ProbabilisticMetadata, ScenarioBasedMetadata,
};
pub use registry::{AddOptions, ComponentRegistry};
pub use serialization::{ComponentProjection, ComponentTypes};
pub use validation::{FieldDescriptor, FieldValidator, RangeBound, ValidRange, ValidationDescriptors};

pub use series_storage::{InMemoryStorage, SeriesData, StorageError, TimeSeriesStorage};
