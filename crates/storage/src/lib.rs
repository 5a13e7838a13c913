//! Storage abstractions for forecast time series.
//!
//! Provides:
//! - The [`TimeSeriesStorage`] contract used by the component data layer
//!   to write, read (whole or by row range) and release numeric arrays
//!   addressed by opaque [`uuid::Uuid`] references
//! - [`SeriesData`], the row-major array payload exchanged with a backend
//! - [`InMemoryStorage`], a reference-counted in-process backend

pub mod backend;
pub mod data;
pub mod error;
pub mod memory;

pub use backend::TimeSeriesStorage;
pub use data::SeriesData;
pub use error::{StorageError, StorageResult};
pub use memory::{InMemoryStorage, StorageStats};
