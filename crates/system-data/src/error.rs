//! Error types for the component data layer.

use chrono::{DateTime, Utc};
use thiserror::Error;

use series_storage::StorageError;

/// Errors that can occur in registry and forecast operations.
///
/// `DuplicateName`, `DuplicateKey`, `NotFound` and `Type` point at a bug at
/// the call site. `Validation` and `DataFormat` describe bad model data and
/// are meant to be surfaced to the end user.
#[derive(Error, Debug)]
pub enum SystemDataError {
    /// A component of the same type with the same name is already stored.
    #[error("{type_name} with name '{name}' is already stored")]
    DuplicateName { type_name: String, name: String },

    /// A forecast with the same (label, initial time) is already stored.
    #[error("forecast '{label}' at {initial_time} is already stored")]
    DuplicateKey {
        label: String,
        initial_time: DateTime<Utc>,
    },

    /// Lookup or removal miss.
    #[error("not found: {0}")]
    NotFound(String),

    /// Concrete/abstract type misuse at an API boundary.
    #[error("type error: {0}")]
    Type(String),

    /// Field range, structural or forecast precondition check failed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Forecast initial times disagree across labels or components.
    #[error("data format error: {0}")]
    DataFormat(String),

    /// The forecast container has no storage backend bound to it.
    #[error("forecast container is not attached to a storage backend")]
    StorageNotAttached,

    /// Storage backend failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON projection error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SystemDataError {
    /// Create a NotFound error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a Type error.
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }

    /// Create a Validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a DataFormat error.
    pub fn data_format(msg: impl Into<String>) -> Self {
        Self::DataFormat(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<serde_yaml::Error> for SystemDataError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(format!("YAML error: {}", err))
    }
}

/// Result type for registry and forecast operations.
pub type Result<T> = std::result::Result<T, SystemDataError>;
