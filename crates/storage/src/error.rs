//! Error types for time-series storage backends.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using StorageError.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No array is stored under the reference.
    #[error("array not found: {0}")]
    ArrayNotFound(Uuid),

    /// The array exists but the (owner, label) pair does not reference it.
    #[error("array {array_ref} is not referenced by owner {owner} with label '{label}'")]
    ReferenceNotFound {
        array_ref: Uuid,
        owner: Uuid,
        label: String,
    },

    /// A row range extends past the end of the stored array.
    #[error("range [{offset}, {end}) is outside array of {rows} rows")]
    OutOfRange {
        offset: usize,
        end: usize,
        rows: usize,
    },

    /// Values do not fill a whole number of rows.
    #[error("{len} values cannot be arranged in rows of {columns} columns")]
    ShapeMismatch { len: usize, columns: usize },

    /// A backend lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    LockPoisoned,
}
