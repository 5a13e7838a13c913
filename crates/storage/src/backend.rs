//! The storage contract consumed by the forecast layer.

use uuid::Uuid;

use crate::data::SeriesData;
use crate::error::StorageResult;

/// Backend holding forecast arrays, addressed by opaque references.
///
/// Each array is referenced by one or more `(owner, label)` pairs, where
/// `owner` is the UUID of the component the forecast belongs to. Calls are
/// blocking; retries, if any, belong to the implementation.
pub trait TimeSeriesStorage: Send + Sync {
    /// Store a new array referenced by `(owner, label)` and return its reference.
    fn write_array(&self, owner: Uuid, label: &str, data: SeriesData) -> StorageResult<Uuid>;

    /// Add another `(owner, label)` reference to an existing array.
    fn add_reference(&self, array_ref: Uuid, owner: Uuid, label: &str) -> StorageResult<()>;

    /// Read a whole array.
    fn read_array(&self, array_ref: Uuid) -> StorageResult<SeriesData>;

    /// Read the rows `[offset, offset + length)` of an array.
    fn read_range(&self, array_ref: Uuid, offset: usize, length: usize)
        -> StorageResult<SeriesData>;

    /// Drop the `(owner, label)` reference to an array.
    ///
    /// The array itself is released once no references remain.
    fn delete_array(&self, array_ref: Uuid, owner: Uuid, label: &str) -> StorageResult<()>;

    /// Number of arrays currently stored.
    fn num_arrays(&self) -> usize;
}
