//! In-process storage backend.
//!
//! Arrays live in a map guarded by an `RwLock` and are reference counted
//! by `(owner, label)` pairs: deleting the last reference releases the
//! array. Operation counters are kept for inspection.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::backend::TimeSeriesStorage;
use crate::data::SeriesData;
use crate::error::{StorageError, StorageResult};

struct StoredArray {
    data: SeriesData,
    references: HashSet<(Uuid, String)>,
}

/// Operation counters for an [`InMemoryStorage`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Arrays currently stored.
    pub arrays: usize,
    /// `write_array` calls that succeeded.
    pub writes: u64,
    /// `read_array` / `read_range` calls that succeeded.
    pub reads: u64,
    /// `delete_array` calls that succeeded.
    pub deletions: u64,
    /// Arrays released after their last reference was deleted.
    pub released: u64,
}

/// Reference-counted in-memory array store.
#[derive(Default)]
pub struct InMemoryStorage {
    arrays: RwLock<HashMap<Uuid, StoredArray>>,
    writes: AtomicU64,
    reads: AtomicU64,
    deletions: AtomicU64,
    released: AtomicU64,
}

impl InMemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get operation statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            arrays: self.num_arrays(),
            writes: self.writes.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            deletions: self.deletions.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
        }
    }

    /// Number of references held on an array, or `None` if it is not stored.
    pub fn reference_count(&self, array_ref: Uuid) -> Option<usize> {
        let arrays = self.arrays.read().ok()?;
        arrays.get(&array_ref).map(|a| a.references.len())
    }

    /// Check if an array is stored.
    pub fn contains(&self, array_ref: Uuid) -> bool {
        self.reference_count(array_ref).is_some()
    }
}

impl TimeSeriesStorage for InMemoryStorage {
    #[instrument(skip(self, data), fields(owner = %owner, label = %label))]
    fn write_array(&self, owner: Uuid, label: &str, data: SeriesData) -> StorageResult<Uuid> {
        let array_ref = Uuid::new_v4();
        let rows = data.rows();

        let mut arrays = self.arrays.write().map_err(|_| StorageError::LockPoisoned)?;
        arrays.insert(
            array_ref,
            StoredArray {
                data,
                references: HashSet::from([(owner, label.to_string())]),
            },
        );
        self.writes.fetch_add(1, Ordering::Relaxed);

        debug!(array = %array_ref, rows, "Stored array");
        Ok(array_ref)
    }

    fn add_reference(&self, array_ref: Uuid, owner: Uuid, label: &str) -> StorageResult<()> {
        let mut arrays = self.arrays.write().map_err(|_| StorageError::LockPoisoned)?;
        let stored = arrays
            .get_mut(&array_ref)
            .ok_or(StorageError::ArrayNotFound(array_ref))?;
        stored.references.insert((owner, label.to_string()));
        Ok(())
    }

    fn read_array(&self, array_ref: Uuid) -> StorageResult<SeriesData> {
        let arrays = self.arrays.read().map_err(|_| StorageError::LockPoisoned)?;
        let stored = arrays
            .get(&array_ref)
            .ok_or(StorageError::ArrayNotFound(array_ref))?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(stored.data.clone())
    }

    fn read_range(
        &self,
        array_ref: Uuid,
        offset: usize,
        length: usize,
    ) -> StorageResult<SeriesData> {
        let arrays = self.arrays.read().map_err(|_| StorageError::LockPoisoned)?;
        let stored = arrays
            .get(&array_ref)
            .ok_or(StorageError::ArrayNotFound(array_ref))?;
        let slice = stored.data.slice_rows(offset, length)?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        debug!(array = %array_ref, offset, length, "Read array range");
        Ok(slice)
    }

    #[instrument(skip(self), fields(array = %array_ref))]
    fn delete_array(&self, array_ref: Uuid, owner: Uuid, label: &str) -> StorageResult<()> {
        let mut arrays = self.arrays.write().map_err(|_| StorageError::LockPoisoned)?;
        let stored = arrays
            .get_mut(&array_ref)
            .ok_or(StorageError::ArrayNotFound(array_ref))?;

        if !stored.references.remove(&(owner, label.to_string())) {
            return Err(StorageError::ReferenceNotFound {
                array_ref,
                owner,
                label: label.to_string(),
            });
        }
        self.deletions.fetch_add(1, Ordering::Relaxed);

        if stored.references.is_empty() {
            arrays.remove(&array_ref);
            self.released.fetch_add(1, Ordering::Relaxed);
            debug!("Released array with no remaining references");
        }

        Ok(())
    }

    fn num_arrays(&self) -> usize {
        self.arrays.read().map(|a| a.len()).unwrap_or(0)
    }
}
