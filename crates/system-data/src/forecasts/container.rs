//! Per-component forecast index.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use series_storage::TimeSeriesStorage;

use super::forecast::Forecast;
use super::metadata::{ForecastKey, ForecastKind, ForecastMetadata};
use super::window;
use crate::error::{Result, SystemDataError};

/// Forecast metadata of one component, keyed by (label, initial time).
///
/// Values live in the storage backend bound by the registry when the
/// owning component is added. Records are never mutated in place: replace
/// a record by removing it and adding a new one.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<ForecastMetadata>",
    into = "Vec<ForecastMetadata>"
)]
pub struct Forecasts {
    data: BTreeMap<ForecastKey, ForecastMetadata>,
    storage: Option<Arc<dyn TimeSeriesStorage>>,
}

impl Forecasts {
    pub fn new() -> Self {
        Self::default()
    }

    // === Storage binding ===

    pub fn attach_storage(&mut self, storage: Arc<dyn TimeSeriesStorage>) {
        self.storage = Some(storage);
    }

    pub fn detach_storage(&mut self) {
        self.storage = None;
    }

    pub fn is_attached(&self) -> bool {
        self.storage.is_some()
    }

    pub fn storage(&self) -> Result<&Arc<dyn TimeSeriesStorage>> {
        self.storage.as_ref().ok_or(SystemDataError::StorageNotAttached)
    }

    // === Records ===

    /// Insert a record; fails with DuplicateKey if (label, initial time) is taken.
    pub fn add_forecast(&mut self, metadata: ForecastMetadata) -> Result<()> {
        metadata.validate()?;
        let key = metadata.key();
        if self.data.contains_key(&key) {
            return Err(SystemDataError::DuplicateKey {
                label: key.label,
                initial_time: key.initial_time,
            });
        }

        debug!(
            label = %key.label,
            initial_time = %key.initial_time,
            kind = %metadata.kind(),
            horizon = metadata.horizon(),
            "Added forecast metadata"
        );
        self.data.insert(key, metadata);
        Ok(())
    }

    /// Remove a record's metadata only.
    ///
    /// The caller deletes the backing array first so that no record ever
    /// points at a deleted array.
    pub fn remove_forecast(
        &mut self,
        kind: ForecastKind,
        initial_time: DateTime<Utc>,
        label: &str,
    ) -> Result<ForecastMetadata> {
        let key = ForecastKey::new(label, initial_time);
        match self.data.get(&key) {
            Some(metadata) if metadata.kind() == kind => {}
            _ => {
                return Err(SystemDataError::not_found(format!(
                    "{} forecast {}",
                    kind, key
                )))
            }
        }

        debug!(label = %label, initial_time = %initial_time, "Removed forecast metadata");
        self.data
            .remove(&key)
            .ok_or_else(|| SystemDataError::not_found(format!("forecast {}", key)))
    }

    pub fn has_forecasts(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains(&self, label: &str, initial_time: DateTime<Utc>) -> bool {
        self.data.contains_key(&ForecastKey::new(label, initial_time))
    }

    /// Records in initial-time order.
    pub fn iter(&self) -> impl Iterator<Item = &ForecastMetadata> {
        self.data.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ForecastKey> {
        self.data.keys()
    }

    /// Distinct labels, sorted.
    pub fn labels(&self) -> Vec<&str> {
        let labels: BTreeSet<&str> = self.data.keys().map(|k| k.label.as_str()).collect();
        labels.into_iter().collect()
    }

    /// Records of one label in initial-time order.
    pub fn records_for<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a ForecastMetadata> {
        self.data.values().filter(move |m| m.label() == label)
    }

    /// Drop all metadata.
    ///
    /// Backing arrays must already be deleted; see [`Forecasts::prepare_for_removal`].
    pub fn clear(&mut self) {
        self.data.clear();
    }

    // === Lookups ===

    /// Distinct initial times across all labels, ascending.
    pub fn initial_times(&self) -> Result<Vec<DateTime<Utc>>> {
        if self.data.is_empty() {
            return Err(SystemDataError::not_found("component has no forecasts"));
        }
        Ok(self.unique_initial_times())
    }

    /// Initial times of one label, ascending.
    pub fn initial_times_for(&self, label: &str) -> Result<Vec<DateTime<Utc>>> {
        if self.data.is_empty() {
            return Err(SystemDataError::not_found("component has no forecasts"));
        }
        Ok(self.records_for(label).map(|m| m.initial_time()).collect())
    }

    pub(crate) fn unique_initial_times(&self) -> Vec<DateTime<Utc>> {
        // Keys sort by initial time first, so dedup of adjacent values suffices.
        let mut times: Vec<DateTime<Utc>> = self.data.keys().map(|k| k.initial_time).collect();
        times.dedup();
        times
    }

    /// Exact metadata lookup.
    pub fn get_metadata(&self, label: &str, initial_time: DateTime<Utc>) -> Result<&ForecastMetadata> {
        let key = ForecastKey::new(label, initial_time);
        self.data
            .get(&key)
            .ok_or_else(|| SystemDataError::not_found(format!("forecast {}", key)))
    }

    /// Read the full stored span of a record.
    pub fn get_forecast(&self, label: &str, initial_time: DateTime<Utc>) -> Result<Forecast> {
        let metadata = self.get_metadata(label, initial_time)?;
        let data = self.storage()?.read_range(
            metadata.array_ref(),
            metadata.start_index(),
            metadata.horizon(),
        )?;
        Ok(Forecast::new(metadata.clone(), data))
    }

    /// Read `horizon` rows starting at `initial_time`, served from the
    /// first stored record of `label` whose span covers the request.
    pub fn get_forecast_window(
        &self,
        label: &str,
        initial_time: DateTime<Utc>,
        horizon: usize,
    ) -> Result<Forecast> {
        if horizon == 0 {
            return Err(SystemDataError::validation("horizon must be greater than 0"));
        }

        let (record, offset) = window::locate(self.records_for(label), initial_time, horizon)
            .ok_or_else(|| {
                SystemDataError::not_found(format!(
                    "no stored forecast '{}' covers {} rows from {}",
                    label, horizon, initial_time
                ))
            })?;

        let start_index = record.start_index() + offset;
        let data = self
            .storage()?
            .read_range(record.array_ref(), start_index, horizon)?;

        debug!(
            label = %label,
            initial_time = %initial_time,
            stored_initial_time = %record.initial_time(),
            offset,
            horizon,
            "Read forecast window"
        );
        Ok(Forecast::new(
            record.sub_window(initial_time, start_index, horizon),
            data,
        ))
    }

    // === Consistency and window generation ===

    /// True if every label has the same set of initial times.
    pub fn check_consistency(&self) -> bool {
        let mut by_label: BTreeMap<&str, BTreeSet<DateTime<Utc>>> = BTreeMap::new();
        for key in self.data.keys() {
            by_label
                .entry(key.label.as_str())
                .or_default()
                .insert(key.initial_time);
        }

        let mut sets = by_label.values();
        match sets.next() {
            Some(first) => sets.all(|set| set == first),
            None => true,
        }
    }

    /// Initial times at which a `horizon`-row window can start, stepping by
    /// `interval`, over the contiguous span of one label's records.
    pub fn generate_initial_times_for(
        &self,
        label: &str,
        interval: Duration,
        horizon: usize,
        start: Option<DateTime<Utc>>,
    ) -> Result<Vec<DateTime<Utc>>> {
        if self.data.is_empty() {
            return Err(SystemDataError::not_found("component has no forecasts"));
        }
        let contiguous = window::check_contiguous(self.records_for(label))?;
        window::initial_times(&contiguous, interval, horizon, start)
    }

    /// Like [`Forecasts::generate_initial_times_for`], requiring every label
    /// to produce the same sequence.
    pub fn generate_initial_times(
        &self,
        interval: Duration,
        horizon: usize,
        start: Option<DateTime<Utc>>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let labels = self.labels();
        let (first_label, others) = labels
            .split_first()
            .ok_or_else(|| SystemDataError::not_found("component has no forecasts"))?;

        let times = self.generate_initial_times_for(first_label, interval, horizon, start)?;
        for label in others {
            let other = self.generate_initial_times_for(label, interval, horizon, start)?;
            if other != times {
                return Err(SystemDataError::validation(format!(
                    "forecasts '{}' and '{}' cover different spans",
                    first_label, label
                )));
            }
        }
        Ok(times)
    }

    // === Summaries ===

    /// Resolution of the first record.
    pub fn resolution(&self) -> Option<Duration> {
        self.data.values().next().map(|m| m.resolution())
    }

    /// Horizon of the first record.
    pub fn horizon(&self) -> Option<usize> {
        self.data.values().next().map(|m| m.horizon())
    }

    /// Gap between the first two distinct initial times.
    pub fn interval(&self) -> Option<Duration> {
        let times = self.unique_initial_times();
        match times.as_slice() {
            [first, second, ..] => Some(second.signed_duration_since(*first)),
            _ => None,
        }
    }

    // === Removal ===

    /// Delete every record's array from the backend, each followed by its
    /// metadata. Returns the number of arrays deleted.
    ///
    /// On a backend failure the records not yet deleted stay in place.
    pub fn remove_all_forecasts(&mut self, owner: Uuid) -> Result<usize> {
        let Some(storage) = self.storage.clone() else {
            if !self.data.is_empty() {
                warn!(
                    owner = %owner,
                    records = self.data.len(),
                    "Dropping forecasts of a detached container, arrays may leak"
                );
            }
            self.data.clear();
            return Ok(0);
        };

        let keys: Vec<ForecastKey> = self.data.keys().cloned().collect();
        let mut deleted = 0;
        for key in keys {
            if let Some(metadata) = self.data.get(&key) {
                storage.delete_array(metadata.array_ref(), owner, &key.label)?;
                self.data.remove(&key);
                deleted += 1;
            }
        }

        debug!(owner = %owner, deleted, "Released forecast arrays");
        Ok(deleted)
    }

    /// [`Forecasts::remove_all_forecasts`], then detach the backend.
    pub fn prepare_for_removal(&mut self, owner: Uuid) -> Result<usize> {
        let deleted = self.remove_all_forecasts(owner)?;
        self.detach_storage();
        Ok(deleted)
    }
}

impl PartialEq for Forecasts {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl fmt::Debug for Forecasts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forecasts")
            .field("data", &self.data)
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl TryFrom<Vec<ForecastMetadata>> for Forecasts {
    type Error = SystemDataError;

    fn try_from(records: Vec<ForecastMetadata>) -> Result<Self> {
        let mut forecasts = Forecasts::new();
        for metadata in records {
            forecasts.add_forecast(metadata)?;
        }
        Ok(forecasts)
    }
}

impl From<Forecasts> for Vec<ForecastMetadata> {
    fn from(forecasts: Forecasts) -> Self {
        forecasts.data.into_values().collect()
    }
}
