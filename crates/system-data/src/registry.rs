//! Type-indexed component registry.
//!
//! Components are stored in one bucket per concrete type, keyed by
//! [`TypeKey`], with names unique inside a bucket. Capability lookups scan
//! every bucket whose type declares the capability. The registry owns the
//! storage backend handle and binds it into each component's forecast
//! container on insertion.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use series_storage::TimeSeriesStorage;

use crate::component::{Capability, Component, ComponentSelector, ComponentType, TypeKey};
use crate::config::SystemDataConfig;
use crate::error::{Result, SystemDataError};
use crate::forecasts::{Forecast, ForecastInput, ForecastKind, ForecastSummary, Forecasts};
use crate::validation::{FieldValidator, ValidationDescriptors};

/// Per-insertion options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Skip the field range and structural validators.
    pub skip_validation: bool,
}

struct TypeBucket {
    key: TypeKey,
    capabilities: &'static [Capability],
    components: BTreeMap<String, Box<dyn Component>>,
}

impl TypeBucket {
    fn new(key: TypeKey, capabilities: &'static [Capability]) -> Self {
        Self {
            key,
            capabilities,
            components: BTreeMap::new(),
        }
    }

    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Container of uniquely named components, grouped by concrete type.
pub struct ComponentRegistry {
    components: HashMap<TypeKey, TypeBucket>,
    storage: Arc<dyn TimeSeriesStorage>,
    field_validator: Option<Box<dyn FieldValidator>>,
    default_options: AddOptions,
}

impl ComponentRegistry {
    /// Create a registry over `storage`. Empty descriptors disable field
    /// range validation.
    pub fn new(storage: Arc<dyn TimeSeriesStorage>, descriptors: ValidationDescriptors) -> Self {
        let field_validator = if descriptors.is_empty() {
            None
        } else {
            Some(Box::new(descriptors) as Box<dyn FieldValidator>)
        };

        Self {
            components: HashMap::new(),
            storage,
            field_validator,
            default_options: AddOptions::default(),
        }
    }

    /// Create a registry from configuration, loading the descriptor file if set.
    pub fn from_config(
        storage: Arc<dyn TimeSeriesStorage>,
        config: &SystemDataConfig,
    ) -> Result<Self> {
        config.validate()?;
        let descriptors = config.load_descriptors()?;

        let mut registry = Self::new(storage, descriptors);
        registry.default_options.skip_validation = config.skip_validation;

        info!(
            descriptors = ?config.validation_descriptors_path,
            skip_validation = config.skip_validation,
            "Created component registry"
        );
        Ok(registry)
    }

    /// Create a registry with a custom field validator.
    pub fn with_field_validator(
        storage: Arc<dyn TimeSeriesStorage>,
        validator: Box<dyn FieldValidator>,
    ) -> Self {
        Self {
            components: HashMap::new(),
            storage,
            field_validator: Some(validator),
            default_options: AddOptions::default(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn TimeSeriesStorage> {
        &self.storage
    }

    // === Insertion ===

    /// Add a component with the registry's default options.
    pub fn add<T: ComponentType>(&mut self, component: T) -> Result<()> {
        self.add_with_options(component, self.default_options)
    }

    /// Add a component.
    ///
    /// Fails with DuplicateName if the type already holds the name, and with
    /// Validation if the field range validator or the component's own
    /// structural check rejects it.
    pub fn add_with_options<T: ComponentType>(
        &mut self,
        mut component: T,
        options: AddOptions,
    ) -> Result<()> {
        let key = TypeKey::of::<T>();
        let name = component.name().to_string();

        if self
            .components
            .get(&key)
            .is_some_and(|bucket| bucket.components.contains_key(&name))
        {
            return Err(SystemDataError::DuplicateName {
                type_name: key.name().to_string(),
                name,
            });
        }

        if !options.skip_validation {
            self.validate_component(key, &component)?;
        }

        if let Some(forecasts) = component.forecasts_mut() {
            if forecasts.has_forecasts() {
                debug!(
                    type_name = %key,
                    component = %name,
                    records = forecasts.len(),
                    "Adding component that already carries forecasts"
                );
            }
            forecasts.attach_storage(Arc::clone(&self.storage));
        }

        self.components
            .entry(key)
            .or_insert_with(|| TypeBucket::new(key, T::CAPABILITIES))
            .components
            .insert(name.clone(), Box::new(component));

        debug!(type_name = %key, component = %name, "Added component");
        Ok(())
    }

    fn validate_component(&self, key: TypeKey, component: &dyn Component) -> Result<()> {
        if let Some(validator) = &self.field_validator {
            if !validator.validate(key.name(), component) {
                return Err(SystemDataError::validation(format!(
                    "{} '{}' has field values outside their valid range",
                    key,
                    component.name()
                )));
            }
        }

        if !component.validate() {
            warn!(type_name = %key, component = %component.name(), "Structural validation failed");
            return Err(SystemDataError::validation(format!(
                "{} '{}' failed structural validation",
                key,
                component.name()
            )));
        }
        Ok(())
    }

    // === Lookups ===

    /// Look up a component of an exact type.
    ///
    /// Returns `Ok(None)` when absent and a Type error for a capability
    /// selector, which may match several types.
    pub fn get(&self, selector: &ComponentSelector, name: &str) -> Result<Option<&dyn Component>> {
        match selector {
            ComponentSelector::Concrete(key) => Ok(self.get_by_key(key, name)),
            ComponentSelector::Capability(capability) => Err(SystemDataError::type_error(format!(
                "{} is not a concrete type, use get_by_name",
                capability
            ))),
        }
    }

    pub fn get_by_key(&self, key: &TypeKey, name: &str) -> Option<&dyn Component> {
        self.components
            .get(key)?
            .components
            .get(name)
            .map(|c| c.as_ref())
    }

    pub fn get_typed<T: ComponentType>(&self, name: &str) -> Option<&T> {
        self.get_by_key(&TypeKey::of::<T>(), name)?
            .as_any()
            .downcast_ref::<T>()
    }

    /// Mutable access to a stored component.
    ///
    /// The name must not be changed through this reference.
    pub fn get_mut<T: ComponentType>(&mut self, name: &str) -> Option<&mut T> {
        self.components
            .get_mut(&TypeKey::of::<T>())?
            .components
            .get_mut(name)?
            .as_mut()
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Every component named `name` among the types declaring a capability.
    ///
    /// Returns a Type error for a concrete selector.
    pub fn get_by_name(
        &self,
        selector: &ComponentSelector,
        name: &str,
    ) -> Result<Vec<&dyn Component>> {
        let ComponentSelector::Capability(capability) = selector else {
            return Err(SystemDataError::type_error(format!(
                "{} is a concrete type, use get",
                selector
            )));
        };

        Ok(self
            .sorted_buckets()
            .into_iter()
            .filter(|bucket| bucket.has_capability(*capability))
            .filter_map(|bucket| bucket.components.get(name))
            .map(|c| c.as_ref())
            .collect())
    }

    /// Snapshot of the components matching a selector, grouped by type.
    pub fn iter(&self, selector: &ComponentSelector) -> Vec<&dyn Component> {
        let buckets: Vec<&TypeBucket> = match selector {
            ComponentSelector::Concrete(key) => self.components.get(key).into_iter().collect(),
            ComponentSelector::Capability(capability) => self
                .sorted_buckets()
                .into_iter()
                .filter(|bucket| bucket.has_capability(*capability))
                .collect(),
        };

        buckets
            .into_iter()
            .flat_map(|bucket| bucket.components.values())
            .map(|c| c.as_ref())
            .collect()
    }

    /// Snapshot of every stored component, grouped by type.
    pub fn iter_all(&self) -> Vec<&dyn Component> {
        self.sorted_buckets()
            .into_iter()
            .flat_map(|bucket| bucket.components.values())
            .map(|c| c.as_ref())
            .collect()
    }

    pub fn iter_typed<T: ComponentType>(&self) -> impl Iterator<Item = &T> {
        self.components
            .get(&TypeKey::of::<T>())
            .into_iter()
            .flat_map(|bucket| bucket.components.values())
            .filter_map(|c| c.as_ref().as_any().downcast_ref::<T>())
    }

    pub fn has_component<T: ComponentType>(&self, name: &str) -> bool {
        self.get_by_key(&TypeKey::of::<T>(), name).is_some()
    }

    /// Total number of stored components.
    pub fn count(&self) -> usize {
        self.components.values().map(|b| b.components.len()).sum()
    }

    pub fn count_by_key(&self, key: &TypeKey) -> usize {
        self.components.get(key).map_or(0, |b| b.components.len())
    }

    /// Number of types currently holding at least one component.
    pub fn type_count(&self) -> usize {
        self.components
            .values()
            .filter(|b| !b.components.is_empty())
            .count()
    }

    /// Keys of the types currently holding components, sorted by name.
    pub fn types(&self) -> Vec<TypeKey> {
        self.sorted_buckets()
            .into_iter()
            .filter(|b| !b.components.is_empty())
            .map(|b| b.key)
            .collect()
    }

    fn sorted_buckets(&self) -> Vec<&TypeBucket> {
        let mut buckets: Vec<&TypeBucket> = self.components.values().collect();
        buckets.sort_by_key(|b| b.key.name());
        buckets
    }

    // === Removal ===

    /// Remove a component, releasing its stored forecast arrays first.
    pub fn remove<T: ComponentType>(&mut self, name: &str) -> Result<T> {
        let key = TypeKey::of::<T>();
        let removed = self.remove_by_key(&key, name)?;
        removed
            .into_any()
            .downcast::<T>()
            .map(|c| *c)
            .map_err(|_| SystemDataError::type_error(format!("{} '{}' has a foreign type", key, name)))
    }

    /// Remove the stored component with the same type and name as `component`.
    pub fn remove_component<T: ComponentType>(&mut self, component: &T) -> Result<T> {
        self.remove::<T>(component.name())
    }

    /// Remove a component by type key.
    ///
    /// Arrays are deleted before the component leaves the registry. If the
    /// backend fails the component stays stored.
    pub fn remove_by_key(&mut self, key: &TypeKey, name: &str) -> Result<Box<dyn Component>> {
        let bucket = self.bucket_mut(key)?;
        let component = bucket
            .components
            .get_mut(name)
            .ok_or_else(|| SystemDataError::not_found(format!("{} '{}'", key, name)))?;

        let released = prepare_for_removal(component.as_mut())?;
        let removed = bucket
            .components
            .remove(name)
            .ok_or_else(|| SystemDataError::not_found(format!("{} '{}'", key, name)))?;

        debug!(type_name = %key, component = %name, released, "Removed component");
        Ok(removed)
    }

    /// Remove every component of a type. Returns the number removed.
    pub fn remove_all<T: ComponentType>(&mut self) -> Result<usize> {
        self.remove_all_by_key(&TypeKey::of::<T>())
    }

    pub fn remove_all_by_key(&mut self, key: &TypeKey) -> Result<usize> {
        let bucket = self.bucket_mut(key)?;
        let names: Vec<String> = bucket.components.keys().cloned().collect();

        let mut released = 0;
        for name in &names {
            if let Some(component) = bucket.components.get_mut(name) {
                released += prepare_for_removal(component.as_mut())?;
            }
            bucket.components.remove(name);
        }

        info!(type_name = %key, removed = names.len(), released, "Removed all components of type");
        Ok(names.len())
    }

    fn bucket_mut(&mut self, key: &TypeKey) -> Result<&mut TypeBucket> {
        self.components
            .get_mut(key)
            .ok_or_else(|| SystemDataError::not_found(format!("no components of type {} were stored", key)))
    }

    // === Forecasts ===

    /// Write a forecast's values to the backend and index it on a component.
    ///
    /// The array is deleted again if the record cannot be inserted.
    #[instrument(skip(self, input), fields(label = %input.label(), initial_time = %input.initial_time()))]
    pub fn add_forecast<T: ComponentType>(&mut self, name: &str, input: ForecastInput) -> Result<()> {
        self.add_forecast_by_key(&TypeKey::of::<T>(), name, input)
    }

    pub fn add_forecast_by_key(
        &mut self,
        key: &TypeKey,
        name: &str,
        input: ForecastInput,
    ) -> Result<()> {
        let storage = Arc::clone(&self.storage);
        let component = self.component_mut(key, name)?;
        let owner = component.uuid();
        let forecasts = forecasts_mut(key, component)?;

        if forecasts.contains(input.label(), input.initial_time()) {
            return Err(SystemDataError::DuplicateKey {
                label: input.label().to_string(),
                initial_time: input.initial_time(),
            });
        }

        // Check the record before anything reaches the backend.
        let template = input.metadata(Uuid::nil())?;
        let label = template.label().to_string();
        let array_ref = storage.write_array(owner, &label, input.into_data())?;

        if let Err(e) = forecasts.add_forecast(template.with_array_ref(array_ref)) {
            return Err(rollback_write(storage.as_ref(), array_ref, owner, &label, e));
        }

        debug!(type_name = %key, component = %name, label = %label, %array_ref, "Added forecast");
        Ok(())
    }

    /// Delete a forecast's array, then its record.
    pub fn remove_forecast<T: ComponentType>(
        &mut self,
        name: &str,
        kind: ForecastKind,
        initial_time: DateTime<Utc>,
        label: &str,
    ) -> Result<()> {
        let key = TypeKey::of::<T>();
        let storage = Arc::clone(&self.storage);
        let component = self.component_mut(&key, name)?;
        let owner = component.uuid();
        let forecasts = forecasts_mut(&key, component)?;

        let array_ref = {
            let metadata = forecasts.get_metadata(label, initial_time)?;
            if metadata.kind() != kind {
                return Err(SystemDataError::not_found(format!(
                    "{} forecast '{}' at {}",
                    kind, label, initial_time
                )));
            }
            metadata.array_ref()
        };

        storage.delete_array(array_ref, owner, label)?;
        forecasts.remove_forecast(kind, initial_time, label)?;

        debug!(type_name = %key, component = %name, label = %label, "Removed forecast");
        Ok(())
    }

    /// Delete every forecast of every component. Returns the number of
    /// records removed.
    pub fn clear_forecasts(&mut self) -> Result<usize> {
        let mut removed = 0;
        for bucket in self.components.values_mut() {
            for component in bucket.components.values_mut() {
                let owner = component.uuid();
                if let Some(forecasts) = component.forecasts_mut() {
                    removed += forecasts.remove_all_forecasts(owner)?;
                }
            }
        }

        info!(removed, "Cleared forecasts");
        Ok(removed)
    }

    /// Read `horizon` rows of a forecast starting at `initial_time`.
    pub fn get_forecast<T: ComponentType>(
        &self,
        name: &str,
        label: &str,
        initial_time: DateTime<Utc>,
        horizon: usize,
    ) -> Result<Forecast> {
        let key = TypeKey::of::<T>();
        let component = self.component(&key, name)?;
        forecasts_of(&key, component)?.get_forecast_window(label, initial_time, horizon)
    }

    /// Like [`ComponentRegistry::get_forecast`], with values multiplied by
    /// the component field named by the record's scaling factor field.
    pub fn get_forecast_values<T: ComponentType>(
        &self,
        name: &str,
        label: &str,
        initial_time: DateTime<Utc>,
        horizon: usize,
    ) -> Result<Forecast> {
        let key = TypeKey::of::<T>();
        let component = self.component(&key, name)?;
        let forecast =
            forecasts_of(&key, component)?.get_forecast_window(label, initial_time, horizon)?;

        let factor = match forecast.metadata().scaling_factor_field() {
            Some(field) => Some(component.field_value(field).ok_or_else(|| {
                SystemDataError::not_found(format!(
                    "{} '{}' has no numeric field '{}'",
                    key, name, field
                ))
            })?),
            None => None,
        };

        Ok(match factor {
            Some(factor) => forecast.scaled(factor),
            None => forecast,
        })
    }

    /// Components that currently hold forecasts, grouped by type.
    pub fn components_with_forecasts(&self) -> Vec<&dyn Component> {
        self.iter_all()
            .into_iter()
            .filter(|c| c.forecasts().is_some_and(Forecasts::has_forecasts))
            .collect()
    }

    /// True if every label of every forecasted component shares the same
    /// initial times. Holds trivially when nothing has forecasts.
    pub fn check_forecast_consistency(&self) -> bool {
        let mut reference: Option<Vec<DateTime<Utc>>> = None;
        for component in self.components_with_forecasts() {
            let Some(forecasts) = component.forecasts() else {
                continue;
            };
            if !forecasts.check_consistency() {
                debug!(component = %component.name(), "Forecast labels disagree on initial times");
                return false;
            }

            let times = forecasts.unique_initial_times();
            match &reference {
                Some(expected) if *expected != times => {
                    debug!(component = %component.name(), "Forecast initial times differ between components");
                    return false;
                }
                Some(_) => {}
                None => reference = Some(times),
            }
        }
        true
    }

    /// [`ComponentRegistry::check_forecast_consistency`] as a DataFormat error.
    pub fn validate_forecast_consistency(&self) -> Result<()> {
        if self.check_forecast_consistency() {
            Ok(())
        } else {
            Err(SystemDataError::data_format(
                "forecast initial times are not consistent across components and labels",
            ))
        }
    }

    /// Initial times shared by every forecast in the registry. Empty when
    /// nothing has forecasts.
    pub fn forecast_initial_times(&self) -> Result<Vec<DateTime<Utc>>> {
        self.validate_forecast_consistency()?;
        Ok(self
            .first_forecasts()
            .map(Forecasts::unique_initial_times)
            .unwrap_or_default())
    }

    /// Window start times over the registry's forecasts; see
    /// [`Forecasts::generate_initial_times`].
    pub fn generate_initial_times(
        &self,
        interval: Duration,
        horizon: usize,
        start: Option<DateTime<Utc>>,
    ) -> Result<Vec<DateTime<Utc>>> {
        self.validate_forecast_consistency()?;
        self.first_forecasts()
            .ok_or_else(|| SystemDataError::not_found("no component has forecasts"))?
            .generate_initial_times(interval, horizon, start)
    }

    /// Timing summary of the registry's forecasts; `None` when nothing has
    /// forecasts.
    pub fn forecast_summary(&self) -> Result<Option<ForecastSummary>> {
        self.validate_forecast_consistency()?;
        Ok(self.first_forecasts().and_then(ForecastSummary::from_forecasts))
    }

    fn first_forecasts(&self) -> Option<&Forecasts> {
        self.components_with_forecasts()
            .into_iter()
            .find_map(|c| c.forecasts())
    }

    fn component(&self, key: &TypeKey, name: &str) -> Result<&dyn Component> {
        self.get_by_key(key, name)
            .ok_or_else(|| SystemDataError::not_found(format!("{} '{}'", key, name)))
    }

    fn component_mut(&mut self, key: &TypeKey, name: &str) -> Result<&mut dyn Component> {
        self.components
            .get_mut(key)
            .and_then(|bucket| bucket.components.get_mut(name))
            .map(|c| c.as_mut())
            .ok_or_else(|| SystemDataError::not_found(format!("{} '{}'", key, name)))
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("types", &self.type_count())
            .field("components", &self.count())
            .field("arrays", &self.storage.num_arrays())
            .field("field_validation", &self.field_validator.is_some())
            .field("default_options", &self.default_options)
            .finish()
    }
}

/// Delete a component's stored arrays and detach it from the backend.
fn prepare_for_removal(component: &mut dyn Component) -> Result<usize> {
    let owner = component.uuid();
    match component.forecasts_mut() {
        Some(forecasts) => forecasts.prepare_for_removal(owner),
        None => Ok(0),
    }
}

/// Drop an array whose record was rejected, returning the rejection.
///
/// A failed delete is logged and leaves the original error in place.
fn rollback_write(
    storage: &dyn TimeSeriesStorage,
    array_ref: Uuid,
    owner: Uuid,
    label: &str,
    error: SystemDataError,
) -> SystemDataError {
    if let Err(e) = storage.delete_array(array_ref, owner, label) {
        warn!(%array_ref, label = %label, error = %e, "Failed to roll back forecast array");
    }
    error
}

fn forecasts_of<'a>(key: &TypeKey, component: &'a dyn Component) -> Result<&'a Forecasts> {
    component
        .forecasts()
        .ok_or_else(|| SystemDataError::type_error(format!("{} does not support forecasts", key)))
}

fn forecasts_mut<'a>(key: &TypeKey, component: &'a mut dyn Component) -> Result<&'a mut Forecasts> {
    component
        .forecasts_mut()
        .ok_or_else(|| SystemDataError::type_error(format!("{} does not support forecasts", key)))
}
