//! JSON projection of a registry and its inverse.
//!
//! The projection maps each normalized type name to the components of that
//! type. Loading it back needs a [`ComponentTypes`] catalog, built once at
//! startup, that knows how to deserialize each type name.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};

use series_storage::TimeSeriesStorage;

use crate::component::{Component, ComponentSelector, ComponentType, TypeKey};
use crate::config::SystemDataConfig;
use crate::error::{Result, SystemDataError};
use crate::registry::{AddOptions, ComponentRegistry};

/// Components grouped by normalized type name.
///
/// Two types with the same unqualified name share an entry.
pub type ComponentProjection<'a> = BTreeMap<&'static str, Vec<&'a dyn Component>>;

type InsertFn = fn(&mut ComponentRegistry, Value, AddOptions) -> Result<()>;

fn insert_from_json<T: ComponentType>(
    registry: &mut ComponentRegistry,
    value: Value,
    options: AddOptions,
) -> Result<()> {
    let component: T = serde_json::from_value(value)?;
    registry.add_with_options(component, options)
}

struct TypeEntry {
    key: TypeKey,
    insert: InsertFn,
}

/// Catalog of the component types a projection may contain.
#[derive(Default)]
pub struct ComponentTypes {
    entries: BTreeMap<&'static str, TypeEntry>,
}

impl ComponentTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type under its normalized name.
    ///
    /// Registering the same type twice is a no-op; another type with the
    /// same name is a DuplicateName error.
    pub fn register<T: ComponentType>(&mut self) -> Result<&mut Self> {
        let key = TypeKey::of::<T>();
        if let Some(existing) = self.entries.get(key.name()) {
            if existing.key == key {
                return Ok(self);
            }
            return Err(SystemDataError::DuplicateName {
                type_name: "component type".to_string(),
                name: key.name().to_string(),
            });
        }

        self.entries.insert(
            key.name(),
            TypeEntry {
                key,
                insert: insert_from_json::<T>,
            },
        );
        Ok(self)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    pub fn key(&self, type_name: &str) -> Option<TypeKey> {
        self.entries.get(type_name).map(|e| e.key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, type_name: &str) -> Result<&TypeEntry> {
        self.entries.get(type_name).ok_or_else(|| {
            SystemDataError::not_found(format!("component type '{}' is not registered", type_name))
        })
    }
}

impl fmt::Debug for ComponentTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentTypes")
            .field("types", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ComponentRegistry {
    /// Group every stored component under its type name.
    pub fn to_projection(&self) -> ComponentProjection<'_> {
        let mut projection = ComponentProjection::new();
        for key in self.types() {
            projection
                .entry(key.name())
                .or_default()
                .extend(self.iter(&ComponentSelector::Concrete(key)));
        }
        projection
    }

    /// JSON object of the projection: type name to array of components.
    pub fn to_json(&self) -> Result<Value> {
        let mut object = Map::new();
        for (type_name, components) in self.to_projection() {
            let values = components
                .into_iter()
                .map(|c| c.to_json_value())
                .collect::<serde_json::Result<Vec<Value>>>()?;
            object.insert(type_name.to_string(), Value::Array(values));
        }
        Ok(Value::Object(object))
    }

    /// Build a registry from a JSON projection.
    ///
    /// Forecast records are loaded as stored; their arrays must already be
    /// present in `storage`.
    pub fn from_json(
        value: &Value,
        types: &ComponentTypes,
        storage: Arc<dyn TimeSeriesStorage>,
        config: &SystemDataConfig,
    ) -> Result<Self> {
        let mut registry = Self::from_config(storage, config)?;
        let options = AddOptions {
            skip_validation: config.skip_validation,
        };
        let loaded = registry.load_json(value, types, options)?;
        info!(components = loaded, types = registry.type_count(), "Loaded registry from JSON");
        Ok(registry)
    }

    /// Add every component of a JSON projection. Returns the number added.
    ///
    /// Stops at the first failing component; the ones before it stay added.
    pub fn load_json(
        &mut self,
        value: &Value,
        types: &ComponentTypes,
        options: AddOptions,
    ) -> Result<usize> {
        let object = value.as_object().ok_or_else(|| {
            SystemDataError::data_format("component projection must be a JSON object")
        })?;

        let mut loaded = 0;
        for (type_name, components) in object {
            let entry = types.entry(type_name)?;
            let components = components.as_array().ok_or_else(|| {
                SystemDataError::data_format(format!(
                    "components of type '{}' must be a JSON array",
                    type_name
                ))
            })?;

            for component in components {
                (entry.insert)(self, component.clone(), options)?;
                loaded += 1;
            }
            debug!(type_name = %type_name, count = components.len(), "Loaded components");
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Capability;
    use crate::validation::ValidationDescriptors;
    use serde::{Deserialize, Serialize};
    use series_storage::InMemoryStorage;
    use uuid::Uuid;

    #[derive(Debug, Serialize, Deserialize)]
    struct Meter {
        name: String,
        uuid: Uuid,
        reading: f64,
    }

    impl Component for Meter {
        fn name(&self) -> &str {
            &self.name
        }

        fn uuid(&self) -> Uuid {
            self.uuid
        }
    }

    impl ComponentType for Meter {
        const CAPABILITIES: &'static [Capability] = &[Capability::new("Device")];
    }

    mod other {
        use super::*;

        #[derive(Debug, Serialize, Deserialize)]
        pub struct Meter {
            pub name: String,
            pub uuid: Uuid,
        }

        impl Component for Meter {
            fn name(&self) -> &str {
                &self.name
            }

            fn uuid(&self) -> Uuid {
                self.uuid
            }
        }

        impl ComponentType for Meter {}
    }

    fn meter(name: &str, reading: f64) -> Meter {
        Meter {
            name: name.to_string(),
            uuid: Uuid::new_v4(),
            reading,
        }
    }

    fn registry() -> ComponentRegistry {
        ComponentRegistry::new(Arc::new(InMemoryStorage::new()), ValidationDescriptors::default())
    }

    #[test]
    fn test_projection_groups_by_type_name() {
        let mut registry = registry();
        registry.add(meter("m1", 1.0)).unwrap();
        registry.add(meter("m2", 2.0)).unwrap();

        let projection = registry.to_projection();
        assert_eq!(projection.len(), 1);
        assert_eq!(projection["Meter"].len(), 2);

        let json = registry.to_json().unwrap();
        assert_eq!(json["Meter"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["Meter"][0]["name"], "m1");
    }

    #[test]
    fn test_round_trip() {
        let mut registry = registry();
        registry.add(meter("m1", 1.5)).unwrap();
        let json = registry.to_json().unwrap();

        let mut types = ComponentTypes::new();
        types.register::<Meter>().unwrap();

        let loaded = ComponentRegistry::from_json(
            &json,
            &types,
            Arc::new(InMemoryStorage::new()),
            &SystemDataConfig::default(),
        )
        .unwrap();
        assert_eq!(loaded.count(), 1);
        assert_eq!(loaded.get_typed::<Meter>("m1").map(|m| m.reading), Some(1.5));
    }

    #[test]
    fn test_unknown_type() {
        let json = serde_json::json!({ "Transformer": [] });
        let mut registry = registry();
        let err = registry
            .load_json(&json, &ComponentTypes::new(), AddOptions::default())
            .unwrap_err();
        assert!(matches!(err, SystemDataError::NotFound(_)));
    }

    #[test]
    fn test_malformed_projection() {
        let mut types = ComponentTypes::new();
        types.register::<Meter>().unwrap();
        let mut registry = registry();

        let err = registry
            .load_json(&serde_json::json!([]), &types, AddOptions::default())
            .unwrap_err();
        assert!(matches!(err, SystemDataError::DataFormat(_)));

        let err = registry
            .load_json(&serde_json::json!({ "Meter": { "name": "m1" } }), &types, AddOptions::default())
            .unwrap_err();
        assert!(matches!(err, SystemDataError::DataFormat(_)));

        let err = registry
            .load_json(&serde_json::json!({ "Meter": [{ "name": "m1" }] }), &types, AddOptions::default())
            .unwrap_err();
        assert!(matches!(err, SystemDataError::Serialization(_)));
    }

    #[test]
    fn test_register_name_collision() {
        let mut types = ComponentTypes::new();
        types.register::<Meter>().unwrap();
        types.register::<Meter>().unwrap();
        assert_eq!(types.len(), 1);

        let err = types.register::<other::Meter>().unwrap_err();
        assert!(matches!(err, SystemDataError::DuplicateName { .. }));
        assert_eq!(types.key("Meter"), Some(TypeKey::of::<Meter>()));
        assert_eq!(format!("{:?}", types), r#"ComponentTypes { types: ["Meter"] }"#);
    }
}
