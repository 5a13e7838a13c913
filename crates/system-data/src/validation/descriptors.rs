//! Field range descriptors, loaded once and handed to the registry.
//!
//! Descriptor files are YAML lists with one entry per component type:
//!
//! ```yaml
//! - struct_name: ThermalGenerator
//!   fields:
//!     - name: active_power
//!       valid_range: { min: 0.0, max: max_active_power }
//!     - name: ramp_limit
//!       valid_range: null
//! ```
//!
//! A bound is either a number or the name of another numeric field of the
//! same component. A missing bound leaves that side open.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SystemDataError};

/// One side of a valid range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeBound {
    Value(f64),
    Field(String),
}

/// Inclusive range a field value must fall in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidRange {
    #[serde(default)]
    pub min: Option<RangeBound>,
    #[serde(default)]
    pub max: Option<RangeBound>,
}

impl ValidRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(RangeBound::Value(min)),
            max: Some(RangeBound::Value(max)),
        }
    }
}

/// Range check for a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default)]
    pub valid_range: Option<ValidRange>,
}

/// Field range checks for one component type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Normalized type name, as returned by `ComponentType::type_name`.
    pub struct_name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

/// Ordered list of per-type descriptors. Empty disables field validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationDescriptors {
    types: Vec<TypeDescriptor>,
}

impl ValidationDescriptors {
    pub fn new(types: Vec<TypeDescriptor>) -> Self {
        Self { types }
    }

    /// Parse descriptors from YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let descriptors: Self = serde_yaml::from_str(contents)?;
        Ok(descriptors)
    }

    /// Load descriptors from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            SystemDataError::config(format!("Cannot read {:?}: {}", path, e))
        })?;
        let descriptors = serde_yaml::from_str::<Self>(&contents).map_err(|e| {
            SystemDataError::config(format!("Invalid YAML in {:?}: {}", path, e))
        })?;

        debug!(
            path = ?path,
            types = descriptors.len(),
            "Loaded validation descriptors"
        );
        Ok(descriptors)
    }

    /// Descriptor for a type; the first entry wins if a name repeats.
    pub fn get(&self, struct_name: &str) -> Option<&TypeDescriptor> {
        self.types.iter().find(|t| t.struct_name == struct_name)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
- struct_name: ThermalGenerator
  fields:
    - name: active_power
      valid_range: { min: 0, max: max_active_power }
    - name: ramp_limit
      valid_range: null
    - name: name
- struct_name: Bus
  fields:
    - name: base_voltage
      valid_range: { min: 0.0 }
"#;

    #[test]
    fn test_parse_yaml() {
        let descriptors = ValidationDescriptors::from_yaml_str(YAML).unwrap();
        assert_eq!(descriptors.len(), 2);

        let thermal = descriptors.get("ThermalGenerator").unwrap();
        assert_eq!(thermal.fields.len(), 3);
        assert_eq!(
            thermal.fields[0].valid_range,
            Some(ValidRange {
                min: Some(RangeBound::Value(0.0)),
                max: Some(RangeBound::Field("max_active_power".to_string())),
            })
        );
        assert_eq!(thermal.fields[1].valid_range, None);
        assert_eq!(thermal.fields[2].valid_range, None);

        let bus = descriptors.get("Bus").unwrap();
        assert_eq!(bus.fields[0].valid_range.as_ref().unwrap().max, None);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = ValidationDescriptors::from_yaml_str("- struct_name: [").unwrap_err();
        assert!(matches!(err, SystemDataError::Config(_)));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("descriptors.yaml");
        fs::write(&path, YAML).unwrap();

        let descriptors = ValidationDescriptors::from_yaml_file(&path).unwrap();
        assert!(descriptors.get("Bus").is_some());
        assert!(descriptors.get("Line").is_none());
    }

    #[test]
    fn test_missing_file() {
        let err = ValidationDescriptors::from_yaml_file("/nonexistent/descriptors.yaml").unwrap_err();
        assert!(matches!(err, SystemDataError::Config(_)));
    }
}
