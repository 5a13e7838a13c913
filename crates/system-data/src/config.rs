//! Configuration for the component registry.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SystemDataError};
use crate::validation::ValidationDescriptors;

/// Registry configuration, fixed at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemDataConfig {
    /// YAML file with field range descriptors. `None` disables field validation.
    pub validation_descriptors_path: Option<PathBuf>,

    /// Skip both validators on every insertion.
    pub skip_validation: bool,
}

impl SystemDataConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("VALIDATION_DESCRIPTORS") {
            if !val.is_empty() {
                config.validation_descriptors_path = Some(PathBuf::from(val));
            }
        }

        if let Ok(val) = std::env::var("SKIP_VALIDATION") {
            config.skip_validation = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.validation_descriptors_path {
            if !path.is_file() {
                return Err(SystemDataError::config(format!(
                    "validation descriptors file {:?} does not exist",
                    path
                )));
            }
        }
        Ok(())
    }

    /// Load the configured descriptors, or an empty set if none are configured.
    pub fn load_descriptors(&self) -> Result<ValidationDescriptors> {
        match &self.validation_descriptors_path {
            Some(path) => ValidationDescriptors::from_yaml_file(path),
            None => Ok(ValidationDescriptors::default()),
        }
    }
}
