//! Common component fixtures for system-data tests.
//!
//! A small power-system vocabulary: two generator types sharing the
//! [`GENERATOR`] capability, a load, and a bus that carries no forecasts.

use serde::{Deserialize, Serialize};
use system_data::{Capability, Component, ComponentType, Forecasts};
use uuid::Uuid;

/// Capability shared by every generator type.
pub const GENERATOR: Capability = Capability::new("Generator");

/// Capability of every device injecting power at a bus.
pub const STATIC_INJECTION: Capability = Capability::new("StaticInjection");

/// Descriptor file covering the fixture types.
pub const DESCRIPTORS_YAML: &str = r#"
- struct_name: ThermalGenerator
  fields:
    - name: active_power
      valid_range: { min: 0.0, max: max_active_power }
    - name: ramp_limit
      valid_range: null
- struct_name: RenewableGenerator
  fields:
    - name: rating
      valid_range: { min: 0.0, max: 1000.0 }
- struct_name: Bus
  fields:
    - name: base_voltage
      valid_range: { min: 0.0 }
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalGenerator {
    pub name: String,
    pub uuid: Uuid,
    pub bus: String,
    pub active_power: f64,
    pub max_active_power: f64,
    pub ramp_limit: Option<f64>,
    #[serde(default)]
    pub forecasts: Forecasts,
}

impl ThermalGenerator {
    pub fn new(name: &str, active_power: f64, max_active_power: f64) -> Self {
        Self {
            name: name.to_string(),
            uuid: Uuid::new_v4(),
            bus: "bus1".to_string(),
            active_power,
            max_active_power,
            ramp_limit: None,
            forecasts: Forecasts::new(),
        }
    }
}

impl Component for ThermalGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn forecasts(&self) -> Option<&Forecasts> {
        Some(&self.forecasts)
    }

    fn forecasts_mut(&mut self) -> Option<&mut Forecasts> {
        Some(&mut self.forecasts)
    }

    fn field_value(&self, field: &str) -> Option<f64> {
        match field {
            "active_power" => Some(self.active_power),
            "max_active_power" => Some(self.max_active_power),
            "ramp_limit" => self.ramp_limit,
            _ => None,
        }
    }

    fn validate(&self) -> bool {
        !self.bus.is_empty() && self.ramp_limit.map_or(true, |r| r >= 0.0)
    }
}

impl ComponentType for ThermalGenerator {
    const CAPABILITIES: &'static [Capability] = &[GENERATOR, STATIC_INJECTION];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewableGenerator {
    pub name: String,
    pub uuid: Uuid,
    pub rating: f64,
    #[serde(default)]
    pub forecasts: Forecasts,
}

impl RenewableGenerator {
    pub fn new(name: &str, rating: f64) -> Self {
        Self {
            name: name.to_string(),
            uuid: Uuid::new_v4(),
            rating,
            forecasts: Forecasts::new(),
        }
    }
}

impl Component for RenewableGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn forecasts(&self) -> Option<&Forecasts> {
        Some(&self.forecasts)
    }

    fn forecasts_mut(&mut self) -> Option<&mut Forecasts> {
        Some(&mut self.forecasts)
    }

    fn field_value(&self, field: &str) -> Option<f64> {
        match field {
            "rating" => Some(self.rating),
            _ => None,
        }
    }
}

impl ComponentType for RenewableGenerator {
    const CAPABILITIES: &'static [Capability] = &[GENERATOR, STATIC_INJECTION];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerLoad {
    pub name: String,
    pub uuid: Uuid,
    pub max_active_power: f64,
    #[serde(default)]
    pub forecasts: Forecasts,
}

impl PowerLoad {
    pub fn new(name: &str, max_active_power: f64) -> Self {
        Self {
            name: name.to_string(),
            uuid: Uuid::new_v4(),
            max_active_power,
            forecasts: Forecasts::new(),
        }
    }
}

impl Component for PowerLoad {
    fn name(&self) -> &str {
        &self.name
    }

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn forecasts(&self) -> Option<&Forecasts> {
        Some(&self.forecasts)
    }

    fn forecasts_mut(&mut self) -> Option<&mut Forecasts> {
        Some(&mut self.forecasts)
    }

    fn field_value(&self, field: &str) -> Option<f64> {
        match field {
            "max_active_power" => Some(self.max_active_power),
            _ => None,
        }
    }
}

impl ComponentType for PowerLoad {
    const CAPABILITIES: &'static [Capability] = &[STATIC_INJECTION];
}

/// A bus; carries no forecasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    pub name: String,
    pub uuid: Uuid,
    pub base_voltage: f64,
}

impl Bus {
    pub fn new(name: &str, base_voltage: f64) -> Self {
        Self {
            name: name.to_string(),
            uuid: Uuid::new_v4(),
            base_voltage,
        }
    }
}

impl Component for Bus {
    fn name(&self) -> &str {
        &self.name
    }

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn field_value(&self, field: &str) -> Option<f64> {
        match field {
            "base_voltage" => Some(self.base_voltage),
            _ => None,
        }
    }

    fn validate(&self) -> bool {
        !self.name.is_empty()
    }
}

impl ComponentType for Bus {}
