//! Field range validation of components on insertion.

use tracing::{debug, warn};

use super::descriptors::{RangeBound, ValidRange, ValidationDescriptors};
use crate::component::Component;

/// Pass/fail check of a component's field values.
pub trait FieldValidator {
    /// `type_name` is the normalized name of the component's concrete type.
    fn validate(&self, type_name: &str, component: &dyn Component) -> bool;
}

impl FieldValidator for ValidationDescriptors {
    fn validate(&self, type_name: &str, component: &dyn Component) -> bool {
        let Some(descriptor) = self.get(type_name) else {
            debug!(type_name = %type_name, "No validation descriptor for type");
            return true;
        };

        // Check every field so all violations are logged.
        let mut valid = true;
        for field in &descriptor.fields {
            let Some(range) = &field.valid_range else {
                continue;
            };
            if !check_field(type_name, component, &field.name, range) {
                valid = false;
            }
        }
        valid
    }
}

fn check_field(
    type_name: &str,
    component: &dyn Component,
    field: &str,
    range: &ValidRange,
) -> bool {
    let Some(value) = component.field_value(field) else {
        warn!(
            type_name = %type_name,
            component = %component.name(),
            field = %field,
            "Field with a valid range has no numeric value"
        );
        return false;
    };

    let min = match resolve_bound(component, range.min.as_ref()) {
        Ok(min) => min,
        Err(bound) => return unresolved(type_name, component, field, bound),
    };
    let max = match resolve_bound(component, range.max.as_ref()) {
        Ok(max) => max,
        Err(bound) => return unresolved(type_name, component, field, bound),
    };

    let in_range = min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max);
    if !in_range {
        warn!(
            type_name = %type_name,
            component = %component.name(),
            field = %field,
            value,
            min = ?min,
            max = ?max,
            "Field value outside valid range"
        );
    }
    in_range
}

/// Resolve a bound to a number; `Err` carries the unknown field name.
fn resolve_bound<'a>(
    component: &dyn Component,
    bound: Option<&'a RangeBound>,
) -> Result<Option<f64>, &'a str> {
    match bound {
        None => Ok(None),
        Some(RangeBound::Value(v)) => Ok(Some(*v)),
        Some(RangeBound::Field(name)) => component
            .field_value(name)
            .map(Some)
            .ok_or(name.as_str()),
    }
}

fn unresolved(type_name: &str, component: &dyn Component, field: &str, bound: &str) -> bool {
    warn!(
        type_name = %type_name,
        component = %component.name(),
        field = %field,
        bound = %bound,
        "Range bound refers to an unknown field"
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::descriptors::{FieldDescriptor, TypeDescriptor};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Serialize, Deserialize)]
    struct Unit {
        name: String,
        uuid: Uuid,
        output: f64,
        limit: f64,
    }

    impl Component for Unit {
        fn name(&self) -> &str {
            &self.name
        }

        fn uuid(&self) -> Uuid {
            self.uuid
        }

        fn field_value(&self, field: &str) -> Option<f64> {
            match field {
                "output" => Some(self.output),
                "limit" => Some(self.limit),
                _ => None,
            }
        }
    }

    fn unit(output: f64, limit: f64) -> Unit {
        Unit {
            name: "u1".to_string(),
            uuid: Uuid::new_v4(),
            output,
            limit,
        }
    }

    fn descriptors(field: &str, range: ValidRange) -> ValidationDescriptors {
        ValidationDescriptors::new(vec![TypeDescriptor {
            struct_name: "Unit".to_string(),
            fields: vec![FieldDescriptor {
                name: field.to_string(),
                valid_range: Some(range),
            }],
        }])
    }

    #[test]
    fn test_numeric_range() {
        let d = descriptors("output", ValidRange::new(0.0, 10.0));
        assert!(d.validate("Unit", &unit(5.0, 0.0)));
        assert!(d.validate("Unit", &unit(10.0, 0.0)));
        assert!(!d.validate("Unit", &unit(10.5, 0.0)));
        assert!(!d.validate("Unit", &unit(-1.0, 0.0)));
    }

    #[test]
    fn test_field_bound() {
        let d = descriptors(
            "output",
            ValidRange {
                min: None,
                max: Some(RangeBound::Field("limit".to_string())),
            },
        );
        assert!(d.validate("Unit", &unit(5.0, 8.0)));
        assert!(!d.validate("Unit", &unit(9.0, 8.0)));
    }

    #[test]
    fn test_unknown_fields_fail() {
        let d = descriptors("missing", ValidRange::new(0.0, 1.0));
        assert!(!d.validate("Unit", &unit(0.5, 1.0)));

        let d = descriptors(
            "output",
            ValidRange {
                min: Some(RangeBound::Field("nope".to_string())),
                max: None,
            },
        );
        assert!(!d.validate("Unit", &unit(0.5, 1.0)));
    }

    #[test]
    fn test_other_types_pass() {
        let d = descriptors("output", ValidRange::new(0.0, 1.0));
        assert!(d.validate("Bus", &unit(50.0, 0.0)));
    }
}
