//! Projection and reload tests.

use std::sync::Arc;

use system_data::{
    ComponentRegistry, ComponentSelector, ComponentTypes, Forecasts, SystemDataConfig,
    SystemDataError, TimeSeriesStorage,
};
use test_utils::{
    hour, hourly_ramp, test_registry, Bus, PowerLoad, RenewableGenerator, ThermalGenerator,
};

fn catalog() -> ComponentTypes {
    let mut types = ComponentTypes::new();
    types
        .register::<ThermalGenerator>()
        .and_then(|t| t.register::<RenewableGenerator>())
        .and_then(|t| t.register::<PowerLoad>())
        .and_then(|t| t.register::<Bus>())
        .unwrap();
    types
}

// ============================================================================
// Projection tests
// ============================================================================

#[test]
fn test_projection_membership() {
    let (mut registry, _) = test_registry();
    registry.add(ThermalGenerator::new("gen1", 1.0, 5.0)).unwrap();
    registry.add(ThermalGenerator::new("gen2", 1.0, 5.0)).unwrap();
    registry.add(Bus::new("bus1", 230.0)).unwrap();

    let projection = registry.to_projection();
    let keys: Vec<&str> = projection.keys().copied().collect();
    assert_eq!(keys, vec!["Bus", "ThermalGenerator"]);
    assert_eq!(projection["ThermalGenerator"].len(), 2);
    assert_eq!(projection["Bus"][0].name(), "bus1");
}

#[test]
fn test_json_contains_forecast_records() {
    let (mut registry, _) = test_registry();
    registry.add(PowerLoad::new("load1", 5.0)).unwrap();
    registry
        .add_forecast::<PowerLoad>("load1", hourly_ramp("max_active_power", hour(0), 24))
        .unwrap();

    let json = registry.to_json().unwrap();
    let records = &json["PowerLoad"][0]["forecasts"];
    assert_eq!(records.as_array().map(Vec::len), Some(1));
    assert_eq!(records[0]["kind"], "Deterministic");
    assert_eq!(records[0]["window"]["horizon"], 24);
}

// ============================================================================
// Round-trip tests
// ============================================================================

#[test]
fn test_round_trip_preserves_membership_and_count() {
    let (mut registry, storage) = test_registry();
    registry.add(ThermalGenerator::new("gen1", 1.0, 5.0)).unwrap();
    registry.add(RenewableGenerator::new("wind", 20.0)).unwrap();
    registry.add(PowerLoad::new("load1", 5.0)).unwrap();
    registry.add(PowerLoad::new("load2", 5.0)).unwrap();
    registry.add(Bus::new("bus1", 230.0)).unwrap();
    registry
        .add_forecast::<PowerLoad>("load1", hourly_ramp("max_active_power", hour(0), 24))
        .unwrap();

    let json = registry.to_json().unwrap();
    let loaded = ComponentRegistry::from_json(
        &json,
        &catalog(),
        storage.clone(),
        &SystemDataConfig::default(),
    )
    .unwrap();

    assert_eq!(loaded.count(), registry.count());
    assert_eq!(loaded.type_count(), registry.type_count());
    for key in registry.types() {
        let selector = ComponentSelector::Concrete(key);
        let before: Vec<&str> = registry.iter(&selector).iter().map(|c| c.name()).collect();
        let after: Vec<&str> = loaded.iter(&selector).iter().map(|c| c.name()).collect();
        assert_eq!(before, after, "membership of {}", key);
    }

    // Records reload against the shared backend.
    let forecast = loaded
        .get_forecast::<PowerLoad>("load1", "max_active_power", hour(2), 3)
        .unwrap();
    assert_eq!(forecast.values(), &[2.0, 3.0, 4.0]);
    assert_eq!(storage.num_arrays(), 1);
}

#[test]
fn test_reload_rejects_unknown_type() {
    let json = serde_json::json!({ "Transformer": [{ "name": "t1" }] });
    let (_, storage) = test_registry();
    let err = ComponentRegistry::from_json(&json, &catalog(), storage, &SystemDataConfig::default())
        .unwrap_err();
    assert!(matches!(err, SystemDataError::NotFound(_)));
}

#[test]
fn test_reload_rejects_duplicate_names() {
    let (mut registry, storage) = test_registry();
    registry.add(Bus::new("bus1", 230.0)).unwrap();
    let mut json = registry.to_json().unwrap();
    let entry = json["Bus"][0].clone();
    if let Some(buses) = json["Bus"].as_array_mut() {
        buses.push(entry);
    }

    let err = ComponentRegistry::from_json(&json, &catalog(), storage, &SystemDataConfig::default())
        .unwrap_err();
    assert!(matches!(err, SystemDataError::DuplicateName { .. }));
}

#[test]
fn test_forecasts_container_serde() {
    let (mut registry, storage) = test_registry();
    registry.add(PowerLoad::new("load1", 5.0)).unwrap();
    for start in [0, 24] {
        registry
            .add_forecast::<PowerLoad>("load1", hourly_ramp("max_active_power", hour(start), 24))
            .unwrap();
    }

    let load = registry.get_typed::<PowerLoad>("load1").unwrap();
    let json = serde_json::to_value(&load.forecasts).unwrap();
    let mut back: Forecasts = serde_json::from_value(json).unwrap();
    assert_eq!(back, load.forecasts);
    assert!(!back.is_attached());

    back.attach_storage(storage.clone() as Arc<dyn TimeSeriesStorage>);
    let forecast = back.get_forecast("max_active_power", hour(24)).unwrap();
    assert_eq!(forecast.horizon(), 24);
}
