use serde_json::{json, Value};
use worldengine_core::config::DatasetOverrides;
use worldengine_core::{
    DatasetKey, EngineError, EngineSettings, LookupError, MemoryVault, SyncOutcome, WorldEngine,
};

const DENSITY_PATH: &str = "Data/density.csv";
const SETTLEMENTS_PATH: &str = "Data/settlements.csv";
const UNITS_PATH: &str = "Data/units.csv";

fn village_band() -> Vec<Value> {
    vec![json!({
        "descriptor": "Village",
        "minPopulation": "20",
        "maxPopulation": "1000",
        "areaUnit": "mile^2"
    })]
}

fn settings() -> EngineSettings {
    EngineSettings {
        datasets: DatasetOverrides {
            units: Some(UNITS_PATH.to_string()),
            population_density: Some(DENSITY_PATH.to_string()),
            settlement_types: Some(SETTLEMENTS_PATH.to_string()),
            talent_ranks: None,
        },
        ..EngineSettings::default()
    }
}

fn engine(vault: MemoryVault) -> WorldEngine<MemoryVault> {
    let mut engine = WorldEngine::new(vault, settings()).unwrap();
    engine.initialize();
    engine
}

#[test]
fn density_lookup_needs_a_factor_for_other_units() {
    let mut vault = MemoryVault::new();
    vault.insert_dataset(DENSITY_PATH, village_band());
    vault.insert_dataset(
        UNITS_PATH,
        vec![json!({"name": "mile^2", "symbol": "mi²", "conversionFactors": []})],
    );
    let mut engine = engine(vault);

    assert_eq!(
        engine.density_descriptor(500.0, "mile^2").as_deref(),
        Some("Village")
    );
    assert_eq!(engine.density_descriptor(500.0, "km^2"), None);

    engine.host_mut().insert_dataset(
        UNITS_PATH,
        vec![json!({
            "name": "mile^2",
            "conversionFactors": [{"toUnit": "km^2", "factor": "2.5"}]
        })],
    );
    assert_eq!(
        engine.on_modify(UNITS_PATH).unwrap(),
        SyncOutcome::DatasetReloaded(DatasetKey::Units)
    );
    // 100 per km^2 is 250 per mile^2.
    assert_eq!(
        engine.density_descriptor(100.0, "km^2").as_deref(),
        Some("Village")
    );
}

#[test]
fn missing_override_falls_back_to_defaults() {
    let mut vault = MemoryVault::new();
    vault.insert_file(
        "Bree.md",
        json!({
            "noteType": "settlement",
            "demographics": {"settlementType": "Village", "populationScale": 0}
        }),
    );
    let mut engine = WorldEngine::new(vault, settings()).unwrap();
    let report = engine.initialize();

    assert_eq!(report.dataset_errors.len(), 3);
    assert!(!engine.data().is_overridden(DatasetKey::SettlementTypes));
    let bree = engine.by_path("Bree.md").unwrap().as_settlement().unwrap();
    assert_eq!(bree.population, Some(401.0));
}

#[test]
fn dataset_change_rederives_every_note() {
    let mut vault = MemoryVault::new();
    vault.insert_file(
        "Bree.md",
        json!({
            "noteType": "settlement",
            "demographics": {"settlementType": "Village", "populationScale": 0.5}
        }),
    );
    vault.insert_dataset(
        SETTLEMENTS_PATH,
        vec![json!({"type": "Village", "minPopulation": 100, "maxPopulation": 200})],
    );
    let mut engine = engine(vault);
    let population = |engine: &WorldEngine<MemoryVault>| {
        engine
            .by_path("Bree.md")
            .unwrap()
            .as_settlement()
            .unwrap()
            .population
    };
    assert_eq!(population(&engine), Some(150.0));

    engine.host_mut().insert_dataset(
        SETTLEMENTS_PATH,
        vec![json!({
            "type": "Village",
            "distributionType": "Gaussian",
            "minPopulation": "1000",
            "maxPopulation": "2000"
        })],
    );
    engine.on_modify(SETTLEMENTS_PATH).unwrap();
    assert_eq!(population(&engine), Some(1500.0));

    // A malformed override leaves the live rows untouched.
    engine.host_mut().insert_dataset(
        SETTLEMENTS_PATH,
        vec![json!({"type": "Village", "minPopulation": "lots"})],
    );
    let err = engine.on_modify(SETTLEMENTS_PATH).unwrap_err();
    assert!(matches!(err, EngineError::Parse(_)));
    assert_eq!(population(&engine), Some(1500.0));

    // Deleting the override restores bundled defaults.
    engine.host_mut().remove_dataset(SETTLEMENTS_PATH);
    assert_eq!(
        engine.on_delete(SETTLEMENTS_PATH).unwrap(),
        SyncOutcome::DatasetReloaded(DatasetKey::SettlementTypes)
    );
    assert_eq!(population(&engine), Some(650.5));
}

#[test]
fn converter_is_strict_and_directed() {
    let engine = engine(MemoryVault::new());
    let units = engine.converter();

    let km = units.convert(10.0, "mile^2", "km^2").unwrap();
    assert!((km - 25.89988).abs() < 1e-9);
    let back = units.convert(km, "km^2", "mile^2").unwrap();
    assert!((back - 10.0).abs() < 1e-3);

    assert_eq!(
        units.convert(1.0, "mile^2", "hectare").unwrap_err(),
        LookupError::ConversionNotFound {
            from: "mile^2".to_string(),
            to: "hectare".to_string()
        }
    );
    assert_eq!(
        units.symbol("league").unwrap_err(),
        LookupError::UnitNotFound("league".to_string())
    );
    assert_eq!(units.symbol("km^2").unwrap(), "km²");
}
