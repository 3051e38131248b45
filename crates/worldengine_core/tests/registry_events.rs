use serde_json::{json, Value};
use worldengine_core::config::DatasetOverrides;
use worldengine_core::{
    DatasetKey, EngineError, EngineSettings, MemoryVault, NoteRef, NoteType, SyncOutcome,
    WorldEngine,
};

const UNITS_PATH: &str = "Data/units.csv";
const SETTLEMENTS_PATH: &str = "Data/settlements.csv";

fn with_overrides() -> EngineSettings {
    EngineSettings {
        datasets: DatasetOverrides {
            units: Some(UNITS_PATH.to_string()),
            settlement_types: Some(SETTLEMENTS_PATH.to_string()),
            ..DatasetOverrides::default()
        },
        ..EngineSettings::default()
    }
}

fn settlement(scale: f64) -> Value {
    json!({
        "noteType": "settlement",
        "demographics": {"settlementType": "Village", "populationScale": scale}
    })
}

fn nation(size: f64) -> Value {
    json!({
        "noteType": "nation",
        "geography": {"size": size, "landFertility": 10, "cultivatedLandPercentage": 50}
    })
}

fn engine(files: &[(&str, Value)]) -> WorldEngine<MemoryVault> {
    let mut vault = MemoryVault::new();
    for (path, metadata) in files {
        vault.insert_file(*path, metadata.clone());
    }
    let mut engine = WorldEngine::new(vault, EngineSettings::default()).unwrap();
    engine.initialize();
    engine
}

#[test]
fn rename_rekeys_without_changing_identity() {
    let mut engine = engine(&[("Towns/Bree.md", settlement(0.5))]);
    let original = engine.by_path("Towns/Bree.md").unwrap().id();

    engine.host_mut().rename_file("Towns/Bree.md", "Towns/Old Bree.md");
    let outcome = engine
        .on_rename("Towns/Bree.md", "Towns/Old Bree.md")
        .unwrap();

    assert_eq!(outcome, SyncOutcome::Renamed(original));
    assert!(engine.by_path("Towns/Bree.md").is_none());
    let moved = engine.by_path("Towns/Old Bree.md").unwrap();
    assert_eq!(moved.id(), original);
    assert_eq!(moved.name(), "Old Bree");
    assert_eq!(moved.as_settlement().unwrap().population, Some(650.5));
    assert_eq!(engine.len(), 1);
}

#[test]
fn type_change_replaces_note_and_discards_settlement_state() {
    let mut engine = engine(&[("Bree.md", settlement(1.0))]);
    let before = engine.by_path("Bree.md").unwrap();
    let settlement_id = before.id();
    assert_eq!(before.as_settlement().unwrap().population, Some(900.0));

    engine.host_mut().insert_file("Bree.md", nation(40.0));
    let outcome = engine.on_modify("Bree.md").unwrap();

    let after = engine.by_path("Bree.md").unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Replaced {
            previous: settlement_id,
            current: after.id()
        }
    );
    assert_ne!(after.id(), settlement_id);
    assert_eq!(after.note_type(), NoteType::Nation);
    assert!(after.as_settlement().is_none());
    // 40 * 0.5 * 10
    assert_eq!(after.as_nation().unwrap().population, Some(200.0));
    assert_eq!(engine.len(), 1);
}

#[test]
fn each_path_maps_to_at_most_one_note_across_events() {
    let mut engine = engine(&[("a.md", settlement(0.1)), ("b.md", settlement(0.2))]);

    engine.host_mut().insert_file("c.md", nation(10.0));
    engine.on_create("c.md").unwrap();
    engine.on_create("c.md").unwrap();

    engine.host_mut().rename_file("a.md", "b.md");
    engine.on_rename("a.md", "b.md").unwrap();

    engine.host_mut().remove_file("c.md");
    assert!(matches!(engine.on_delete("c.md").unwrap(), SyncOutcome::Removed(_)));
    assert_eq!(engine.on_delete("c.md").unwrap(), SyncOutcome::Ignored);

    let paths = engine
        .notes()
        .map(|note| note.file_path().to_string())
        .collect::<Vec<_>>();
    assert_eq!(paths, vec!["b.md".to_string()]);
    let survivor = engine.by_path("b.md").unwrap();
    assert_eq!(survivor.as_settlement().unwrap().population_scale, 0.1);
}

#[test]
fn by_name_returns_first_match_in_path_order() {
    let engine = engine(&[
        ("West/Bree.md", settlement(0.9)),
        ("East/Bree.md", settlement(0.1)),
    ]);
    assert_eq!(engine.by_name("Bree").unwrap().file_path(), "East/Bree.md");
    assert_eq!(engine.by_type(NoteType::Settlement).count(), 2);
    assert_eq!(engine.by_type(NoteType::Nation).count(), 0);
}

#[test]
fn weak_references_fail_gracefully_after_delete() {
    let mut engine = engine(&[
        (
            "People/Ana.md",
            json!({"noteType": "character", "dates": {"born": "1180-1-1"}}),
        ),
        (
            "Stories/Flight.md",
            json!({"noteType": "prose", "characters": ["[[Ana]]", "[[Bree]]"]}),
        ),
        ("Bree.md", settlement(0.5)),
    ]);

    let prose = engine.by_path("Stories/Flight.md").unwrap().as_prose().unwrap();
    let ana: NoteRef = prose.characters[0].note.clone().expect("Ana resolves");
    assert_eq!(ana.note_type, NoteType::Character);
    // Bree exists but is not a character.
    assert!(prose.characters[1].note.is_none());
    assert_eq!(engine.by_path("Stories/Flight.md").unwrap().warnings().len(), 1);

    assert!(engine.resolve(&ana).is_some());
    engine.host_mut().remove_file("People/Ana.md");
    engine.on_delete("People/Ana.md").unwrap();
    assert!(engine.resolve(&ana).is_none());
}

#[test]
fn cross_references_resolve_regardless_of_enumeration_order() {
    // "A..." sorts before "Z...", so the character is indexed after the prose.
    let engine = engine(&[
        (
            "A-story.md",
            json!({"noteType": "prose", "characters": ["[[Zed]]"]}),
        ),
        ("Zed.md", json!({"noteType": "character"})),
    ]);
    let prose = engine.by_path("A-story.md").unwrap().as_prose().unwrap();
    assert!(prose.characters[0].is_resolved());
}

#[test]
fn character_age_uses_current_date_while_alive() {
    let mut vault = MemoryVault::new();
    vault.insert_file(
        "Ana.md",
        json!({"noteType": "character", "dates": {"born": "1180-3-10"}, "talent": 42}),
    );
    vault.insert_file(
        "Old Tom.md",
        json!({"noteType": "character", "dates": {"born": "-20-1-1", "died": "40-7-16"}}),
    );
    let settings = EngineSettings {
        current_date: "1200-4-12".to_string(),
        ..EngineSettings::default()
    };
    let mut engine = WorldEngine::new(vault, settings).unwrap();
    engine.initialize();

    let ana = engine.by_path("Ana.md").unwrap().as_character().unwrap();
    let age = ana.age.unwrap();
    assert_eq!((age.years, age.months, age.days), (20, 1, 2));
    assert_eq!(ana.talent_rank.as_deref(), Some("Adept"));

    let tom = engine.by_path("Old Tom.md").unwrap().as_character().unwrap();
    let age = tom.age.unwrap();
    assert_eq!((age.years, age.months, age.days), (60, 6, 15));
}

#[test]
fn invalid_note_does_not_block_others() {
    let mut vault = MemoryVault::new();
    vault.insert_file("Good.md", settlement(0.5));
    vault.insert_file(
        "Bad.md",
        json!({"noteType": "settlement", "demographics": {"settlementType": "Village"}}),
    );
    let mut engine = WorldEngine::new(vault, EngineSettings::default()).unwrap();
    let report = engine.initialize();

    assert_eq!(report.indexed, 2);
    assert_eq!(report.summary.updated, 1);
    assert_eq!(report.summary.invalid.len(), 1);
    assert_eq!(report.summary.invalid[0].0, "Bad.md");
    assert_eq!(
        report.summary.invalid[0].1.field,
        "demographics.populationScale"
    );
    assert!(engine.by_path("Good.md").unwrap().is_valid());
}

#[test]
fn unknown_settlement_type_is_a_lookup_miss_not_a_validation_error() {
    let mut engine = engine(&[("Bree.md", settlement(0.5))]);
    engine.host_mut().insert_file(
        "Bree.md",
        json!({
            "noteType": "settlement",
            "demographics": {"settlementType": "Castle", "populationScale": 0.5}
        }),
    );
    engine.on_modify("Bree.md").unwrap();
    let note = engine.by_path("Bree.md").unwrap();
    assert!(note.is_valid());
    assert_eq!(note.lookup_errors().len(), 1);
    assert_eq!(note.as_settlement().unwrap().population, Some(650.5));
}

#[test]
fn invalid_settings_are_rejected_up_front() {
    let settings = EngineSettings {
        current_date: "yesterday".to_string(),
        ..EngineSettings::default()
    };
    let err = WorldEngine::new(MemoryVault::new(), settings).err().unwrap();
    assert!(matches!(err, EngineError::Settings(_)));
}

#[test]
fn note_moved_onto_dataset_path_stops_being_tracked() {
    let mut vault = MemoryVault::new();
    vault.insert_file("Bree.md", settlement(0.5));
    vault.insert_file("Ford.md", settlement(0.5));
    let mut engine = WorldEngine::new(vault, with_overrides()).unwrap();
    engine.initialize();
    assert_eq!(engine.len(), 2);

    // The host has nothing loadable at the backing path.
    engine.host_mut().rename_file("Bree.md", UNITS_PATH);
    let err = engine.on_rename("Bree.md", UNITS_PATH).unwrap_err();
    assert!(matches!(err, EngineError::Parse(_)));
    assert!(engine.by_path("Bree.md").is_none());
    assert!(engine.by_path(UNITS_PATH).is_none());
    assert!(!engine.data().is_overridden(DatasetKey::Units));

    // Now the host serves unit rows there.
    engine.host_mut().rename_file("Ford.md", UNITS_PATH);
    engine.host_mut().insert_dataset(
        UNITS_PATH,
        vec![json!({"name": "league", "conversionFactors": []})],
    );
    assert_eq!(
        engine.on_rename("Ford.md", UNITS_PATH).unwrap(),
        SyncOutcome::DatasetReloaded(DatasetKey::Units)
    );
    assert!(engine.is_empty());
    assert!(engine.data().is_overridden(DatasetKey::Units));
}

#[test]
fn moving_a_dataset_file_away_restores_defaults() {
    let mut vault = MemoryVault::new();
    vault.insert_file("Bree.md", settlement(0.5));
    vault.insert_dataset(
        SETTLEMENTS_PATH,
        vec![json!({"type": "Village", "minPopulation": 100, "maxPopulation": 200})],
    );
    let mut engine = WorldEngine::new(vault, with_overrides()).unwrap();
    engine.initialize();
    let population = |engine: &WorldEngine<MemoryVault>| {
        engine.by_path("Bree.md").unwrap().as_settlement().unwrap().population
    };
    assert_eq!(population(&engine), Some(150.0));

    engine.host_mut().remove_dataset(SETTLEMENTS_PATH);
    assert_eq!(
        engine
            .on_rename(SETTLEMENTS_PATH, "Archive/settlements.csv")
            .unwrap(),
        SyncOutcome::DatasetReloaded(DatasetKey::SettlementTypes)
    );
    assert!(!engine.data().is_overridden(DatasetKey::SettlementTypes));
    assert_eq!(population(&engine), Some(650.5));
}

#[test]
fn out_of_range_year_is_a_validation_error_not_a_crash() {
    let mut vault = MemoryVault::new();
    vault.insert_file(
        "Ancient.md",
        json!({"noteType": "character", "dates": {"born": "99999999999999999-1-1"}}),
    );
    vault.insert_file("Bree.md", settlement(0.5));
    let mut engine = WorldEngine::new(vault, EngineSettings::default()).unwrap();
    let report = engine.initialize();

    assert_eq!(report.summary.updated, 1);
    assert_eq!(report.summary.invalid.len(), 1);
    assert_eq!(report.summary.invalid[0].1.field, "dates.born");
    assert!(engine.by_path("Bree.md").unwrap().is_valid());
}
