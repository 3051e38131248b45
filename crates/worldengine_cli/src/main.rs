//! Offline vault inspector.
//!
//! # Responsibility
//! - Load a vault snapshot (and optional settings) from JSON files.
//! - Run one full index-and-derive pass and print every note as JSON.
//!
//! Usage: `worldengine_cli <snapshot.json> [settings.json]`

use log::info;
use serde_json::json;
use std::process::ExitCode;
use worldengine_core::{init_from_settings, EngineSettings, MemoryVault, WorldEngine};

fn main() -> ExitCode {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("worldengine: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let snapshot_path = args
        .first()
        .ok_or_else(|| "usage: worldengine_cli <snapshot.json> [settings.json]".to_string())?;
    let snapshot = read_file(snapshot_path)?;
    let vault = MemoryVault::from_json_str(&snapshot)?;

    let settings = match args.get(1) {
        Some(path) => {
            EngineSettings::from_json_str(&read_file(path)?).map_err(|err| err.to_string())?
        }
        None => EngineSettings::default(),
    };
    init_from_settings(&settings.logging)?;

    let mut engine = WorldEngine::new(vault, settings).map_err(|err| err.to_string())?;
    let report = engine.initialize();
    info!(
        "event=cli_run module=cli status=ok indexed={} skipped={}",
        report.indexed, report.skipped
    );

    let notes = engine.notes().collect::<Vec<_>>();
    let output = json!({
        "worldDate": engine.current_date(),
        "indexed": report.indexed,
        "skipped": report.skipped,
        "datasetErrors": report
            .dataset_errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        "notes": notes,
    });
    let rendered = serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
    println!("{rendered}");
    Ok(())
}

fn read_file(path: &str) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|err| format!("cannot read `{path}`: {err}"))
}
