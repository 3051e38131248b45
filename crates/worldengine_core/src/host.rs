//! Contracts for collaborators supplied by the host note application.
//!
//! # Responsibility
//! - Describe what the engine needs from the host: file enumeration,
//!   metadata read/write, dataset rows, map region areas, and a display hook.
//! - Provide `MemoryVault`, an in-memory host used by the CLI and tests.
//!
//! # Invariants
//! - `read_metadata` returns `None` for absent or unparseable metadata; it
//!   never reports an error any other way.

use crate::model::WbNote;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// How `write_metadata` applies a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Shallow-merge patch keys into existing metadata.
    Merge,
    /// Replace existing metadata wholesale.
    Replace,
}

/// File storage and metadata access.
pub trait VaultHost {
    /// All vault file paths, vault-relative with `/` separators.
    fn list_files(&self) -> Vec<String>;
    fn read_metadata(&self, path: &str) -> Option<Value>;
    fn write_metadata(&mut self, path: &str, patch: &Value, mode: WriteMode)
        -> Result<(), String>;
}

/// Source of user-overridden dataset rows.
pub trait DatasetLoader {
    /// Loads rows of `dataset_id` from `path`; each row is a JSON object.
    fn load_dataset(&self, dataset_id: &str, path: &str) -> Result<Vec<Value>, String>;
}

/// Region areas extracted from map images.
pub trait MapRegionIndex {
    /// Fraction of the map's area covered by `region_name`, in `[0, 1]`.
    fn region_area_fraction(&self, map_id: &str, region_name: &str) -> Option<f64>;
    fn total_area(&self, map_id: &str) -> Option<f64>;
}

/// Render hook for the note currently on screen.
pub trait NoteDisplay {
    fn display_note(&self, note: &WbNote);
}

/// Everything the engine consumes from one host.
pub trait WorldHost: VaultHost + DatasetLoader + MapRegionIndex {}

impl<T: VaultHost + DatasetLoader + MapRegionIndex> WorldHost for T {}

/// Map areas for one map image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSnapshot {
    pub total_area: f64,
    #[serde(default)]
    pub regions: BTreeMap<String, f64>,
}

/// In-memory host holding metadata, maps, and dataset files.
///
/// Deserializes from a snapshot document:
/// `{"files": {path: metadata}, "maps": {id: {...}}, "datasets": {path: [rows]}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryVault {
    #[serde(default)]
    files: BTreeMap<String, Value>,
    #[serde(default)]
    maps: BTreeMap<String, MapSnapshot>,
    #[serde(default)]
    datasets: BTreeMap<String, Vec<Value>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|err| format!("invalid vault snapshot: {err}"))
    }

    /// Adds or overwrites a file with the given metadata.
    pub fn insert_file(&mut self, path: impl Into<String>, metadata: Value) {
        self.files.insert(path.into(), metadata);
    }

    /// Adds a file whose metadata block is missing or unparseable.
    pub fn insert_plain_file(&mut self, path: impl Into<String>) {
        self.files.insert(path.into(), Value::Null);
    }

    pub fn remove_file(&mut self, path: &str) -> bool {
        self.files.remove(path).is_some()
    }

    pub fn rename_file(&mut self, old_path: &str, new_path: impl Into<String>) -> bool {
        match self.files.remove(old_path) {
            Some(metadata) => {
                self.files.insert(new_path.into(), metadata);
                true
            }
            None => false,
        }
    }

    pub fn insert_map(&mut self, map_id: impl Into<String>, map: MapSnapshot) {
        self.maps.insert(map_id.into(), map);
    }

    pub fn insert_dataset(&mut self, path: impl Into<String>, rows: Vec<Value>) {
        self.datasets.insert(path.into(), rows);
    }

    pub fn remove_dataset(&mut self, path: &str) -> bool {
        self.datasets.remove(path).is_some()
    }
}

impl VaultHost for MemoryVault {
    fn list_files(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn read_metadata(&self, path: &str) -> Option<Value> {
        self.files.get(path).filter(|value| value.is_object()).cloned()
    }

    fn write_metadata(
        &mut self,
        path: &str,
        patch: &Value,
        mode: WriteMode,
    ) -> Result<(), String> {
        let Value::Object(patch) = patch else {
            return Err(format!("metadata patch for `{path}` must be an object"));
        };
        let entry = self
            .files
            .entry(path.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        match (mode, entry) {
            (WriteMode::Merge, Value::Object(existing)) => {
                for (key, value) in patch {
                    existing.insert(key.clone(), value.clone());
                }
            }
            (_, entry) => *entry = Value::Object(patch.clone()),
        }
        Ok(())
    }
}

impl DatasetLoader for MemoryVault {
    fn load_dataset(&self, dataset_id: &str, path: &str) -> Result<Vec<Value>, String> {
        self.datasets
            .get(path)
            .cloned()
            .ok_or_else(|| format!("dataset `{dataset_id}` has no file at `{path}`"))
    }
}

impl MapRegionIndex for MemoryVault {
    fn region_area_fraction(&self, map_id: &str, region_name: &str) -> Option<f64> {
        self.maps.get(map_id)?.regions.get(region_name).copied()
    }

    fn total_area(&self, map_id: &str) -> Option<f64> {
        self.maps.get(map_id).map(|map| map.total_area)
    }
}
