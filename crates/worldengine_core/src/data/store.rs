//! Live/default reference datasets with whole-dataset hot reload.
//!
//! # Responsibility
//! - Keep one bundled default copy and one live copy per dataset.
//! - Reload live rows from a user override, all-or-nothing.
//!
//! # Invariants
//! - Live rows are replaced by a single `Arc` swap, never mutated in place.
//!   Readers holding an older `Arc` keep a consistent snapshot.
//! - A failed reload leaves the previous live rows untouched.
//! - Getters never fail; a dataset without overrides serves its defaults.

use crate::config::DatasetOverrides;
use crate::data::rows::{
    PopulationDensityBand, SettlementArchetype, TalentRank, UnitDefinition,
};
use crate::error::DatasetParseError;
use crate::host::DatasetLoader;
use crate::units::UnitConverter;
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

const DEFAULT_UNITS: &str = include_str!("defaults/units.json");
const DEFAULT_POPULATION_DENSITY: &str = include_str!("defaults/population_density.json");
const DEFAULT_SETTLEMENT_TYPES: &str = include_str!("defaults/settlement_types.json");
const DEFAULT_TALENT_RANKS: &str = include_str!("defaults/talent_ranks.json");

/// Identifies one reference dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DatasetKey {
    Units,
    PopulationDensity,
    SettlementTypes,
    TalentRanks,
}

impl DatasetKey {
    pub const ALL: [DatasetKey; 4] = [
        DatasetKey::Units,
        DatasetKey::PopulationDensity,
        DatasetKey::SettlementTypes,
        DatasetKey::TalentRanks,
    ];

    /// Stable id passed to the dataset loader.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Units => "units",
            Self::PopulationDensity => "population_density",
            Self::SettlementTypes => "settlement_types",
            Self::TalentRanks => "talent_ranks",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == value.trim())
    }
}

/// Where the live rows of a dataset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// No override configured; live rows reset to defaults.
    Defaults,
    /// Override parsed; live rows replaced with `rows` entries.
    Overridden { rows: usize },
}

/// One dataset with bundled defaults and effective live rows.
#[derive(Debug, Clone)]
pub struct ReferenceDataset<T> {
    name: &'static str,
    default_rows: Arc<[T]>,
    live_rows: Arc<[T]>,
}

impl<T: DeserializeOwned> ReferenceDataset<T> {
    pub fn new(name: &'static str, default_rows: Vec<T>) -> Self {
        let default_rows: Arc<[T]> = default_rows.into();
        Self {
            name,
            live_rows: Arc::clone(&default_rows),
            default_rows,
        }
    }

    /// Decodes a JSON array document into a dataset.
    pub fn from_json(name: &'static str, raw: &str) -> Result<Self, DatasetParseError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|err| DatasetParseError::new(name, err.to_string()))?;
        let Value::Array(rows) = value else {
            return Err(DatasetParseError::new(name, "expected an array of rows"));
        };
        Ok(Self::new(name, parse_rows(name, rows)?))
    }

    pub fn live_rows(&self) -> Arc<[T]> {
        Arc::clone(&self.live_rows)
    }

    /// Returns whether live rows currently differ from the defaults.
    pub fn is_overridden(&self) -> bool {
        !Arc::ptr_eq(&self.default_rows, &self.live_rows)
    }

    /// Decodes `raw` rows and swaps them in; on error nothing changes.
    pub fn replace_from(&mut self, raw: Vec<Value>) -> Result<usize, DatasetParseError> {
        let rows = parse_rows(self.name, raw)?;
        let count = rows.len();
        self.live_rows = rows.into();
        Ok(count)
    }

    pub fn reset(&mut self) {
        self.live_rows = Arc::clone(&self.default_rows);
    }
}

fn parse_rows<T: DeserializeOwned>(
    name: &str,
    raw: Vec<Value>,
) -> Result<Vec<T>, DatasetParseError> {
    raw.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            serde_json::from_value(row)
                .map_err(|err| DatasetParseError::at_row(name, idx, err.to_string()))
        })
        .collect()
}

/// All reference datasets the derivation pipeline consults.
#[derive(Debug, Clone)]
pub struct ReferenceDataStore {
    units: ReferenceDataset<UnitDefinition>,
    density: ReferenceDataset<PopulationDensityBand>,
    settlement_types: ReferenceDataset<SettlementArchetype>,
    talent_ranks: ReferenceDataset<TalentRank>,
    backing_paths: BTreeMap<DatasetKey, String>,
}

impl ReferenceDataStore {
    /// Builds the store from bundled defaults with no overrides.
    pub fn with_defaults() -> Result<Self, DatasetParseError> {
        Ok(Self {
            units: ReferenceDataset::from_json(DatasetKey::Units.as_str(), DEFAULT_UNITS)?,
            density: ReferenceDataset::from_json(
                DatasetKey::PopulationDensity.as_str(),
                DEFAULT_POPULATION_DENSITY,
            )?,
            settlement_types: ReferenceDataset::from_json(
                DatasetKey::SettlementTypes.as_str(),
                DEFAULT_SETTLEMENT_TYPES,
            )?,
            talent_ranks: ReferenceDataset::from_json(
                DatasetKey::TalentRanks.as_str(),
                DEFAULT_TALENT_RANKS,
            )?,
            backing_paths: BTreeMap::new(),
        })
    }

    /// Builds the store and registers override paths from settings.
    pub fn with_overrides(overrides: &DatasetOverrides) -> Result<Self, DatasetParseError> {
        let mut store = Self::with_defaults()?;
        for key in DatasetKey::ALL {
            if let Some(path) = overrides.path_for(key) {
                store.set_backing_path(key, path);
            }
        }
        Ok(store)
    }

    pub fn set_backing_path(&mut self, key: DatasetKey, path: impl Into<String>) {
        self.backing_paths.insert(key, path.into());
    }

    pub fn backing_path(&self, key: DatasetKey) -> Option<&str> {
        self.backing_paths.get(&key).map(String::as_str)
    }

    /// Finds the dataset whose override lives at `path`.
    pub fn key_for_path(&self, path: &str) -> Option<DatasetKey> {
        self.backing_paths
            .iter()
            .find(|(_, backing)| backing.as_str() == path)
            .map(|(key, _)| *key)
    }

    /// Re-reads one dataset's override.
    ///
    /// # Errors
    /// - Returns `DatasetParseError` when the loader fails or a row does not
    ///   decode. Live rows are left as they were.
    pub fn reload(
        &mut self,
        key: DatasetKey,
        loader: &dyn DatasetLoader,
    ) -> Result<ReloadOutcome, DatasetParseError> {
        let Some(path) = self.backing_paths.get(&key).cloned() else {
            self.reset(key);
            info!(
                "event=dataset_reload module=data status=ok dataset={} source=defaults",
                key.as_str()
            );
            return Ok(ReloadOutcome::Defaults);
        };

        let result = loader
            .load_dataset(key.as_str(), &path)
            .map_err(|message| DatasetParseError::new(key.as_str(), message))
            .and_then(|raw| match key {
                DatasetKey::Units => self.units.replace_from(raw),
                DatasetKey::PopulationDensity => self.density.replace_from(raw),
                DatasetKey::SettlementTypes => self.settlement_types.replace_from(raw),
                DatasetKey::TalentRanks => self.talent_ranks.replace_from(raw),
            });

        match result {
            Ok(rows) => {
                info!(
                    "event=dataset_reload module=data status=ok dataset={} source=override path={} rows={}",
                    key.as_str(),
                    path,
                    rows
                );
                Ok(ReloadOutcome::Overridden { rows })
            }
            Err(err) => {
                error!(
                    "event=dataset_reload module=data status=error dataset={} path={} error={}",
                    key.as_str(),
                    path,
                    err
                );
                Err(err)
            }
        }
    }

    /// Reloads every dataset; failures fall back to what was live before.
    pub fn reload_all(&mut self, loader: &dyn DatasetLoader) -> Vec<DatasetParseError> {
        let mut failures = Vec::new();
        for key in DatasetKey::ALL {
            if let Err(err) = self.reload(key, loader) {
                warn!(
                    "event=dataset_fallback module=data dataset={} overridden={}",
                    key.as_str(),
                    self.is_overridden(key)
                );
                failures.push(err);
            }
        }
        failures
    }

    pub fn reset(&mut self, key: DatasetKey) {
        match key {
            DatasetKey::Units => self.units.reset(),
            DatasetKey::PopulationDensity => self.density.reset(),
            DatasetKey::SettlementTypes => self.settlement_types.reset(),
            DatasetKey::TalentRanks => self.talent_ranks.reset(),
        }
    }

    pub fn is_overridden(&self, key: DatasetKey) -> bool {
        match key {
            DatasetKey::Units => self.units.is_overridden(),
            DatasetKey::PopulationDensity => self.density.is_overridden(),
            DatasetKey::SettlementTypes => self.settlement_types.is_overridden(),
            DatasetKey::TalentRanks => self.talent_ranks.is_overridden(),
        }
    }

    pub fn units(&self) -> Arc<[UnitDefinition]> {
        self.units.live_rows()
    }

    pub fn density_bands(&self) -> Arc<[PopulationDensityBand]> {
        self.density.live_rows()
    }

    pub fn settlement_types(&self) -> Arc<[SettlementArchetype]> {
        self.settlement_types.live_rows()
    }

    pub fn talent_ranks(&self) -> Arc<[TalentRank]> {
        self.talent_ranks.live_rows()
    }

    /// Conversion service over the current live unit rows.
    pub fn converter(&self) -> UnitConverter {
        UnitConverter::new(self.units())
    }

    /// Finds a settlement archetype by type name, ignoring case.
    pub fn archetype(&self, settlement_type: &str) -> Option<SettlementArchetype> {
        let wanted = settlement_type.trim();
        self.settlement_types
            .live_rows()
            .iter()
            .find(|row| row.settlement_type.eq_ignore_ascii_case(wanted))
            .cloned()
    }
}
