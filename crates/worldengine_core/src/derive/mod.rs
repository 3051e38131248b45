//! Derivation of computed note fields from validated metadata.
//!
//! # Responsibility
//! - Pure formulas (population, tables, band lookups) live in submodules.
//! - `DerivationContext` bundles the read-only collaborators a variant needs
//!   while it recomputes its state.
//!
//! # Invariants
//! - Derivation never fails a whole note on a lookup miss; misses are
//!   collected in `DerivationReport` and the affected field keeps its value.

mod bands;
mod population;
mod tables;

use crate::calendar::WorldDate;
use crate::config::EngineSettings;
use crate::data::ReferenceDataStore;
use crate::engine::NoteDirectory;
use crate::error::LookupError;
use crate::host::MapRegionIndex;
use crate::units::UnitConverter;

pub use bands::{density_band, density_descriptor, talent_rank};
pub use population::{
    cultivated_land, interpolate_linear, nation_population, resolve_map_size,
    settlement_population,
};
pub use tables::{
    distribution_sum, distribution_warning, settlement_count, settlement_table, territory_table,
    SettlementTableRow, TerritoryRow,
};

/// Read-only inputs for one derivation pass.
pub struct DerivationContext<'a> {
    pub data: &'a ReferenceDataStore,
    pub converter: UnitConverter,
    pub maps: &'a dyn MapRegionIndex,
    pub settings: &'a EngineSettings,
    pub current_date: WorldDate,
    pub directory: &'a NoteDirectory,
}

impl<'a> DerivationContext<'a> {
    pub fn new(
        data: &'a ReferenceDataStore,
        maps: &'a dyn MapRegionIndex,
        settings: &'a EngineSettings,
        current_date: WorldDate,
        directory: &'a NoteDirectory,
    ) -> Self {
        Self {
            data,
            converter: data.converter(),
            maps,
            settings,
            current_date,
            directory,
        }
    }
}

/// Non-fatal findings of one derivation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivationReport {
    pub warnings: Vec<String>,
    pub lookup_errors: Vec<LookupError>,
}

impl DerivationReport {
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn lookup_failed(&mut self, err: LookupError) {
        self.lookup_errors.push(err);
    }
}
