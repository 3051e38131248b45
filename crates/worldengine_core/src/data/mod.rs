//! Reference datasets consulted by derivation.
//!
//! # Responsibility
//! - Define dataset row types (units, density bands, settlement types,
//!   talent ranks).
//! - Serve live rows and hot-reload them from user overrides.
//!
//! # Invariants
//! - Bundled defaults are embedded at build time and always decode.

pub mod rows;
mod store;

pub use rows::{
    ConversionFactor, DistributionType, PopulationDensityBand, SettlementArchetype, TalentRank,
    UnitDefinition,
};
pub use store::{DatasetKey, ReferenceDataStore, ReferenceDataset, ReloadOutcome};
