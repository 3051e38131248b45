//! World engine for worldbuilding vaults.
//! Indexes typed notes, validates their metadata and derives world facts
//! (population, settlement counts, density, ages) from reference datasets.

pub mod calendar;
pub mod config;
pub mod data;
pub mod derive;
pub mod engine;
pub mod error;
pub mod host;
pub mod logging;
pub mod model;
pub mod schema;
pub mod units;

pub use calendar::{DateSpan, WorldDate};
pub use config::{EngineSettings, SettingsError};
pub use data::{DatasetKey, ReferenceDataStore, ReloadOutcome};
pub use engine::{InitReport, NoteDirectory, SyncOutcome, UpdateSummary, WorldEngine};
pub use error::{DatasetParseError, EngineError, EngineResult, LookupError};
pub use host::{
    DatasetLoader, MapRegionIndex, MapSnapshot, MemoryVault, NoteDisplay, VaultHost, WorldHost,
    WriteMode,
};
pub use logging::{default_log_level, init_from_settings, init_logging, logging_status};
pub use model::{
    CharacterNote, NationNote, NoteId, NoteRef, NoteState, NoteType, OrganizationNote, ProseNote,
    SettlementNote, WbNote,
};
pub use schema::{Link, ValidationError, ValidationErrorKind};
pub use units::UnitConverter;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
