//! Note registry and host event handling.

mod directory;
mod registry;

use crate::data::DatasetKey;
use crate::error::{DatasetParseError, EngineError};
use crate::model::NoteId;
use crate::schema::ValidationError;

pub use directory::NoteDirectory;
pub use registry::WorldEngine;

/// What a host event did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A new note was indexed and derived.
    Indexed(NoteId),
    /// An existing note was re-validated and re-derived in place.
    Updated(NoteId),
    /// The discriminant changed; the old note was dropped for a new one.
    Replaced { previous: NoteId, current: NoteId },
    Renamed(NoteId),
    /// The note was deleted, moved out of scope, or lost its discriminant.
    Removed(NoteId),
    /// A reference dataset was reloaded and every note re-derived.
    DatasetReloaded(DatasetKey),
    /// The event concerns nothing the engine tracks.
    Ignored,
}

/// Per-note results of a bulk re-derivation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSummary {
    pub updated: usize,
    pub invalid: Vec<(String, ValidationError)>,
    pub failed: Vec<(String, EngineError)>,
}

/// Result of `WorldEngine::initialize`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitReport {
    pub indexed: usize,
    /// Files that are excluded, dataset overrides, or not world notes.
    pub skipped: usize,
    pub summary: UpdateSummary,
    /// Override datasets that failed to load and fell back.
    pub dataset_errors: Vec<DatasetParseError>,
}
