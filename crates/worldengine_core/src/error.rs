//! Error taxonomy shared by the world engine layers.
//!
//! # Responsibility
//! - Classify recoverable failures: validation, lookup, dataset parse, and
//!   registry consistency.
//! - Keep failures as values; nothing in the steady-state path panics.
//!
//! # Invariants
//! - A failure on one note never aborts processing of other notes.
//! - `LookupError` means "derivation step skipped, previous value retained".

use crate::config::SettingsError;
use crate::schema::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

/// A reference lookup (unit, archetype, map, region) that found nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    UnitNotFound(String),
    ConversionNotFound { from: String, to: String },
    ArchetypeNotFound(String),
    MapNotFound(String),
    /// A `"MAP"` size was used with neither `geography.map` nor a default map.
    MapNotConfigured,
    RegionNotFound { map: String, region: String },
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnitNotFound(unit) => write!(f, "unit not found: {unit}"),
            Self::ConversionNotFound { from, to } => {
                write!(f, "no conversion factor from `{from}` to `{to}`")
            }
            Self::ArchetypeNotFound(kind) => write!(f, "settlement type not found: {kind}"),
            Self::MapNotFound(map) => write!(f, "map not found: {map}"),
            Self::MapNotConfigured => write!(f, "size is MAP but no map is configured"),
            Self::RegionNotFound { map, region } => {
                write!(f, "region `{region}` not found on map `{map}`")
            }
        }
    }
}

impl Error for LookupError {}

/// A dataset override that could not be loaded or decoded.
///
/// `row` is the zero-based row index when a single row failed to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetParseError {
    pub dataset: String,
    pub row: Option<usize>,
    pub message: String,
}

impl DatasetParseError {
    pub fn new(dataset: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            row: None,
            message: message.into(),
        }
    }

    pub fn at_row(dataset: impl Into<String>, row: usize, message: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            row: Some(row),
            message: message.into(),
        }
    }
}

impl Display for DatasetParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.row {
            Some(row) => write!(
                f,
                "dataset `{}` row {row} is malformed: {}",
                self.dataset, self.message
            ),
            None => write!(f, "dataset `{}` is malformed: {}", self.dataset, self.message),
        }
    }
}

impl Error for DatasetParseError {}

/// Top-level engine error.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Note metadata does not match its variant schema.
    Validation(ValidationError),
    /// A reference lookup failed.
    Lookup(LookupError),
    /// A dataset override could not be parsed.
    Parse(DatasetParseError),
    /// Engine settings are malformed.
    Settings(SettingsError),
    /// The host rejected a metadata write.
    Host(String),
    /// Registry state did not match what the operation expected.
    Consistency(String),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Lookup(err) => write!(f, "{err}"),
            Self::Parse(err) => write!(f, "{err}"),
            Self::Settings(err) => write!(f, "{err}"),
            Self::Host(message) => write!(f, "host write failed: {message}"),
            Self::Consistency(details) => write!(f, "inconsistent engine state: {details}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Lookup(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Settings(err) => Some(err),
            Self::Host(_) | Self::Consistency(_) => None,
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<LookupError> for EngineError {
    fn from(value: LookupError) -> Self {
        Self::Lookup(value)
    }
}

impl From<DatasetParseError> for EngineError {
    fn from(value: DatasetParseError) -> Self {
        Self::Parse(value)
    }
}

impl From<SettingsError> for EngineError {
    fn from(value: SettingsError) -> Self {
        Self::Settings(value)
    }
}
