//! Note metadata schemas.
//!
//! # Responsibility
//! - Validate a raw metadata object into the typed shape of one note variant.
//! - Check date and link syntax without touching registry state.
//!
//! # Invariants
//! - Validation is total: malformed input yields `ValidationError`, never a
//!   panic.
//! - Links are only checked for `[[target]]` syntax here; resolving them to
//!   notes happens during derivation.

mod fields;
pub mod shapes;

use crate::model::NoteType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use shapes::{
    CharacterShape, DemographicsShape, DistributionEntry, GeographyShape, LifespanShape,
    NationShape, NoteShape, OrganizationShape, ProseShape, RelationShape, SettlementShape,
    SizeSpec, MAP_SIZE_SENTINEL,
};

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[\[([^\[\]|#]+)(?:#([^\[\]|]*))?(?:\|([^\[\]]*))?\]\]$").expect("valid link regex")
});

/// What was wrong with one metadata field.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    /// Metadata block is absent or could not be parsed.
    Unreadable,
    NotAnObject,
    Missing,
    WrongType { expected: &'static str },
    InvalidDate(String),
    InvalidLink(String),
    InvalidLiteral { expected: &'static str, found: String },
    OutOfRange { min: f64, max: f64, found: f64 },
}

/// A descriptive schema failure attached to a note.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `geography.size`.
    pub field: String,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }

    pub fn unreadable() -> Self {
        Self::new("", ValidationErrorKind::Unreadable)
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let field = if self.field.is_empty() {
            "metadata"
        } else {
            self.field.as_str()
        };
        match &self.kind {
            ValidationErrorKind::Unreadable => write!(f, "metadata is missing or unreadable"),
            ValidationErrorKind::NotAnObject => write!(f, "`{field}` must be an object"),
            ValidationErrorKind::Missing => write!(f, "`{field}` is required"),
            ValidationErrorKind::WrongType { expected } => {
                write!(f, "`{field}` must be {expected}")
            }
            ValidationErrorKind::InvalidDate(value) => {
                write!(f, "`{field}` has invalid date `{value}` (expected [-]YYYY-M-D)")
            }
            ValidationErrorKind::InvalidLink(value) => {
                write!(f, "`{field}` has invalid link `{value}` (expected [[target]])")
            }
            ValidationErrorKind::InvalidLiteral { expected, found } => {
                write!(f, "`{field}` must be {expected}, got `{found}`")
            }
            ValidationErrorKind::OutOfRange { min, max, found } => {
                write!(f, "`{field}` must be within [{min}, {max}], got {found}")
            }
        }
    }
}

impl Error for ValidationError {}

impl Serialize for ValidationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A syntactically valid `[[target]]` or `[[target#heading|alias]]` link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Link {
    pub target: String,
    pub heading: Option<String>,
    pub alias: Option<String>,
}

impl Link {
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = LINK_RE.captures(raw.trim())?;
        let target = caps.get(1)?.as_str().trim();
        if target.is_empty() {
            return None;
        }
        let part = |idx: usize| {
            caps.get(idx)
                .map(|m| m.as_str().trim().to_string())
                .filter(|text| !text.is_empty())
        };
        Some(Self {
            target: target.to_string(),
            heading: part(2),
            alias: part(3),
        })
    }

    /// Returns whether the target names a vault path rather than a note name.
    pub fn is_path(&self) -> bool {
        self.target.contains('/')
    }
}

/// Renders the normalized link: trimmed parts, blank heading or alias dropped.
impl Display for Link {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[[{}", self.target)?;
        if let Some(heading) = &self.heading {
            write!(f, "#{heading}")?;
        }
        if let Some(alias) = &self.alias {
            write!(f, "|{alias}")?;
        }
        write!(f, "]]")
    }
}

/// Reads the variant discriminant from raw metadata.
///
/// Returns `None` when the key is absent or names no known variant; such
/// files are simply not world-engine notes.
pub fn note_type_of(raw: &Value, discriminant_key: &str) -> Option<NoteType> {
    raw.get(discriminant_key)?
        .as_str()
        .and_then(NoteType::from_discriminant)
}

/// Validates `raw` against the schema of `note_type`.
pub fn validate(note_type: NoteType, raw: &Value) -> Result<NoteShape, ValidationError> {
    match note_type {
        NoteType::Nation => shapes::validate_nation(raw).map(NoteShape::Nation),
        NoteType::Settlement => shapes::validate_settlement(raw).map(NoteShape::Settlement),
        NoteType::Character => shapes::validate_character(raw).map(NoteShape::Character),
        NoteType::Organization => shapes::validate_organization(raw).map(NoteShape::Organization),
        NoteType::Prose => shapes::validate_prose(raw).map(NoteShape::Prose),
    }
}
