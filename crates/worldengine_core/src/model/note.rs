//! Tracked note wrapper and variant dispatch.
//!
//! # Invariants
//! - `id` is assigned once at construction; renames and metadata edits keep
//!   it, replacement by a different variant creates a new note.
//! - `update()` is idempotent for unchanged inputs.
//! - A failed validation leaves the previously derived state untouched.

use super::{CharacterNote, NationNote, NoteType, OrganizationNote, ProseNote, SettlementNote};
use crate::derive::{DerivationContext, DerivationReport};
use crate::error::{EngineError, LookupError};
use crate::schema::{self, Link, NoteShape, ValidationError};
use log::{debug, warn};
use serde::{Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

/// Stable note identity.
pub type NoteId = Uuid;

/// Weak handle to a tracked note; resolve it through the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRef {
    pub path: String,
    pub name: String,
    pub note_type: NoteType,
}

/// A metadata link with the note it pointed at when last derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLink {
    pub link: Link,
    pub note: Option<NoteRef>,
}

impl ResolvedLink {
    pub fn is_resolved(&self) -> bool {
        self.note.is_some()
    }
}

/// Typed relation between two notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relation {
    pub kind: String,
    pub target: ResolvedLink,
}

/// Behaviour shared by every variant's derived state.
pub trait NoteVariant: Default + Into<NoteState> {
    type Shape;

    /// Recomputes derived fields from a validated shape.
    ///
    /// Lookup misses go into the report; the field they feed keeps its
    /// previous value.
    fn derive(
        &mut self,
        name: &str,
        shape: Self::Shape,
        ctx: &DerivationContext<'_>,
    ) -> DerivationReport;
}

/// Derived state of one note, by variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "noteType", rename_all = "lowercase")]
pub enum NoteState {
    Nation(NationNote),
    Settlement(SettlementNote),
    Character(CharacterNote),
    Organization(OrganizationNote),
    Prose(ProseNote),
}

impl NoteState {
    /// Empty state for `note_type`, before the first derivation.
    pub fn new(note_type: NoteType) -> Self {
        match note_type {
            NoteType::Nation => empty::<NationNote>(),
            NoteType::Settlement => empty::<SettlementNote>(),
            NoteType::Character => empty::<CharacterNote>(),
            NoteType::Organization => empty::<OrganizationNote>(),
            NoteType::Prose => empty::<ProseNote>(),
        }
    }

    pub fn note_type(&self) -> NoteType {
        match self {
            NoteState::Nation(_) => NoteType::Nation,
            NoteState::Settlement(_) => NoteType::Settlement,
            NoteState::Character(_) => NoteType::Character,
            NoteState::Organization(_) => NoteType::Organization,
            NoteState::Prose(_) => NoteType::Prose,
        }
    }

    fn derive(
        &mut self,
        name: &str,
        shape: NoteShape,
        ctx: &DerivationContext<'_>,
    ) -> Result<DerivationReport, EngineError> {
        match (self, shape) {
            (NoteState::Nation(state), NoteShape::Nation(shape)) => {
                Ok(state.derive(name, shape, ctx))
            }
            (NoteState::Settlement(state), NoteShape::Settlement(shape)) => {
                Ok(state.derive(name, shape, ctx))
            }
            (NoteState::Character(state), NoteShape::Character(shape)) => {
                Ok(state.derive(name, shape, ctx))
            }
            (NoteState::Organization(state), NoteShape::Organization(shape)) => {
                Ok(state.derive(name, shape, ctx))
            }
            (NoteState::Prose(state), NoteShape::Prose(shape)) => {
                Ok(state.derive(name, shape, ctx))
            }
            (state, shape) => Err(EngineError::Consistency(format!(
                "note `{name}` holds {} state but validated as {}",
                state.note_type(),
                shape_type(&shape)
            ))),
        }
    }
}

fn empty<V: NoteVariant>() -> NoteState {
    V::default().into()
}

fn shape_type(shape: &NoteShape) -> NoteType {
    match shape {
        NoteShape::Nation(_) => NoteType::Nation,
        NoteShape::Settlement(_) => NoteType::Settlement,
        NoteShape::Character(_) => NoteType::Character,
        NoteShape::Organization(_) => NoteType::Organization,
        NoteShape::Prose(_) => NoteType::Prose,
    }
}

/// One tracked world-engine note.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WbNote {
    id: NoteId,
    file_path: String,
    name: String,
    #[serde(skip)]
    raw_metadata: Value,
    validation_error: Option<ValidationError>,
    #[serde(serialize_with = "serialize_display_list")]
    lookup_errors: Vec<LookupError>,
    warnings: Vec<String>,
    state: NoteState,
}

impl WbNote {
    /// Creates an untracked-yet note with empty derived state.
    pub fn new(file_path: impl Into<String>, note_type: NoteType, raw_metadata: Value) -> Self {
        let file_path = file_path.into();
        Self {
            id: Uuid::new_v4(),
            name: note_name(&file_path, &raw_metadata),
            file_path,
            raw_metadata,
            validation_error: None,
            lookup_errors: Vec::new(),
            warnings: Vec::new(),
            state: NoteState::new(note_type),
        }
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Display name: metadata `name`, else the file stem.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn note_type(&self) -> NoteType {
        self.state.note_type()
    }

    pub fn raw_metadata(&self) -> &Value {
        &self.raw_metadata
    }

    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.validation_error.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.validation_error.is_none()
    }

    /// Lookups that failed during the last derivation.
    pub fn lookup_errors(&self) -> &[LookupError] {
        &self.lookup_errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn state(&self) -> &NoteState {
        &self.state
    }

    pub fn as_nation(&self) -> Option<&NationNote> {
        match &self.state {
            NoteState::Nation(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_settlement(&self) -> Option<&SettlementNote> {
        match &self.state {
            NoteState::Settlement(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_character(&self) -> Option<&CharacterNote> {
        match &self.state {
            NoteState::Character(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_organization(&self) -> Option<&OrganizationNote> {
        match &self.state {
            NoteState::Organization(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_prose(&self) -> Option<&ProseNote> {
        match &self.state {
            NoteState::Prose(state) => Some(state),
            _ => None,
        }
    }

    pub fn to_ref(&self) -> NoteRef {
        NoteRef {
            path: self.file_path.clone(),
            name: self.name.clone(),
            note_type: self.note_type(),
        }
    }

    pub(crate) fn set_raw_metadata(&mut self, raw_metadata: Value) {
        self.name = note_name(&self.file_path, &raw_metadata);
        self.raw_metadata = raw_metadata;
    }

    /// Moves the note to `new_path`; derived state is left as is.
    pub(crate) fn rename(&mut self, new_path: impl Into<String>) {
        self.file_path = new_path.into();
        self.name = note_name(&self.file_path, &self.raw_metadata);
    }

    /// Re-validates `raw_metadata` and recomputes derived fields.
    ///
    /// # Errors
    /// - `Validation` when the metadata no longer matches the schema; the
    ///   error is also stored on the note and derived state is kept.
    /// - `Consistency` when the validated shape belongs to another variant.
    pub(crate) fn update(&mut self, ctx: &DerivationContext<'_>) -> Result<(), EngineError> {
        let shape = match schema::validate(self.note_type(), &self.raw_metadata) {
            Ok(shape) => shape,
            Err(err) => {
                warn!(
                    "event=note_update module=model status=invalid path={} error={}",
                    self.file_path, err
                );
                self.validation_error = Some(err.clone());
                return Err(EngineError::Validation(err));
            }
        };

        let report = self.state.derive(&self.name, shape, ctx)?;
        for err in &report.lookup_errors {
            warn!(
                "event=note_update module=model status=lookup_failed path={} error={}",
                self.file_path, err
            );
        }
        debug!(
            "event=note_update module=model status=ok path={} type={} warnings={}",
            self.file_path,
            self.note_type(),
            report.warnings.len()
        );
        self.validation_error = None;
        self.warnings = report.warnings;
        self.lookup_errors = report.lookup_errors;
        Ok(())
    }

    /// Records unreadable metadata without discarding derived state.
    pub(crate) fn mark_unreadable(&mut self) {
        self.raw_metadata = Value::Null;
        self.validation_error = Some(ValidationError::unreadable());
    }
}

/// Metadata `name` when it is a non-blank string, else the file stem.
pub fn note_name(file_path: &str, raw_metadata: &Value) -> String {
    if let Some(name) = raw_metadata
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
    {
        return name.to_string();
    }
    let file_name = file_path.rsplit('/').next().unwrap_or(file_path);
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name.to_string(),
    }
}

fn serialize_display_list<S: Serializer>(
    errors: &[LookupError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}

#[cfg(test)]
mod tests {
    use super::{note_name, NoteState, WbNote};
    use crate::model::NoteType;
    use serde_json::json;

    #[test]
    fn name_prefers_metadata_then_file_stem() {
        assert_eq!(note_name("World/Arden.md", &json!({})), "Arden");
        assert_eq!(
            note_name("World/Arden.md", &json!({"name": " Kingdom of Arden "})),
            "Kingdom of Arden"
        );
        assert_eq!(note_name("World/Arden.md", &json!({"name": ""})), "Arden");
        assert_eq!(note_name("README", &json!(null)), "README");
    }

    #[test]
    fn empty_state_matches_requested_type() {
        for note_type in NoteType::ALL {
            assert_eq!(NoteState::new(note_type).note_type(), note_type);
        }
    }

    #[test]
    fn rename_keeps_identity() {
        let mut note = WbNote::new("a/Old.md", NoteType::Prose, json!({"noteType": "prose"}));
        let id = note.id();
        note.rename("b/New.md");
        assert_eq!(note.id(), id);
        assert_eq!(note.name(), "New");
        assert_eq!(note.file_path(), "b/New.md");
    }

    #[test]
    fn fresh_notes_get_distinct_ids() {
        let first = WbNote::new("a.md", NoteType::Prose, json!({}));
        let second = WbNote::new("a.md", NoteType::Prose, json!({}));
        assert_ne!(first.id(), second.id());
    }
}
