use super::note::{NoteState, NoteVariant, ResolvedLink};
use super::NoteType;
use crate::calendar::WorldDate;
use crate::derive::{DerivationContext, DerivationReport};
use crate::schema::ProseShape;
use serde::Serialize;

/// Story text anchored to a date, places and cast.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProseNote {
    pub story_date: Option<WorldDate>,
    pub scene_locations: Vec<ResolvedLink>,
    /// Links that resolve only to character notes; others stay unresolved.
    pub characters: Vec<ResolvedLink>,
}

impl NoteVariant for ProseNote {
    type Shape = ProseShape;

    fn derive(
        &mut self,
        _name: &str,
        shape: ProseShape,
        ctx: &DerivationContext<'_>,
    ) -> DerivationReport {
        let mut report = DerivationReport::default();
        self.story_date = shape.story_date;
        self.scene_locations = shape
            .scene_locations
            .into_iter()
            .map(|link| ctx.directory.resolve(link, None))
            .collect();
        self.characters = shape
            .characters
            .into_iter()
            .map(|link| ctx.directory.resolve(link, Some(NoteType::Character)))
            .collect();
        for missing in self.characters.iter().filter(|link| !link.is_resolved()) {
            report.warn(format!("character {} is not a tracked character note", missing.link));
        }
        report
    }
}

impl From<ProseNote> for NoteState {
    fn from(value: ProseNote) -> Self {
        NoteState::Prose(value)
    }
}
