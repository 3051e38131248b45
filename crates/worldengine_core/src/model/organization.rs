use super::note::{NoteState, NoteVariant, Relation};
use super::settlement::resolve_relations;
use crate::calendar::{DateSpan, WorldDate};
use crate::derive::{DerivationContext, DerivationReport};
use crate::schema::OrganizationShape;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationNote {
    pub founded: Option<WorldDate>,
    pub dissolved: Option<WorldDate>,
    pub age: Option<DateSpan>,
    pub relations: Vec<Relation>,
}

impl NoteVariant for OrganizationNote {
    type Shape = OrganizationShape;

    fn derive(
        &mut self,
        _name: &str,
        shape: OrganizationShape,
        ctx: &DerivationContext<'_>,
    ) -> DerivationReport {
        self.founded = shape.dates.start;
        self.dissolved = shape.dates.end;
        self.age = self
            .founded
            .map(|founded| founded.span_to(&self.dissolved.unwrap_or(ctx.current_date)));
        self.relations = resolve_relations(shape.relations, ctx);
        DerivationReport::default()
    }
}

impl From<OrganizationNote> for NoteState {
    fn from(value: OrganizationNote) -> Self {
        NoteState::Organization(value)
    }
}
