use super::note::{NoteState, NoteVariant, Relation};
use crate::data::SettlementArchetype;
use crate::derive::{settlement_population, DerivationContext, DerivationReport};
use crate::error::LookupError;
use crate::schema::{RelationShape, SettlementShape};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementNote {
    pub settlement_type: String,
    pub population_scale: f64,
    pub point_of_interest: Vec<String>,
    pub relations: Vec<Relation>,
    /// Archetype row used for the last successful population derivation.
    pub archetype: Option<SettlementArchetype>,
    pub population: Option<f64>,
}

impl NoteVariant for SettlementNote {
    type Shape = SettlementShape;

    fn derive(
        &mut self,
        _name: &str,
        shape: SettlementShape,
        ctx: &DerivationContext<'_>,
    ) -> DerivationReport {
        let mut report = DerivationReport::default();
        self.settlement_type = shape.demographics.settlement_type;
        self.population_scale = shape.demographics.population_scale;
        self.point_of_interest = shape.point_of_interest;
        self.relations = resolve_relations(shape.relations, ctx);

        match ctx.data.archetype(&self.settlement_type) {
            Some(archetype) => {
                self.population = Some(settlement_population(&archetype, self.population_scale));
                self.archetype = Some(archetype);
            }
            None => {
                report.lookup_failed(LookupError::ArchetypeNotFound(self.settlement_type.clone()))
            }
        }
        report
    }
}

pub(crate) fn resolve_relations(
    relations: Vec<RelationShape>,
    ctx: &DerivationContext<'_>,
) -> Vec<Relation> {
    relations
        .into_iter()
        .map(|relation| Relation {
            kind: relation.kind,
            target: ctx.directory.resolve(relation.target, None),
        })
        .collect()
}

impl From<SettlementNote> for NoteState {
    fn from(value: SettlementNote) -> Self {
        NoteState::Settlement(value)
    }
}
