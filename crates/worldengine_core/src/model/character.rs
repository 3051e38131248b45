use super::note::{NoteState, NoteVariant, ResolvedLink};
use super::NoteType;
use crate::calendar::{DateSpan, WorldDate};
use crate::derive::{talent_rank, DerivationContext, DerivationReport};
use crate::schema::CharacterShape;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterNote {
    pub species: Option<String>,
    /// Link to the nation the character belongs to.
    pub citizenship: Option<ResolvedLink>,
    pub portrait: Option<String>,
    pub born: Option<WorldDate>,
    pub died: Option<WorldDate>,
    /// Age at death, or at the world's current date while alive.
    pub age: Option<DateSpan>,
    pub mana: Option<f64>,
    pub talent: Option<f64>,
    pub talent_rank: Option<String>,
}

impl NoteVariant for CharacterNote {
    type Shape = CharacterShape;

    fn derive(
        &mut self,
        name: &str,
        shape: CharacterShape,
        ctx: &DerivationContext<'_>,
    ) -> DerivationReport {
        let mut report = DerivationReport::default();
        self.species = shape.species;
        self.citizenship = shape
            .citizenship
            .map(|link| ctx.directory.resolve(link, Some(NoteType::Nation)));
        self.portrait = shape.portrait;
        self.born = shape.dates.start;
        self.died = shape.dates.end;
        self.age = self
            .born
            .map(|born| born.span_to(&self.died.unwrap_or(ctx.current_date)));
        self.mana = shape.mana;
        self.talent = shape.talent;
        self.talent_rank = self.talent.and_then(|talent| {
            talent_rank(&ctx.data.talent_ranks(), talent).map(|rank| rank.rank.clone())
        });

        if let (Some(born), Some(died)) = (self.born, self.died) {
            if died < born {
                report.warn(format!("{name} died ({died}) before being born ({born})"));
            }
        }
        if self.talent.is_some() && self.talent_rank.is_none() {
            report.warn(format!("{name} has a talent score outside every rank"));
        }
        report
    }
}

impl From<CharacterNote> for NoteState {
    fn from(value: CharacterNote) -> Self {
        NoteState::Character(value)
    }
}
