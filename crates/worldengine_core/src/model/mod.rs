//! Note model: variant discriminants, tracked notes and derived state.
//!
//! # Responsibility
//! - Map a metadata discriminant to exactly one variant.
//! - Own each variant's derived fields and the rules that recompute them.
//!
//! # Invariants
//! - Every tracked note is exactly one variant for its whole lifetime;
//!   a variant change is modelled as delete plus create.

mod character;
mod nation;
mod note;
mod note_type;
mod organization;
mod prose;
mod settlement;

pub use character::CharacterNote;
pub use nation::NationNote;
pub use note::{note_name, NoteId, NoteRef, NoteState, NoteVariant, Relation, ResolvedLink, WbNote};
pub use note_type::NoteType;
pub use organization::OrganizationNote;
pub use prose::ProseNote;
pub use settlement::SettlementNote;
