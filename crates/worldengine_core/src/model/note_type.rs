use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::{Display, Formatter};

/// Closed set of world-engine note variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    Nation,
    Settlement,
    Character,
    Organization,
    Prose,
}

/// Discriminant values as written in note metadata.
const DISCRIMINANTS: &[(&str, NoteType)] = &[
    ("nation", NoteType::Nation),
    ("settlement", NoteType::Settlement),
    ("character", NoteType::Character),
    ("organization", NoteType::Organization),
    ("prose", NoteType::Prose),
];

impl NoteType {
    pub const ALL: [NoteType; 5] = [
        NoteType::Nation,
        NoteType::Settlement,
        NoteType::Character,
        NoteType::Organization,
        NoteType::Prose,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NoteType::Nation => "nation",
            NoteType::Settlement => "settlement",
            NoteType::Character => "character",
            NoteType::Organization => "organization",
            NoteType::Prose => "prose",
        }
    }

    /// Case-insensitive lookup; `None` for values that are not variants.
    pub fn from_discriminant(value: &str) -> Option<Self> {
        let wanted = value.trim();
        DISCRIMINANTS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, note_type)| *note_type)
    }

    /// Starter metadata for a new note of this type.
    ///
    /// The template validates against the variant schema as-is, so a freshly
    /// created note is tracked without errors.
    pub fn template(self, discriminant_key: &str) -> Value {
        let mut body = match self {
            NoteType::Nation => json!({
                "geography": {
                    "size": 0,
                    "unit": null,
                    "map": null,
                    "landFertility": 0,
                    "cultivatedLandPercentage": 0,
                    "territories": [],
                    "settlements": []
                },
                "dates": {"founded": null, "dissolved": null}
            }),
            NoteType::Settlement => json!({
                "demographics": {"settlementType": "Village", "populationScale": 0.5},
                "pointOfInterest": [],
                "relations": []
            }),
            NoteType::Character => json!({
                "species": null,
                "citizenship": null,
                "portrait": null,
                "dates": {"born": null, "died": null},
                "mana": null,
                "talent": null
            }),
            NoteType::Organization => json!({
                "dates": {"founded": null, "dissolved": null},
                "relations": []
            }),
            NoteType::Prose => json!({
                "storyDate": null,
                "sceneLocations": [],
                "characters": []
            }),
        };
        if let Value::Object(object) = &mut body {
            object.insert(
                discriminant_key.to_string(),
                Value::String(self.as_str().to_string()),
            );
        }
        body
    }
}

impl Display for NoteType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
