//! Typed shapes produced by schema validation, one per note variant.

use super::fields::Fields;
use super::{Link, ValidationError, ValidationErrorKind};
use crate::calendar::WorldDate;
use serde::Serialize;
use serde_json::Value;

/// Literal that defers a nation's size to the map region index.
pub const MAP_SIZE_SENTINEL: &str = "MAP";

/// Validated metadata of any variant.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteShape {
    Nation(NationShape),
    Settlement(SettlementShape),
    Character(CharacterShape),
    Organization(OrganizationShape),
    Prose(ProseShape),
}

/// Literal size or the `"MAP"` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum SizeSpec {
    Area(f64),
    Map,
}

/// One bucket of a fractional distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionEntry {
    pub name: String,
    /// Share in `[0, 1]`.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeographyShape {
    pub size: SizeSpec,
    pub unit: Option<String>,
    pub map: Option<String>,
    pub land_fertility: f64,
    pub cultivated_land_percentage: f64,
    pub territories: Vec<DistributionEntry>,
    pub settlements: Vec<DistributionEntry>,
}

/// Start/end dates; keys differ per variant (`founded`/`born`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LifespanShape {
    pub start: Option<WorldDate>,
    pub end: Option<WorldDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NationShape {
    pub geography: GeographyShape,
    pub dates: LifespanShape,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemographicsShape {
    pub settlement_type: String,
    /// Position inside the archetype's population range, in `[0, 1]`.
    pub population_scale: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationShape {
    pub kind: String,
    pub target: Link,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettlementShape {
    pub demographics: DemographicsShape,
    pub point_of_interest: Vec<String>,
    pub relations: Vec<RelationShape>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterShape {
    pub species: Option<String>,
    pub citizenship: Option<Link>,
    pub portrait: Option<String>,
    pub dates: LifespanShape,
    pub mana: Option<f64>,
    pub talent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationShape {
    pub dates: LifespanShape,
    pub relations: Vec<RelationShape>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProseShape {
    pub story_date: Option<WorldDate>,
    pub scene_locations: Vec<Link>,
    pub characters: Vec<Link>,
}

pub(crate) fn validate_nation(raw: &Value) -> Result<NationShape, ValidationError> {
    let root = Fields::root(raw)?;
    let geography = root.required_object("geography")?;

    let size = match geography.raw("size") {
        None => {
            return Err(ValidationError::new(
                "geography.size",
                ValidationErrorKind::Missing,
            ))
        }
        Some(Value::String(text)) if text.trim() == MAP_SIZE_SENTINEL => SizeSpec::Map,
        Some(Value::String(text)) => {
            return Err(ValidationError::new(
                "geography.size",
                ValidationErrorKind::InvalidLiteral {
                    expected: "a number or \"MAP\"",
                    found: text.clone(),
                },
            ))
        }
        Some(_) => {
            let area = geography.required_number("size")?;
            SizeSpec::Area(geography.in_range("size", area, 0.0, f64::MAX)?)
        }
    };

    let fertility = geography.required_number("landFertility")?;
    let cultivated = geography.required_number("cultivatedLandPercentage")?;

    Ok(NationShape {
        geography: GeographyShape {
            size,
            unit: geography.optional_string("unit")?,
            map: geography.optional_string("map")?,
            land_fertility: geography.in_range("landFertility", fertility, 0.0, f64::MAX)?,
            cultivated_land_percentage: geography.in_range(
                "cultivatedLandPercentage",
                cultivated,
                0.0,
                100.0,
            )?,
            territories: distribution(&geography, "territories", "name")?,
            settlements: distribution(&geography, "settlements", "type")?,
        },
        dates: lifespan(&root, "founded", "dissolved")?,
    })
}

pub(crate) fn validate_settlement(raw: &Value) -> Result<SettlementShape, ValidationError> {
    let root = Fields::root(raw)?;
    let demographics = root.required_object("demographics")?;
    let scale = demographics.required_number("populationScale")?;

    Ok(SettlementShape {
        demographics: DemographicsShape {
            settlement_type: demographics.required_string("settlementType")?,
            population_scale: demographics.in_range("populationScale", scale, 0.0, 1.0)?,
        },
        point_of_interest: root.string_list("pointOfInterest")?,
        relations: relations(&root)?,
    })
}

pub(crate) fn validate_character(raw: &Value) -> Result<CharacterShape, ValidationError> {
    let root = Fields::root(raw)?;
    let mana = match root.optional_number("mana")? {
        Some(value) => Some(root.in_range("mana", value, 0.0, f64::MAX)?),
        None => None,
    };
    let talent = match root.optional_number("talent")? {
        Some(value) => Some(root.in_range("talent", value, 0.0, f64::MAX)?),
        None => None,
    };

    Ok(CharacterShape {
        species: root.optional_string("species")?,
        citizenship: root.optional_link("citizenship")?,
        portrait: root.optional_string("portrait")?,
        dates: lifespan(&root, "born", "died")?,
        mana,
        talent,
    })
}

pub(crate) fn validate_organization(raw: &Value) -> Result<OrganizationShape, ValidationError> {
    let root = Fields::root(raw)?;
    Ok(OrganizationShape {
        dates: lifespan(&root, "founded", "dissolved")?,
        relations: relations(&root)?,
    })
}

pub(crate) fn validate_prose(raw: &Value) -> Result<ProseShape, ValidationError> {
    let root = Fields::root(raw)?;
    Ok(ProseShape {
        story_date: root.optional_date("storyDate")?,
        scene_locations: root.link_list("sceneLocations")?,
        characters: root.link_list("characters")?,
    })
}

fn lifespan(
    root: &Fields<'_>,
    start_key: &str,
    end_key: &str,
) -> Result<LifespanShape, ValidationError> {
    let Some(dates) = root.optional_object("dates")? else {
        return Ok(LifespanShape::default());
    };
    Ok(LifespanShape {
        start: dates.optional_date(start_key)?,
        end: dates.optional_date(end_key)?,
    })
}

fn relations(root: &Fields<'_>) -> Result<Vec<RelationShape>, ValidationError> {
    root.object_list("relations")?
        .iter()
        .map(|relation| -> Result<RelationShape, ValidationError> {
            Ok(RelationShape {
                kind: relation
                    .optional_string("kind")?
                    .unwrap_or_else(|| "related".to_string()),
                target: relation.required_link("target")?,
            })
        })
        .collect()
}

fn distribution(
    parent: &Fields<'_>,
    key: &str,
    name_key: &str,
) -> Result<Vec<DistributionEntry>, ValidationError> {
    parent
        .object_list(key)?
        .iter()
        .map(|entry| -> Result<DistributionEntry, ValidationError> {
            let value = entry.required_number("value")?;
            Ok(DistributionEntry {
                name: entry.required_string(name_key)?,
                value: entry.in_range("value", value, 0.0, 1.0)?,
            })
        })
        .collect()
}
