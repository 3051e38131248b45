//! Reference dataset row types.
//!
//! Rows arrive either from bundled JSON or from user overrides exported as
//! CSV, so numeric columns accept numbers or numeric strings.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// A named unit with directed conversion factors.
///
/// `factor` converts FROM this unit TO `to_unit`; inverses are never derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitDefinition {
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub conversion_factors: Vec<ConversionFactor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionFactor {
    pub to_unit: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub factor: f64,
}

/// Population-per-area band; the range is half-open `[min, max)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationDensityBand {
    pub descriptor: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub min_population: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub max_population: f64,
    pub area_unit: String,
}

impl PopulationDensityBand {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min_population && value < self.max_population
    }
}

/// Population policy for a settlement archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionType {
    Linear,
    Gaussian,
}

impl<'de> Deserialize<'de> for DistributionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "linear" => Ok(Self::Linear),
            "gaussian" | "normal" => Ok(Self::Gaussian),
            other => Err(D::Error::custom(format!(
                "unknown distribution type `{other}`; expected linear|gaussian"
            ))),
        }
    }
}

/// A settlement class with its population range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementArchetype {
    #[serde(rename = "type")]
    pub settlement_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_distribution")]
    pub distribution_type: DistributionType,
    #[serde(deserialize_with = "lenient_f64")]
    pub min_population: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub max_population: f64,
}

impl SettlementArchetype {
    /// Mean population of the archetype's range.
    pub fn average_population(&self) -> f64 {
        (self.min_population + self.max_population) / 2.0
    }

    /// Inclusive range check used by the settlement-count correction.
    pub fn covers(&self, population: f64) -> bool {
        population >= self.min_population && population <= self.max_population
    }
}

/// Named tier for a character's talent score; range is half-open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalentRank {
    pub rank: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub min_value: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub max_value: f64,
}

impl TalentRank {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min_value && value < self.max_value
    }
}

fn default_distribution() -> DistributionType {
    DistributionType::Linear
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(value) => Ok(value),
        NumberOrText::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|err| D::Error::custom(format!("invalid number `{text}`: {err}"))),
    }
}
