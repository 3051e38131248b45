//! Settlement and territory breakdown tables for nations.
//!
//! # Invariants
//! - A non-empty bucket whose population fits inside its archetype's range
//!   always yields at least one settlement.
//! - A missing archetype drops that bucket from the table and reports a
//!   lookup error; remaining buckets are still computed.

use super::bands::density_descriptor;
use crate::data::{PopulationDensityBand, SettlementArchetype};
use crate::error::LookupError;
use crate::schema::DistributionEntry;
use crate::units::UnitConverter;
use serde::Serialize;

/// One settlement-type bucket of a nation's population.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementTableRow {
    pub settlement_type: String,
    pub share: f64,
    /// Population living in settlements of this type.
    pub population: f64,
    pub count: u64,
    /// Mean population per settlement; `0` when `count` is `0`.
    pub average_population: f64,
}

/// One territory of a nation with its area and population share.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryRow {
    pub name: String,
    pub share: f64,
    pub area: f64,
    pub population: f64,
    pub density_descriptor: Option<String>,
}

pub fn distribution_sum(entries: &[DistributionEntry]) -> f64 {
    entries.iter().map(|entry| entry.value).sum()
}

/// Returns a warning when a non-empty distribution does not sum to 1.
pub fn distribution_warning(
    label: &str,
    entries: &[DistributionEntry],
    epsilon: f64,
) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    let sum = distribution_sum(entries);
    if (sum - 1.0).abs() > epsilon {
        return Some(format!("{label} distribution sums to {sum}, expected 1"));
    }
    None
}

/// Number of settlements needed to house `bucket_population`.
pub fn settlement_count(bucket_population: f64, archetype: &SettlementArchetype) -> u64 {
    let average = archetype.average_population();
    if average <= 0.0 || bucket_population <= 0.0 {
        return 0;
    }
    let count = (bucket_population / average).round() as u64;
    if count == 0 && archetype.covers(bucket_population) {
        return 1;
    }
    count
}

/// Splits `total_population` over settlement-type buckets.
pub fn settlement_table(
    total_population: f64,
    entries: &[DistributionEntry],
    archetypes: &[SettlementArchetype],
) -> (Vec<SettlementTableRow>, Vec<LookupError>) {
    let mut rows = Vec::with_capacity(entries.len());
    let mut errors = Vec::new();
    for entry in entries {
        let Some(archetype) = archetypes
            .iter()
            .find(|row| row.settlement_type.eq_ignore_ascii_case(entry.name.trim()))
        else {
            errors.push(LookupError::ArchetypeNotFound(entry.name.clone()));
            continue;
        };
        let population = total_population * entry.value;
        let count = settlement_count(population, archetype);
        let average_population = if count == 0 {
            0.0
        } else {
            population / count as f64
        };
        rows.push(SettlementTableRow {
            settlement_type: archetype.settlement_type.clone(),
            share: entry.value,
            population,
            count,
            average_population,
        });
    }
    (rows, errors)
}

/// Splits a nation's area and population over its territories.
pub fn territory_table(
    size: f64,
    area_unit: &str,
    total_population: f64,
    entries: &[DistributionEntry],
    bands: &[PopulationDensityBand],
    converter: &UnitConverter,
) -> Vec<TerritoryRow> {
    entries
        .iter()
        .map(|entry| {
            let area = size * entry.value;
            let population = total_population * entry.value;
            let density_descriptor = if area > 0.0 {
                density_descriptor(bands, converter, population / area, area_unit)
            } else {
                None
            };
            TerritoryRow {
                name: entry.name.clone(),
                share: entry.value,
                area,
                population,
                density_descriptor,
            }
        })
        .collect()
}
