//! Population formulas for nations and settlements.

use crate::data::{DistributionType, SettlementArchetype};
use crate::error::LookupError;
use crate::host::MapRegionIndex;
use log::debug;

/// `(max - min) * scale + min`.
pub fn interpolate_linear(min: f64, max: f64, scale: f64) -> f64 {
    (max - min) * scale + min
}

/// Population of a settlement positioned at `scale` within its archetype.
///
/// Every archetype is interpolated linearly. Rows still tagged `gaussian`
/// are accepted but resolved the same way so that derivation stays
/// deterministic.
pub fn settlement_population(archetype: &SettlementArchetype, scale: f64) -> f64 {
    if archetype.distribution_type == DistributionType::Gaussian {
        debug!(
            "event=settlement_population module=derive distribution=gaussian resolved_as=linear type={}",
            archetype.settlement_type
        );
    }
    interpolate_linear(archetype.min_population, archetype.max_population, scale)
}

/// Land under cultivation: `size * (percentage / 100)`.
pub fn cultivated_land(size: f64, cultivated_land_percentage: f64) -> f64 {
    size * (cultivated_land_percentage / 100.0)
}

pub fn nation_population(size: f64, cultivated_land_percentage: f64, land_fertility: f64) -> f64 {
    cultivated_land(size, cultivated_land_percentage) * land_fertility
}

/// Resolves a `"MAP"` size as `region fraction * map total area`.
pub fn resolve_map_size(
    maps: &dyn MapRegionIndex,
    map_id: &str,
    region_name: &str,
) -> Result<f64, LookupError> {
    let total = maps
        .total_area(map_id)
        .ok_or_else(|| LookupError::MapNotFound(map_id.to_string()))?;
    let fraction = maps
        .region_area_fraction(map_id, region_name)
        .ok_or_else(|| LookupError::RegionNotFound {
            map: map_id.to_string(),
            region: region_name.to_string(),
        })?;
    Ok(fraction * total)
}

#[cfg(test)]
mod tests {
    use super::{interpolate_linear, nation_population, resolve_map_size, settlement_population};
    use crate::data::{DistributionType, SettlementArchetype};
    use crate::error::LookupError;
    use crate::host::{MapSnapshot, MemoryVault};
    use std::collections::BTreeMap;

    fn archetype(distribution_type: DistributionType) -> SettlementArchetype {
        SettlementArchetype {
            settlement_type: "Village".to_string(),
            description: String::new(),
            distribution_type,
            min_population: 401.0,
            max_population: 900.0,
        }
    }

    #[test]
    fn interpolation_hits_both_ends() {
        assert_eq!(interpolate_linear(401.0, 900.0, 0.0), 401.0);
        assert_eq!(interpolate_linear(401.0, 900.0, 1.0), 900.0);
        for step in 0..=20 {
            let scale = f64::from(step) / 20.0;
            let value = interpolate_linear(401.0, 900.0, scale);
            assert!((401.0..=900.0).contains(&value), "{value} out of range");
        }
    }

    #[test]
    fn gaussian_rows_resolve_linearly() {
        let linear = settlement_population(&archetype(DistributionType::Linear), 0.25);
        let gaussian = settlement_population(&archetype(DistributionType::Gaussian), 0.25);
        assert_eq!(linear, gaussian);
        assert_eq!(linear, 525.75);
    }

    #[test]
    fn nation_population_uses_cultivated_share() {
        assert_eq!(nation_population(100.0, 20.0, 50.0), 1000.0);
    }

    #[test]
    fn map_size_is_fraction_of_total() {
        let mut vault = MemoryVault::new();
        vault.insert_map(
            "world",
            MapSnapshot {
                total_area: 1000.0,
                regions: BTreeMap::from([("Arden".to_string(), 0.1)]),
            },
        );
        assert_eq!(resolve_map_size(&vault, "world", "Arden").unwrap(), 100.0);
        assert_eq!(
            resolve_map_size(&vault, "world", "Brenn").unwrap_err(),
            LookupError::RegionNotFound {
                map: "world".to_string(),
                region: "Brenn".to_string()
            }
        );
        assert_eq!(
            resolve_map_size(&vault, "moon", "Arden").unwrap_err(),
            LookupError::MapNotFound("moon".to_string())
        );
    }
}
