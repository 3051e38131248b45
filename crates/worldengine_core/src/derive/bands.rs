//! First-match scans over half-open range datasets.
//!
//! # Invariants
//! - Bands are tested in dataset order; the first match wins.
//! - A density band whose unit cannot be converted is skipped, not fatal.

use crate::data::{PopulationDensityBand, TalentRank};
use crate::units::UnitConverter;
use log::warn;

/// Finds the density band containing `density`, expressed per `area_unit`.
///
/// Bands in another unit are compared after rescaling the density by the
/// factor `band unit -> area_unit` (people per band unit = people per query
/// unit * query units per band unit).
pub fn density_band<'a>(
    bands: &'a [PopulationDensityBand],
    converter: &UnitConverter,
    density: f64,
    area_unit: &str,
) -> Option<&'a PopulationDensityBand> {
    bands.iter().find(|band| {
        if band.area_unit == area_unit {
            return band.contains(density);
        }
        match converter.convert(1.0, &band.area_unit, area_unit) {
            Ok(query_units_per_band_unit) => band.contains(density * query_units_per_band_unit),
            Err(err) => {
                warn!(
                    "event=density_band_skipped module=derive descriptor={} band_unit={} query_unit={} error={}",
                    band.descriptor, band.area_unit, area_unit, err
                );
                false
            }
        }
    })
}

/// Descriptor text of the matching density band.
pub fn density_descriptor(
    bands: &[PopulationDensityBand],
    converter: &UnitConverter,
    density: f64,
    area_unit: &str,
) -> Option<String> {
    density_band(bands, converter, density, area_unit).map(|band| band.descriptor.clone())
}

pub fn talent_rank(ranks: &[TalentRank], talent: f64) -> Option<&TalentRank> {
    ranks.iter().find(|rank| rank.contains(talent))
}

#[cfg(test)]
mod tests {
    use super::{density_descriptor, talent_rank};
    use crate::data::{ConversionFactor, PopulationDensityBand, TalentRank, UnitDefinition};
    use crate::units::UnitConverter;

    fn band(descriptor: &str, min: f64, max: f64, unit: &str) -> PopulationDensityBand {
        PopulationDensityBand {
            descriptor: descriptor.to_string(),
            min_population: min,
            max_population: max,
            area_unit: unit.to_string(),
        }
    }

    fn converter(with_mile_to_km: bool) -> UnitConverter {
        let factors = if with_mile_to_km {
            vec![ConversionFactor {
                to_unit: "km^2".to_string(),
                factor: 2.5,
            }]
        } else {
            Vec::new()
        };
        UnitConverter::new(
            vec![UnitDefinition {
                name: "mile^2".to_string(),
                symbol: "mi²".to_string(),
                conversion_factors: factors,
            }]
            .into(),
        )
    }

    #[test]
    fn ascending_bands_return_unique_match() {
        let bands = vec![
            band("Sparse", 0.0, 10.0, "mile^2"),
            band("Rural", 10.0, 100.0, "mile^2"),
            band("Dense", 100.0, 1000.0, "mile^2"),
        ];
        let units = converter(false);
        assert_eq!(density_descriptor(&bands, &units, 0.0, "mile^2").as_deref(), Some("Sparse"));
        assert_eq!(density_descriptor(&bands, &units, 10.0, "mile^2").as_deref(), Some("Rural"));
        assert_eq!(density_descriptor(&bands, &units, 999.0, "mile^2").as_deref(), Some("Dense"));
        assert_eq!(density_descriptor(&bands, &units, 1000.0, "mile^2"), None);
        assert_eq!(density_descriptor(&bands, &units, -1.0, "mile^2"), None);
    }

    #[test]
    fn cross_unit_lookup_needs_a_factor() {
        let bands = vec![band("Village", 20.0, 1000.0, "mile^2")];
        assert_eq!(
            density_descriptor(&bands, &converter(false), 500.0, "mile^2").as_deref(),
            Some("Village")
        );
        assert_eq!(density_descriptor(&bands, &converter(false), 500.0, "km^2"), None);
        // 100 per km^2 with 2.5 km^2 per mile^2 is 250 per mile^2.
        assert_eq!(
            density_descriptor(&bands, &converter(true), 100.0, "km^2").as_deref(),
            Some("Village")
        );
    }

    #[test]
    fn unconvertible_band_is_skipped_and_scan_continues() {
        let bands = vec![
            band("Leagues", 0.0, 1_000_000.0, "league^2"),
            band("Village", 20.0, 1000.0, "mile^2"),
        ];
        assert_eq!(
            density_descriptor(&bands, &converter(false), 500.0, "mile^2").as_deref(),
            Some("Village")
        );
    }

    #[test]
    fn talent_rank_is_half_open() {
        let ranks = vec![
            TalentRank {
                rank: "Novice".to_string(),
                min_value: 0.0,
                max_value: 10.0,
            },
            TalentRank {
                rank: "Adept".to_string(),
                min_value: 10.0,
                max_value: 20.0,
            },
        ];
        assert_eq!(talent_rank(&ranks, 10.0).unwrap().rank, "Adept");
        assert!(talent_rank(&ranks, 20.0).is_none());
    }
}
