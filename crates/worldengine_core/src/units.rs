//! Unit conversion over the live unit dataset.
//!
//! # Invariants
//! - Only direct factors are used; no multi-hop path search.
//! - Conversion is directed: `A -> B` never implies `B -> A`.

use crate::data::UnitDefinition;
use crate::error::LookupError;
use std::sync::Arc;

/// Snapshot-backed conversion service.
///
/// Holds the unit rows that were live when it was created, so a dataset
/// reload mid-derivation cannot change results half way through.
#[derive(Debug, Clone)]
pub struct UnitConverter {
    units: Arc<[UnitDefinition]>,
}

impl UnitConverter {
    pub fn new(units: Arc<[UnitDefinition]>) -> Self {
        Self { units }
    }

    pub fn unit(&self, name: &str) -> Result<&UnitDefinition, LookupError> {
        self.units
            .iter()
            .find(|unit| unit.name == name)
            .ok_or_else(|| LookupError::UnitNotFound(name.to_string()))
    }

    /// Converts `value` from `from_unit` to `to_unit`.
    ///
    /// # Errors
    /// - `UnitNotFound` when `from_unit` is not defined.
    /// - `ConversionNotFound` when `from_unit` lacks a direct factor to
    ///   `to_unit`, including the same-unit case.
    pub fn convert(&self, value: f64, from_unit: &str, to_unit: &str) -> Result<f64, LookupError> {
        let unit = self.unit(from_unit)?;
        unit.conversion_factors
            .iter()
            .find(|factor| factor.to_unit == to_unit)
            .map(|factor| value * factor.factor)
            .ok_or_else(|| LookupError::ConversionNotFound {
                from: from_unit.to_string(),
                to: to_unit.to_string(),
            })
    }

    pub fn symbol(&self, unit_name: &str) -> Result<&str, LookupError> {
        self.unit(unit_name).map(|unit| unit.symbol.as_str())
    }
}
