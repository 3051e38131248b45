use super::note::{NoteState, NoteVariant};
use crate::calendar::{DateSpan, WorldDate};
use crate::derive::{
    cultivated_land, density_descriptor, distribution_warning, nation_population,
    resolve_map_size, settlement_table, territory_table, DerivationContext, DerivationReport,
    SettlementTableRow, TerritoryRow,
};
use crate::error::LookupError;
use crate::schema::{DistributionEntry, NationShape, SizeSpec};
use log::error;
use serde::Serialize;

/// Derived state of a nation note.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NationNote {
    pub size_spec: Option<SizeSpec>,
    /// Resolved area in `unit`; kept from the last success when a map
    /// lookup fails.
    pub size: Option<f64>,
    pub unit: String,
    pub map: Option<String>,
    pub land_fertility: f64,
    pub cultivated_land_percentage: f64,
    pub territories: Vec<DistributionEntry>,
    pub settlements: Vec<DistributionEntry>,
    pub founded: Option<WorldDate>,
    pub dissolved: Option<WorldDate>,
    pub age: Option<DateSpan>,
    pub cultivated_land: Option<f64>,
    pub population: Option<f64>,
    pub density_descriptor: Option<String>,
    pub settlement_table: Vec<SettlementTableRow>,
    pub territory_table: Vec<TerritoryRow>,
}

impl NationNote {
    fn resolve_size(&self, name: &str, ctx: &DerivationContext<'_>) -> Result<f64, LookupError> {
        match self.size_spec {
            Some(SizeSpec::Area(area)) => Ok(area),
            Some(SizeSpec::Map) | None => {
                let map_id = self
                    .map
                    .as_deref()
                    .or(ctx.settings.default_map.as_deref())
                    .ok_or(LookupError::MapNotConfigured)?;
                resolve_map_size(ctx.maps, map_id, name)
            }
        }
    }
}

impl NoteVariant for NationNote {
    type Shape = NationShape;

    fn derive(
        &mut self,
        name: &str,
        shape: NationShape,
        ctx: &DerivationContext<'_>,
    ) -> DerivationReport {
        let mut report = DerivationReport::default();
        let geography = shape.geography;
        self.size_spec = Some(geography.size);
        self.unit = geography
            .unit
            .unwrap_or_else(|| ctx.settings.default_area_unit.clone());
        self.map = geography.map;
        self.land_fertility = geography.land_fertility;
        self.cultivated_land_percentage = geography.cultivated_land_percentage;
        self.territories = geography.territories;
        self.settlements = geography.settlements;
        self.founded = shape.dates.start;
        self.dissolved = shape.dates.end;
        self.age = self
            .founded
            .map(|founded| founded.span_to(&self.dissolved.unwrap_or(ctx.current_date)));

        let epsilon = ctx.settings.distribution_epsilon;
        report
            .warnings
            .extend(distribution_warning("territory", &self.territories, epsilon));
        report
            .warnings
            .extend(distribution_warning("settlement", &self.settlements, epsilon));

        let size = match self.resolve_size(name, ctx) {
            Ok(size) => size,
            Err(err) => {
                error!(
                    "event=nation_size module=model status=lookup_failed nation={} error={}",
                    name, err
                );
                report.lookup_failed(err);
                return report;
            }
        };
        let population = nation_population(
            size,
            self.cultivated_land_percentage,
            self.land_fertility,
        );
        self.size = Some(size);
        self.cultivated_land = Some(cultivated_land(size, self.cultivated_land_percentage));
        self.population = Some(population);

        let bands = ctx.data.density_bands();
        self.density_descriptor = if size > 0.0 {
            density_descriptor(&bands, &ctx.converter, population / size, &self.unit)
        } else {
            None
        };

        let (rows, errors) =
            settlement_table(population, &self.settlements, &ctx.data.settlement_types());
        self.settlement_table = rows;
        for err in errors {
            report.lookup_failed(err);
        }
        self.territory_table = territory_table(
            size,
            &self.unit,
            population,
            &self.territories,
            &bands,
            &ctx.converter,
        );
        report
    }
}

impl From<NationNote> for NoteState {
    fn from(value: NationNote) -> Self {
        NoteState::Nation(value)
    }
}
