use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::analyzers::aggregate::{count_electric_models, count_fleet_types};
use crate::analyzers::emissions::cumulative_emissions;
use crate::analyzers::types::{AggregatedCount, CumulativeEmissionSeries};
use crate::analyzers::utility::pct;
use crate::records::{FleetType, TripRecord};

/// Every chart dataset of the dashboard, computed from one load.
#[derive(Debug, Clone, Serialize)]
pub struct FleetStats {
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,

    // category charts
    pub fleet_types: AggregatedCount,
    pub electric_models: AggregatedCount,
    /// Slice colour per fleet-type label.
    pub fleet_colors: BTreeMap<String, String>,

    // line charts
    pub non_electric_emissions: CumulativeEmissionSeries,
    pub electric_emissions: CumulativeEmissionSeries,
}

impl FleetStats {
    pub fn from_records(rows: &[TripRecord]) -> Self {
        FleetStats {
            generated_at: Utc::now(),
            total_records: rows.len(),
            fleet_types: count_fleet_types(rows),
            electric_models: count_electric_models(rows),
            fleet_colors: FleetType::ALL
                .iter()
                .map(|t| (t.label().to_string(), t.color().to_string()))
                .collect(),
            non_electric_emissions: cumulative_emissions(rows, FleetType::NonElectric),
            electric_emissions: cumulative_emissions(rows, FleetType::Electric),
        }
    }

    pub fn electric_count(&self) -> usize {
        self.fleet_types
            .get(FleetType::Electric.label())
            .unwrap_or(0)
    }

    pub fn electric_pct(&self) -> f64 {
        pct(self.electric_count(), self.total_records)
    }

    pub fn emissions(&self, fleet_type: FleetType) -> &CumulativeEmissionSeries {
        match fleet_type {
            FleetType::Electric => &self.electric_emissions,
            FleetType::NonElectric => &self.non_electric_emissions,
        }
    }
}
