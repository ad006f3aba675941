use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::analyzers::aggregate::partition;
use crate::analyzers::types::{CumulativeEmissionSeries, EmissionPoint};
use crate::analyzers::utility::running_sum;
use crate::records::{FleetType, TripRecord};

/// Minute-resolution bucket key, `HH:MM`.
pub fn time_bucket(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%H:%M").to_string()
}

fn series_title(fleet_type: FleetType) -> &'static str {
    match fleet_type {
        FleetType::Electric => "CO₂ emissions avoided over the day - electric buses",
        FleetType::NonElectric => "Cumulative CO₂ emissions over the day - non-electric buses",
    }
}

/// Builds the cumulative per-minute emission series of one partition.
///
/// Buckets are ordered by their `HH:MM` string, which is chronological
/// within a single day only: records after midnight sort before the
/// evening ones.
pub fn cumulative_emissions(rows: &[TripRecord], fleet_type: FleetType) -> CumulativeEmissionSeries {
    let mut per_bucket: BTreeMap<String, f64> = BTreeMap::new();
    for row in partition(rows, fleet_type) {
        *per_bucket.entry(time_bucket(&row.start_timestamp)).or_default() += row.co2_emission;
    }

    let totals = running_sum(per_bucket.values().copied());
    let points = per_bucket
        .into_keys()
        .zip(totals)
        .map(|(bucket, cumulative_kg)| EmissionPoint {
            bucket,
            cumulative_kg,
        })
        .collect();

    CumulativeEmissionSeries {
        fleet_type,
        title: series_title(fleet_type).to_string(),
        color: fleet_type.color().to_string(),
        points,
    }
}
