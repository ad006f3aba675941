//! CSV loaders for the trip-record and trajectory tables.
//!
//! Both loaders check the header row before reading any data, so a missing
//! column fails the load immediately. Records-table cells that cannot be
//! coerced are schema errors; trajectory cells follow a [`RowPolicy`].

mod cache;
mod source;

pub use cache::DatasetCache;
pub use source::open_table;

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::parser::{parse_coordinates, parse_emission, parse_flag, parse_timestamp, parse_timestamps};
use crate::records::{TripPath, TripRecord};

pub mod columns {
    pub const BUS_ID: &str = "id_onibus";
    pub const ELECTRIC: &str = "eletrico";
    pub const MODEL: &str = "modelo";
    pub const START_TIME: &str = "momento_inicial";
    pub const CO2_EMISSION: &str = "emissao_co2";

    pub const COORDINATES: &str = "coordinates";
    pub const TIMESTAMPS: &str = "timestamps";
}

const RECORDS_TABLE: &str = "df_final";
const TRIPS_TABLE: &str = "trips";

/// What to do with a trajectory row that fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum RowPolicy {
    /// Fail the whole load on the first bad row.
    #[default]
    Abort,
    /// Drop the row and log a warning.
    Skip,
}

/// Resolves column names to positions, failing on the first missing one.
fn column_indices<const N: usize>(
    headers: &csv::StringRecord,
    table: &'static str,
    names: [&'static str; N],
) -> Result<[usize; N]> {
    let mut indices = [0; N];
    for (slot, name) in indices.iter_mut().zip(names) {
        *slot = headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or(PipelineError::MissingColumn {
                table,
                column: name,
            })?;
    }
    Ok(indices)
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn invalid(record: &csv::StringRecord, column: &'static str, value: &str, reason: &str) -> PipelineError {
    PipelineError::InvalidValue {
        line: line_of(record),
        column,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Reads the `df_final` table from `path` (plain or `.gz` CSV).
#[tracing::instrument(fields(path = %path.display()))]
pub fn load_trip_records(path: &Path) -> Result<Vec<TripRecord>> {
    read_trip_records(open_table(path)?)
}

/// Reads trip records from any CSV source.
pub fn read_trip_records<R: std::io::Read>(reader: R) -> Result<Vec<TripRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let [bus_id, electric, model, start, co2] = column_indices(
        rdr.headers()?,
        RECORDS_TABLE,
        [
            columns::BUS_ID,
            columns::ELECTRIC,
            columns::MODEL,
            columns::START_TIME,
            columns::CO2_EMISSION,
        ],
    )?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let cell = |i: usize| record.get(i).unwrap_or("");

        let is_electric = parse_flag(cell(electric))
            .ok_or_else(|| invalid(&record, columns::ELECTRIC, cell(electric), "not a boolean"))?;
        let start_timestamp = parse_timestamp(cell(start)).ok_or_else(|| {
            invalid(&record, columns::START_TIME, cell(start), "not an ISO-8601 timestamp")
        })?;
        let co2_emission = parse_emission(cell(co2))
            .map_err(|reason| invalid(&record, columns::CO2_EMISSION, cell(co2), reason))?;

        rows.push(TripRecord {
            bus_id: cell(bus_id).trim().to_string(),
            is_electric,
            model: cell(model).trim().to_string(),
            start_timestamp,
            co2_emission,
        });
    }

    info!(rows = rows.len(), "Trip records loaded");
    Ok(rows)
}

/// Reads the `trips` table from `path` (plain or `.gz` CSV).
#[tracing::instrument(fields(path = %path.display()))]
pub fn load_trip_paths(path: &Path, policy: RowPolicy) -> Result<Vec<TripPath>> {
    read_trip_paths(open_table(path)?, policy)
}

/// Reads trajectories from any CSV source, applying `policy` to bad rows.
pub fn read_trip_paths<R: std::io::Read>(reader: R, policy: RowPolicy) -> Result<Vec<TripPath>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let [coordinates, timestamps] = column_indices(
        rdr.headers()?,
        TRIPS_TABLE,
        [columns::COORDINATES, columns::TIMESTAMPS],
    )?;

    let mut paths = Vec::new();
    let mut skipped = 0usize;

    for result in rdr.records() {
        let record = result?;
        match parse_trip_row(&record, coordinates, timestamps) {
            Ok(path) => paths.push(path),
            Err(e) => match policy {
                RowPolicy::Abort => return Err(e),
                RowPolicy::Skip => {
                    warn!(error = %e, "Skipping malformed trajectory row");
                    skipped += 1;
                }
            },
        }
    }

    if skipped > 0 {
        warn!(skipped, kept = paths.len(), "Trajectory rows dropped");
    }
    info!(rows = paths.len(), "Trip paths loaded");
    Ok(paths)
}

fn parse_trip_row(record: &csv::StringRecord, coordinates: usize, timestamps: usize) -> Result<TripPath> {
    let line = line_of(record);
    let parse_err = |reason: String| PipelineError::Parse { line, reason };

    let coords = parse_coordinates(record.get(coordinates).unwrap_or(""))
        .map_err(|e| parse_err(format!("coordinates: {e}")))?;
    let times = parse_timestamps(record.get(timestamps).unwrap_or(""))
        .map_err(|e| parse_err(format!("timestamps: {e}")))?;

    debug!(line, points = coords.len(), "Parsed trajectory row");
    TripPath::new(coords, times).map_err(|e| parse_err(e.to_string()))
}

/// Loads both tables through per-table caches keyed on path and policy.
#[derive(Default)]
pub struct FleetLoader {
    records: DatasetCache<(), Vec<TripRecord>>,
    paths: DatasetCache<RowPolicy, Vec<TripPath>>,
}

impl FleetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trip_records(&self, path: &Path) -> Result<Arc<Vec<TripRecord>>> {
        self.records.get_or_load(path, (), load_trip_records)
    }

    pub fn trip_paths(&self, path: &Path, policy: RowPolicy) -> Result<Arc<Vec<TripPath>>> {
        self.paths
            .get_or_load(path, policy, |p| load_trip_paths(p, policy))
    }

    pub fn invalidate(&self, path: &Path) {
        self.records.invalidate(path);
        self.paths.invalidate(path);
    }
}
