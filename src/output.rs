//! Output formatting and persistence for fleet statistics.
//!
//! Supports pretty-printing, JSON serialization, CSV export of the chart
//! datasets, CSV append of history snapshots, and a JSON-lines frame sink.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::analyzers::types::{AggregatedCount, CumulativeEmissionSeries};
use crate::analyzers::utility::round_to;
use crate::animation::{FrameSink, RenderInstruction};
use crate::error::Result;
use crate::records::FleetType;
use crate::stats::FleetStats;

/// Logs fleet statistics using Rust's debug pretty-print format.
pub fn print_pretty(stats: &FleetStats) {
    info!("{:#?}", stats);
}

/// Logs fleet statistics as pretty-printed JSON.
pub fn print_json(stats: &FleetStats) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}

#[derive(Serialize)]
struct SeriesRow<'a> {
    bucket: &'a str,
    cumulative_kg: f64,
    label: f64,
}

const COUNT_HEADER: [&str; 2] = ["label", "count"];
const SERIES_HEADER: [&str; 3] = ["bucket", "cumulative_kg", "label"];

/// Writes `rows` to a fresh CSV file. The header is written up front so an
/// empty dataset still produces a typed file.
fn write_rows<T: Serialize>(
    path: &Path,
    header: &[&str],
    rows: impl IntoIterator<Item = T>,
) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_counts(path: &Path, counts: &AggregatedCount) -> Result<()> {
    write_rows(path, &COUNT_HEADER, counts.iter())
}

pub fn write_series(path: &Path, series: &CumulativeEmissionSeries) -> Result<()> {
    write_rows(
        path,
        &SERIES_HEADER,
        series.points.iter().map(|p| SeriesRow {
            bucket: &p.bucket,
            cumulative_kg: p.cumulative_kg,
            label: round_to(p.cumulative_kg, 4),
        }),
    )
}

/// Exports every chart dataset of `stats` into `dir`.
pub fn export_all(dir: &Path, stats: &FleetStats) -> Result<()> {
    fs::create_dir_all(dir)?;

    write_counts(&dir.join("fleet_types.csv"), &stats.fleet_types)?;
    write_counts(&dir.join("electric_models.csv"), &stats.electric_models)?;
    write_series(
        &dir.join("emissions_electric.csv"),
        stats.emissions(FleetType::Electric),
    )?;
    write_series(
        &dir.join("emissions_non_electric.csv"),
        stats.emissions(FleetType::NonElectric),
    )?;

    let report = File::create(dir.join("fleet_stats.json"))?;
    serde_json::to_writer_pretty(report, stats)?;

    info!(dir = %dir.display(), "Exported chart datasets");
    Ok(())
}

/// One history row written by `watch` whenever the dataset changes.
#[derive(Debug, Serialize)]
pub struct FleetSnapshot {
    pub timestamp: DateTime<Utc>,
    pub total_records: usize,
    pub electric: usize,
    pub electric_pct: f64,
    pub electric_co2_kg: f64,
    pub non_electric_co2_kg: f64,
}

impl From<&FleetStats> for FleetSnapshot {
    fn from(stats: &FleetStats) -> Self {
        FleetSnapshot {
            timestamp: stats.generated_at,
            total_records: stats.total_records,
            electric: stats.electric_count(),
            electric_pct: stats.electric_pct(),
            electric_co2_kg: stats.electric_emissions.total_kg(),
            non_electric_co2_kg: stats.non_electric_emissions.total_kg(),
        }
    }
}

/// Appends a [`FleetSnapshot`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_snapshot(path: &str, snapshot: &FleetSnapshot) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    writer.serialize(snapshot)?;
    writer.flush()?;

    Ok(())
}

/// Streams frames as one JSON object per line.
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FrameSink for JsonLinesSink<W> {
    async fn render(&mut self, frame: RenderInstruction) -> Result<()> {
        let mut line = serde_json::to_vec(&frame)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_timestamp;
    use crate::records::TripRecord;
    use std::env;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn sample_stats() -> FleetStats {
        let rows: Vec<_> = [(true, "A", 1.0), (true, "B", 2.5), (false, "C", 4.0)]
            .into_iter()
            .map(|(is_electric, model, co2)| TripRecord {
                bus_id: model.to_string(),
                is_electric,
                model: model.to_string(),
                start_timestamp: parse_timestamp("2024-05-01 10:00:00").unwrap(),
                co2_emission: co2,
            })
            .collect();
        FleetStats::from_records(&rows)
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&sample_stats());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&FleetStats::from_records(&[])).unwrap();
    }

    #[test]
    fn test_export_all_writes_every_dataset() {
        let dir = env::temp_dir().join("ebus_fleet_test_export");
        let _ = fs::remove_dir_all(&dir);

        export_all(&dir, &sample_stats()).unwrap();

        let types = fs::read_to_string(dir.join("fleet_types.csv")).unwrap();
        assert_eq!(types.lines().next(), Some("label,count"));
        assert!(types.contains("Electric,2"));

        let series = fs::read_to_string(dir.join("emissions_electric.csv")).unwrap();
        let lines: Vec<_> = series.lines().collect();
        assert_eq!(lines, vec!["bucket,cumulative_kg,label", "10:00,3.5,3.5"]);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("fleet_stats.json")).unwrap())
                .unwrap();
        assert_eq!(json["total_records"], 3);
        assert_eq!(json["fleet_types"][0]["label"], "Electric");
        assert_eq!(json["fleet_colors"]["Electric"], "#99d594");
        assert_eq!(json["fleet_colors"]["Non-electric"], "#d53e4f");
        assert_eq!(json["electric_emissions"]["color"], "#99d594");
        assert_eq!(json["non_electric_emissions"]["color"], "#d53e4f");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_series_empty() {
        let path = temp_path("ebus_fleet_test_empty_series.csv");
        let stats = FleetStats::from_records(&[]);

        write_series(Path::new(&path), &stats.electric_emissions).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().collect::<Vec<_>>(), vec!["bucket,cumulative_kg,label"]);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_counts_empty() {
        let path = temp_path("ebus_fleet_test_empty_counts.csv");
        let stats = FleetStats::from_records(&[]);

        write_counts(Path::new(&path), &stats.electric_models).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().collect::<Vec<_>>(), vec!["label,count"]);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_snapshot_writes_header_once() {
        let path = temp_path("ebus_fleet_test_history.csv");
        let _ = fs::remove_file(&path);

        let snapshot = FleetSnapshot::from(&sample_stats());
        append_snapshot(&path, &snapshot).unwrap();
        append_snapshot(&path, &snapshot).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("timestamp")).count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_json_lines_sink() {
        let mut sink = JsonLinesSink::new(Vec::new());
        for t in [0, 60] {
            sink.render(RenderInstruction {
                current_time: t,
                trail_length: 120,
                trajectories: vec![],
            })
            .await
            .unwrap();
        }

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            r#"{"current_time":60,"trail_length":120,"trajectories":[]}"#
        );
    }
}
