//! Chart-ready datasets produced by the aggregators.

use serde::Serialize;

use crate::records::FleetType;

/// One slice of a category chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

/// Category label to row count, ordered by count descending then label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AggregatedCount {
    pub(crate) entries: Vec<CategoryCount>,
}

impl AggregatedCount {
    pub fn get(&self, label: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.count)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryCount> {
        self.entries.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cumulative emission at the end of one `HH:MM` bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionPoint {
    pub bucket: String,
    pub cumulative_kg: f64,
}

/// Running CO₂ total for one fleet partition, ascending by bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeEmissionSeries {
    pub fleet_type: FleetType,
    pub title: String,
    /// Line colour of the partition.
    pub color: String,
    pub points: Vec<EmissionPoint>,
}

impl CumulativeEmissionSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Value at the last bucket: the partition's total emission.
    pub fn total_kg(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.cumulative_kg)
    }

    /// `(bucket, value)` pairs as plotted.
    pub fn pairs(&self) -> Vec<(&str, f64)> {
        self.points
            .iter()
            .map(|p| (p.bucket.as_str(), p.cumulative_kg))
            .collect()
    }
}
