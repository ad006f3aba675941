use std::collections::HashMap;

use crate::analyzers::types::{AggregatedCount, CategoryCount};
use crate::records::{FleetType, TripRecord};

/// Counts rows per label, ordered by count descending then label ascending.
pub fn count_by<'a, I, F>(rows: I, label: F) -> AggregatedCount
where
    I: IntoIterator<Item = &'a TripRecord>,
    F: Fn(&TripRecord) -> &str,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        *counts.entry(label(row)).or_default() += 1;
    }

    let mut entries: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(label, count)| CategoryCount {
            label: label.to_string(),
            count,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));

    AggregatedCount { entries }
}

/// Electric vs. non-electric distribution over all rows.
pub fn count_fleet_types(rows: &[TripRecord]) -> AggregatedCount {
    count_by(rows, |r| r.fleet_type().label())
}

/// Model distribution among electric rows only.
pub fn count_electric_models(rows: &[TripRecord]) -> AggregatedCount {
    count_by(
        rows.iter().filter(|r| r.is_electric),
        |r| r.model.as_str(),
    )
}

/// Rows of one fleet partition.
pub fn partition(rows: &[TripRecord], fleet_type: FleetType) -> impl Iterator<Item = &TripRecord> {
    rows.iter().filter(move |r| r.fleet_type() == fleet_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_flag, parse_timestamp};

    fn record(flag: &str, model: &str) -> TripRecord {
        TripRecord {
            bus_id: "1".to_string(),
            is_electric: parse_flag(flag).unwrap(),
            model: model.to_string(),
            start_timestamp: parse_timestamp("2024-05-01 10:00:00").unwrap(),
            co2_emission: 0.0,
        }
    }

    #[test]
    fn test_fleet_type_labels_for_every_encoding() {
        let rows: Vec<_> = ["0", "1", "false", "true", "False", "True"]
            .iter()
            .map(|f| record(f, "A"))
            .collect();
        let counts = count_fleet_types(&rows);

        assert_eq!(counts.len(), 2);
        assert_eq!(counts.get("Electric"), Some(3));
        assert_eq!(counts.get("Non-electric"), Some(3));
        assert!(
            counts
                .labels()
                .all(|l| l == "Electric" || l == "Non-electric")
        );
    }

    #[test]
    fn test_electric_models_ignore_non_electric_rows() {
        let rows = vec![
            record("1", "BYD D9W"),
            record("1", "Eletra"),
            record("1", "BYD D9W"),
            record("0", "Mercedes O500"),
        ];
        let counts = count_electric_models(&rows);

        assert_eq!(counts.total(), 3);
        assert_eq!(counts.get("Mercedes O500"), None);
        let order: Vec<_> = counts.labels().collect();
        assert_eq!(order, vec!["BYD D9W", "Eletra"]);
    }

    #[test]
    fn test_ties_are_ordered_by_label() {
        let rows = vec![record("1", "Z"), record("1", "A")];
        let order: Vec<_> = count_electric_models(&rows)
            .labels()
            .map(str::to_string)
            .collect();
        assert_eq!(order, vec!["A", "Z"]);
    }

    #[test]
    fn test_empty_partitions() {
        let rows = vec![record("0", "B")];
        assert!(count_electric_models(&rows).is_empty());
        assert!(count_fleet_types(&[]).is_empty());
        assert_eq!(count_fleet_types(&rows).get("Electric"), None);
    }

    #[test]
    fn test_partition() {
        let rows = vec![record("1", "A"), record("0", "B"), record("1", "C")];
        assert_eq!(partition(&rows, FleetType::Electric).count(), 2);
        assert_eq!(partition(&rows, FleetType::NonElectric).count(), 1);
    }
}
