//! Strict cell parsers for the source tables.
//!
//! Serialized trajectory cells are JSON lists; anything that is not exactly
//! a list of `[lon, lat]` pairs or a list of integers is rejected.

use chrono::{DateTime, NaiveDateTime};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Coerces the mixed boolean encodings of the `eletrico` column.
///
/// The mapping is total over `0`, `1`, `0.0`, `1.0`, `true`, `false` (any
/// case); everything else is `None`.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(true),
        "0" | "0.0" | "false" => Some(false),
        _ => None,
    }
}

/// Parses an ISO-8601 timestamp, keeping the wall-clock time of any offset.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Parses a CO₂ emission in kilograms. Must be finite and non-negative.
pub fn parse_emission(raw: &str) -> Result<f64, &'static str> {
    let value: f64 = raw.trim().parse().map_err(|_| "not a number")?;
    if !value.is_finite() {
        return Err("not finite");
    }
    if value < 0.0 {
        return Err("negative emission");
    }
    Ok(value)
}

/// Decodes a serialized `[[lon, lat], ...]` cell.
pub fn parse_coordinates(raw: &str) -> serde_json::Result<Vec<[f64; 2]>> {
    serde_json::from_str(raw.trim())
}

/// Decodes a serialized `[t0, t1, ...]` cell of integer timestamps.
pub fn parse_timestamps(raw: &str) -> serde_json::Result<Vec<i64>> {
    serde_json::from_str(raw.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_flag_accepts_all_encodings() {
        for raw in ["1", "1.0", "true", "True", "TRUE", " 1 "] {
            assert_eq!(parse_flag(raw), Some(true), "{raw}");
        }
        for raw in ["0", "0.0", "false", "False", "FALSE"] {
            assert_eq!(parse_flag(raw), Some(false), "{raw}");
        }
    }

    #[test]
    fn test_parse_flag_rejects_other_values() {
        assert_eq!(parse_flag(""), None);
        assert_eq!(parse_flag("2"), None);
        assert_eq!(parse_flag("yes"), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let t = parse_timestamp("2024-05-01 10:07:59").unwrap();
        assert_eq!((t.hour(), t.minute()), (10, 7));

        let t = parse_timestamp("2024-05-01T23:59:00.250").unwrap();
        assert_eq!((t.hour(), t.minute()), (23, 59));

        let t = parse_timestamp("2024-05-01 08:30").unwrap();
        assert_eq!((t.hour(), t.minute()), (8, 30));
    }

    #[test]
    fn test_parse_timestamp_keeps_local_wall_clock() {
        let t = parse_timestamp("2024-05-01T10:15:00-03:00").unwrap();
        assert_eq!((t.hour(), t.minute()), (10, 15));
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        assert!(parse_timestamp("10:00").is_none());
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn test_parse_emission() {
        assert_eq!(parse_emission("1.25"), Ok(1.25));
        assert_eq!(parse_emission("0"), Ok(0.0));
        assert!(parse_emission("-0.5").is_err());
        assert!(parse_emission("NaN").is_err());
        assert!(parse_emission("abc").is_err());
    }

    #[test]
    fn test_parse_coordinates() {
        let coords = parse_coordinates("[[-46.63, -23.55], [-46.64, -23.56]]").unwrap();
        assert_eq!(coords, vec![[-46.63, -23.55], [-46.64, -23.56]]);
    }

    #[test]
    fn test_parse_coordinates_rejects_non_pairs() {
        assert!(parse_coordinates("[[1.0, 2.0, 3.0]]").is_err());
        assert!(parse_coordinates("[(1.0, 2.0)]").is_err());
        assert!(parse_coordinates("__import__('os')").is_err());
    }

    #[test]
    fn test_parse_timestamps_rejects_floats() {
        assert_eq!(parse_timestamps("[0, 60, 120]").unwrap(), vec![0, 60, 120]);
        assert!(parse_timestamps("[0.5]").is_err());
        assert!(parse_timestamps("[0, 60").is_err());
    }
}
