//! Row types of the two source tables.

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

/// Electric / non-electric partition of the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FleetType {
    Electric,
    NonElectric,
}

impl FleetType {
    pub const ALL: [FleetType; 2] = [FleetType::Electric, FleetType::NonElectric];

    pub fn from_flag(is_electric: bool) -> Self {
        if is_electric {
            FleetType::Electric
        } else {
            FleetType::NonElectric
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FleetType::Electric => "Electric",
            FleetType::NonElectric => "Non-electric",
        }
    }

    /// Chart colour the dashboard uses for this partition.
    pub fn color(self) -> &'static str {
        match self {
            FleetType::Electric => "#99d594",
            FleetType::NonElectric => "#d53e4f",
        }
    }
}

/// One bus activity sample from the `df_final` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripRecord {
    pub bus_id: String,
    pub is_electric: bool,
    pub model: String,
    pub start_timestamp: NaiveDateTime,
    /// Kilograms, never negative.
    pub co2_emission: f64,
}

impl TripRecord {
    pub fn fleet_type(&self) -> FleetType {
        FleetType::from_flag(self.is_electric)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidPath {
    #[error("{coordinates} coordinates but {timestamps} timestamps")]
    LengthMismatch { coordinates: usize, timestamps: usize },

    #[error("timestamp at index {index} is smaller than the previous one")]
    DecreasingTimestamp { index: usize },

    #[error("coordinate at index {index} is outside lon/lat range")]
    CoordinateOutOfRange { index: usize },
}

/// A vehicle trajectory: parallel `[lon, lat]` and timestamp sequences.
///
/// Construction checks the invariants, so a `TripPath` in hand always has
/// one timestamp per coordinate and a non-decreasing clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripPath {
    coordinates: Vec<[f64; 2]>,
    timestamps: Vec<i64>,
}

impl TripPath {
    pub fn new(coordinates: Vec<[f64; 2]>, timestamps: Vec<i64>) -> Result<Self, InvalidPath> {
        if coordinates.len() != timestamps.len() {
            return Err(InvalidPath::LengthMismatch {
                coordinates: coordinates.len(),
                timestamps: timestamps.len(),
            });
        }

        if let Some(index) = timestamps.windows(2).position(|w| w[1] < w[0]) {
            return Err(InvalidPath::DecreasingTimestamp { index: index + 1 });
        }

        if let Some(index) = coordinates.iter().position(|[lon, lat]| {
            !(-180.0..=180.0).contains(lon) || !(-90.0..=90.0).contains(lat)
        }) {
            return Err(InvalidPath::CoordinateOutOfRange { index });
        }

        Ok(Self {
            coordinates,
            timestamps,
        })
    }

    pub fn coordinates(&self) -> &[[f64; 2]] {
        &self.coordinates
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.timestamps.last().copied()
    }
}
