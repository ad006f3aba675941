//! Fleet data aggregation.
//!
//! Turns the trip-record table into the category counts and cumulative
//! emission series the dashboard charts plot.

pub mod aggregate;
pub mod emissions;
pub mod types;
pub mod utility;
