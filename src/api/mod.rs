//! Provides clients for the external data sources.
//!
//! Includes:
//! - `open_meteo`: hourly weather and air quality per point.
//! - `river`: the river level fallback chain.
//!
//! The traits below are the seams the pipeline is generic over, so tests can
//! substitute canned sources for the HTTP clients.

mod open_meteo;
mod river;


pub use open_meteo::*;
pub use river::*;

use crate::error::Result;
use crate::models::{GeoPoint, RiverLevelReading};
use chrono::{DateTime, FixedOffset};
use std::future::Future;

/// Per-point environmental readings.
pub trait EnvironmentalSource: Send + Sync {
    /// Weather and air quality for `point`, aligned to `now`.
    ///
    /// An error means the weather part failed; air-quality failures are absorbed.
    fn fetch_point(
        &self,
        point: &GeoPoint,
        now: DateTime<FixedOffset>,
    ) -> impl Future<Output = Result<PointReadings>> + Send;
}

/// The single river level reading of a tick.
pub trait RiverSource: Send + Sync {
    fn probe(&self) -> impl Future<Output = RiverLevelReading> + Send;
}
