//! The fixed, ordered set of monitored points.
//!
//! A registry is an immutable value built once at start-up and handed to the
//! aggregator, so tests can swap in a different point set without shared state.

use crate::error::{AppError, Result};
use crate::models::GeoPoint;
use std::collections::HashSet;

/// Default monitored points around Darjeeling: (name, latitude, longitude).
pub const DARJEELING_POINTS: [(&str, f64, f64); 14] = [
    ("Chowrasta / Mall", 27.0359, 88.2626),
    ("Ghoom", 27.0470, 88.2632),
    ("Lebong", 27.0161, 88.2536),
    ("Sonada", 26.9607, 88.2960),
    ("Jorebungalow", 27.0260, 88.2714),
    ("Teesta Bazaar", 27.1919, 88.5168),
    ("Tiger Hill", 27.0195, 88.2430),
    ("Kurseong", 26.8820, 88.2774),
    ("Happy Valley", 27.0448, 88.2792),
    ("North Point", 27.0613, 88.2715),
    ("Darjeeling Zoo", 27.0423, 88.2767),
    ("Cart Road Area", 27.0300, 88.2800),
    ("Glenary's / Observatory", 27.0350, 88.2640),
    ("Batasia Loop", 27.0465, 88.2588),
];

/// Ordered collection of points, unique by name.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPointRegistry {
    points: Vec<GeoPoint>,
}

impl GeoPointRegistry {
    /// Builds a registry, keeping the given order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if two points share a name, a name is blank,
    /// or a coordinate is outside the valid latitude/longitude range.
    pub fn new(points: Vec<GeoPoint>) -> Result<Self> {
        let mut seen = HashSet::new();
        for point in &points {
            if point.name.trim().is_empty() {
                return Err(AppError::Config("point name must not be empty".to_string()));
            }
            if !seen.insert(point.name.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate point name: {}",
                    point.name
                )));
            }
            if !(-90.0..=90.0).contains(&point.lat) || !(-180.0..=180.0).contains(&point.lon) {
                return Err(AppError::Config(format!(
                    "coordinates out of range for {}: ({}, {})",
                    point.name, point.lat, point.lon
                )));
            }
        }
        Ok(Self { points })
    }

    /// The built-in Darjeeling point set, validated like any other registry.
    pub fn darjeeling() -> Result<Self> {
        Self::new(
            DARJEELING_POINTS
                .iter()
                .map(|(name, lat, lon)| GeoPoint::new(name, *lat, *lon))
                .collect(),
        )
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
