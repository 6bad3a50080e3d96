//! Domain types shared by the fetch, scoring and presentation layers.
//!
//! Includes structs for:
//! - The monitored points (`GeoPoint`).
//! - Per-point readings derived from the hourly series (`WeatherReading`, `AirQualityReading`).
//! - The river level proxy (`RiverLevelReading`).
//! - Hazard labels and the per-tick aggregate (`HazardAssessment`, `PointSnapshot`, `AggregateSnapshot`).

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::fmt;

/// A named geographic point. The name is the identity key within a registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(name: &str, lat: f64, lon: f64) -> Self {
        Self {
            name: name.to_string(),
            lat,
            lon,
        }
    }
}

/// Scalar weather values for the current hour of one point.
///
/// Every field is `None` when the source series does not reach the needed index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherReading {
    /// Air temperature at 2 m, °C.
    pub temperature: Option<f64>,
    /// Relative humidity at 2 m, %.
    pub humidity: Option<f64>,
    /// Mean sea level pressure, hPa.
    pub pressure: Option<f64>,
    /// Precipitation in the current hour, mm.
    pub precip_now: Option<f64>,
    /// Precipitation in the following hour, mm (0 past the end of the series).
    pub precip_next_hour: Option<f64>,
    /// Pressure three hours ago minus pressure now, hPa (0 when fewer than three hours precede).
    pub pressure_drop_3h: Option<f64>,
}

/// Particulate readings for the current hour of one point, µg/m³.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AirQualityReading {
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
}

impl AirQualityReading {
    /// The reading used when the air-quality source fails in any way.
    pub fn unavailable() -> Self {
        Self::default()
    }
}

/// Severity band of the river level proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiverStatus {
    Normal,
    High,
    Low,
    FloodWarning,
    SeeExternalSource,
    NoData,
}

impl fmt::Display for RiverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiverStatus::Normal => "NORMAL",
            RiverStatus::High => "HIGH",
            RiverStatus::Low => "LOW",
            RiverStatus::FloodWarning => "FLOOD WARNING",
            RiverStatus::SeeExternalSource => "SEE EXTERNAL SOURCE",
            RiverStatus::NoData => "NO DATA",
        };
        f.write_str(s)
    }
}

/// One best-effort river level reading, produced once per tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiverLevelReading {
    pub value: Option<f64>,
    pub unit_label: Option<String>,
    pub status: RiverStatus,
}

impl RiverLevelReading {
    pub fn no_data() -> Self {
        Self {
            value: None,
            unit_label: None,
            status: RiverStatus::NoData,
        }
    }

    /// One-line text for the presentation layer's river box.
    pub fn summary(&self) -> String {
        match (self.status, self.value) {
            (RiverStatus::SeeExternalSource, _) => {
                "Advisory mentions found (see external source)".to_string()
            },
            (RiverStatus::NoData, _) => "No public river data".to_string(),
            (status, None) => format!("No numeric data ({})", status),
            (status, Some(value)) => format!(
                "{} {} - {}",
                value,
                self.unit_label.as_deref().unwrap_or(""),
                status
            ),
        }
    }
}

/// Discrete hazard label shared by the landslide and rainfall scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HazardLabel {
    #[default]
    No,
    Mid,
    High,
    Confirm,
}

impl fmt::Display for HazardLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HazardLabel::No => "no",
            HazardLabel::Mid => "mid",
            HazardLabel::High => "high",
            HazardLabel::Confirm => "confirm 99%",
        };
        f.write_str(s)
    }
}

/// PM2.5-based air quality category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
    #[default]
    Unknown,
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
            AqiCategory::Unknown => "N/A",
        };
        f.write_str(s)
    }
}

/// Heuristic hazard state of one point. `Default` is the neutral state
/// (score 0, no landslide, no rain, unknown air quality).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HazardAssessment {
    /// Unitless landslide heuristic in `[0, 100]`.
    pub landslide_score: f64,
    pub landslide_label: HazardLabel,
    pub rainfall_label: HazardLabel,
    pub aqi_category: AqiCategory,
}

/// Everything known about one point for one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointSnapshot {
    pub point: GeoPoint,
    pub weather: Option<WeatherReading>,
    pub air_quality: Option<AirQualityReading>,
    pub hazard: HazardAssessment,
    pub error: Option<String>,
}

impl PointSnapshot {
    /// Placeholder entry for a point whose weather could not be obtained.
    pub fn failed(point: GeoPoint, error: String) -> Self {
        Self {
            point,
            weather: None,
            air_quality: None,
            hazard: HazardAssessment::default(),
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Current-hour precipitation, 0 when unknown.
    pub fn precip_now(&self) -> f64 {
        self.weather
            .as_ref()
            .and_then(|w| w.precip_now)
            .unwrap_or(0.0)
    }
}

/// The complete result of one tick. Built whole, then published; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSnapshot {
    pub timestamp: DateTime<FixedOffset>,
    /// One entry per registry point, in registry order.
    pub points: Vec<PointSnapshot>,
    pub river: RiverLevelReading,
}

impl AggregateSnapshot {
    /// Human-readable "last updated" label.
    pub fn updated_label(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M").to_string()
    }

    pub fn failed_points(&self) -> usize {
        self.points.iter().filter(|p| p.is_failed()).count()
    }
}
