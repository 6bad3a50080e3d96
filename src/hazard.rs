//! Heuristic hazard scoring.
//!
//! Pure functions, no I/O and no hidden state: identical inputs always produce
//! identical outputs. The landslide score is an approximation combining humidity
//! excess, short-term pressure fall and a static elevation bonus; it is not a
//! calibrated slope-stability model.

use crate::models::{AirQualityReading, AqiCategory, HazardAssessment, HazardLabel, WeatherReading};

/// Humidity (%) above which the landslide score starts to grow.
const HUMIDITY_BASELINE: f64 = 60.0;
const HUMIDITY_WEIGHT: f64 = 0.8;
const PRESSURE_DROP_WEIGHT: f64 = 8.0;
const PRESSURE_DROP_CAP: f64 = 30.0;
const ELEVATION_BASE_M: f64 = 500.0;
const ELEVATION_CAP: f64 = 15.0;

/// Landslide heuristic in `[0, 100]`. Absent inputs contribute nothing.
pub fn landslide_score(humidity: Option<f64>, pressure_drop_3h: Option<f64>, elevation_m: f64) -> f64 {
    let mut score = 0.0;

    if let Some(h) = humidity {
        score += (h - HUMIDITY_BASELINE).max(0.0) * HUMIDITY_WEIGHT;
    }
    if let Some(drop) = pressure_drop_3h.filter(|d| *d > 0.0) {
        score += (drop * PRESSURE_DROP_WEIGHT).min(PRESSURE_DROP_CAP);
    }
    score += ((elevation_m - ELEVATION_BASE_M) / 100.0).min(ELEVATION_CAP);

    score.clamp(0.0, 100.0)
}

/// Maps a landslide score to its band; lower bounds are inclusive.
pub fn landslide_label(score: f64) -> HazardLabel {
    if score >= 85.0 {
        HazardLabel::Confirm
    } else if score >= 60.0 {
        HazardLabel::High
    } else if score >= 35.0 {
        HazardLabel::Mid
    } else {
        HazardLabel::No
    }
}

/// Maps an hourly rainfall amount (mm) to its band.
pub fn rainfall_label(mm: f64) -> HazardLabel {
    if mm < 0.2 {
        HazardLabel::No
    } else if mm < 5.0 {
        HazardLabel::Mid
    } else if mm < 20.0 {
        HazardLabel::High
    } else {
        HazardLabel::Confirm
    }
}

/// US EPA PM2.5 breakpoints; upper edges are inclusive.
pub fn aqi_category(pm25: Option<f64>) -> AqiCategory {
    match pm25 {
        None => AqiCategory::Unknown,
        Some(v) if v.is_nan() => AqiCategory::Unknown,
        Some(v) if v <= 12.0 => AqiCategory::Good,
        Some(v) if v <= 35.4 => AqiCategory::Moderate,
        Some(v) if v <= 55.4 => AqiCategory::UnhealthySensitive,
        Some(v) if v <= 150.4 => AqiCategory::Unhealthy,
        Some(v) if v <= 250.4 => AqiCategory::VeryUnhealthy,
        Some(_) => AqiCategory::Hazardous,
    }
}

/// Full assessment for one point.
pub fn assess(
    weather: &WeatherReading,
    air_quality: &AirQualityReading,
    elevation_m: f64,
) -> HazardAssessment {
    let score = landslide_score(weather.humidity, weather.pressure_drop_3h, elevation_m);
    HazardAssessment {
        landslide_score: score,
        landslide_label: landslide_label(score),
        rainfall_label: rainfall_label(weather.precip_now.unwrap_or(0.0)),
        aqi_category: aqi_category(air_quality.pm25),
    }
}
