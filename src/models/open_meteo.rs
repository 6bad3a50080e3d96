//! Deserialization targets for the remote sources.
//!
//! The Open-Meteo forecast and air-quality endpoints both answer with an `hourly`
//! object: a `time` axis of hour-granularity local timestamps plus parallel value
//! arrays. Values inside the arrays may be `null`, hence `Vec<Option<f64>>`.
//! Missing arrays are a deserialization failure, i.e. a malformed response.

use serde::{Deserialize, Serialize};

// --- Open-Meteo forecast ---

/// Response of the `/v1/forecast` endpoint, reduced to the fields we use.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ForecastResponse {
    pub hourly: HourlyWeather,
}

/// Hourly weather series for one point.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HourlyWeather {
    /// Local hour keys, e.g. `2024-07-14T09:00`.
    pub time: Vec<String>,
    pub temperature_2m: Vec<Option<f64>>,
    pub relativehumidity_2m: Vec<Option<f64>>,
    pub precipitation: Vec<Option<f64>>,
    pub pressure_msl: Vec<Option<f64>>,
}

// --- Open-Meteo air quality ---

/// Response of the `/v1/air-quality` endpoint, reduced to the fields we use.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AirQualityResponse {
    pub hourly: HourlyAirQuality,
}

/// Hourly particulate series for one point. Gas series are requested but unused.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HourlyAirQuality {
    pub time: Vec<String>,
    pub pm10: Vec<Option<f64>>,
    pub pm2_5: Vec<Option<f64>>,
}

// --- River sensor feed (ThingSpeak channel format) ---

/// Response of a ThingSpeak `feeds.json?results=1` query.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ChannelFeedResponse {
    #[serde(default)]
    pub feeds: Vec<ChannelFeed>,
}

/// A single channel entry.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChannelFeed {
    pub created_at: Option<String>,
    pub field1: Option<FieldValue>,
}

/// ThingSpeak serializes field values as strings, but other feeds in the same
/// format send plain JSON numbers.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            FieldValue::Text(raw) => raw.trim().parse::<f64>().ok(),
        }
    }
}

impl ChannelFeedResponse {
    /// The numeric value of `field1` in the most recent entry, if there is one.
    pub fn latest_value(&self) -> Option<f64> {
        self.feeds
            .first()
            .and_then(|feed| feed.field1.as_ref())
            .and_then(FieldValue::as_f64)
            .filter(|value| value.is_finite())
    }
}
