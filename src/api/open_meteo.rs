//! Provides a client for the Open-Meteo forecast and air-quality APIs.
//!
//! This module defines the `OpenMeteoClient` struct, which fetches the hourly
//! series for one point, aligns them to the current local hour and derives the
//! scalar readings the hazard scorer works on.

use crate::api::EnvironmentalSource;
use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::models::{
    AirQualityReading, AirQualityResponse, ForecastResponse, GeoPoint, HourlyAirQuality,
    HourlyWeather, WeatherReading,
};
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use tracing::{debug, error, warn};

const WEATHER_HOURLY_FIELDS: &str = "temperature_2m,relativehumidity_2m,precipitation,pressure_msl";
const AIR_QUALITY_HOURLY_FIELDS: &str = "pm10,pm2_5,carbon_monoxide,nitrogen_dioxide,ozone";

/// Readings for one point at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct PointReadings {
    pub weather: WeatherReading,
    /// Always present; both values are `None` when the air-quality source failed.
    pub air_quality: AirQualityReading,
}

/// An asynchronous client for the two Open-Meteo endpoints.
pub struct OpenMeteoClient {
    client: Client,
    weather_url: String,
    air_quality_url: String,
    timezone: String,
}

impl OpenMeteoClient {
    /// Creates a new `OpenMeteoClient` from the resolved settings.
    ///
    /// Every request made by this client is bounded by `settings.weather_timeout`.
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder().timeout(settings.weather_timeout).build()?;
        Ok(Self {
            client,
            weather_url: settings.weather_url.clone(),
            air_quality_url: settings.air_quality_url.clone(),
            timezone: settings.timezone.clone(),
        })
    }

    /// Fetches the hourly weather series for a point.
    ///
    /// # Errors
    ///
    /// `SourceUnavailable` on transport failure or timeout, `HttpStatus` on a
    /// non-2xx answer, `MalformedResponse` when the body lacks the hourly series.
    pub async fn fetch_weather_series(&self, point: &GeoPoint) -> Result<HourlyWeather> {
        debug!("Fetching weather series for {}", point.name);
        let body = self
            .get_json_text(
                &self.weather_url,
                point,
                &[
                    ("hourly", WEATHER_HOURLY_FIELDS),
                    ("current_weather", "true"),
                ],
            )
            .await?;

        let parsed: ForecastResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Error parsing weather response for {}: {}", point.name, e);
            AppError::MalformedResponse(format!("weather response for {}: {}", point.name, e))
        })?;
        Ok(parsed.hourly)
    }

    /// Fetches the hourly particulate series for a point.
    pub async fn fetch_air_quality_series(&self, point: &GeoPoint) -> Result<HourlyAirQuality> {
        debug!("Fetching air quality series for {}", point.name);
        let body = self
            .get_json_text(
                &self.air_quality_url,
                point,
                &[("hourly", AIR_QUALITY_HOURLY_FIELDS)],
            )
            .await?;

        let parsed: AirQualityResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::MalformedResponse(format!("air quality response for {}: {}", point.name, e))
        })?;
        Ok(parsed.hourly)
    }

    /// Weather plus air quality for a point, aligned to `now`.
    ///
    /// Only a weather failure is returned as an error; any air-quality failure
    /// degrades to an unavailable reading.
    pub async fn fetch_readings(
        &self,
        point: &GeoPoint,
        now: DateTime<FixedOffset>,
    ) -> Result<PointReadings> {
        let key = hour_key(now);

        let hourly = self.fetch_weather_series(point).await?;
        let index = align_index(&hourly.time, &key);
        let weather = derive_weather(&hourly, index);

        let air_quality = match self.fetch_air_quality_series(point).await {
            Ok(series) => match derive_air_quality(&series, &key) {
                Ok(reading) => reading,
                Err(e) => {
                    warn!("Air quality for {} unusable: {}", point.name, e);
                    AirQualityReading::unavailable()
                },
            },
            Err(e) => {
                warn!("Air quality for {} unavailable: {}", point.name, e);
                AirQualityReading::unavailable()
            },
        };

        Ok(PointReadings {
            weather,
            air_quality,
        })
    }

    async fn get_json_text(
        &self,
        url: &str,
        point: &GeoPoint,
        extra: &[(&str, &str)],
    ) -> Result<String> {
        let mut query: Vec<(&str, String)> = vec![
            ("latitude", point.lat.to_string()),
            ("longitude", point.lon.to_string()),
            ("timezone", self.timezone.clone()),
        ];
        query.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));

        let response = self.client.get(url).query(&query).send().await.map_err(|e| {
            error!("Error requesting {} for {}: {}", url, point.name, e);
            AppError::from(e)
        })?;

        // Non-2xx statuses become AppError::HttpStatus via the From impl.
        let response = response.error_for_status().map_err(|e| {
            error!(
                "Request to {} for {} failed with status {}",
                url,
                point.name,
                e.status().unwrap_or_default()
            );
            AppError::from(e)
        })?;

        Ok(response.text().await?)
    }
}

impl EnvironmentalSource for OpenMeteoClient {
    async fn fetch_point(
        &self,
        point: &GeoPoint,
        now: DateTime<FixedOffset>,
    ) -> Result<PointReadings> {
        self.fetch_readings(point, now).await
    }
}

// --- Time alignment and derivation ---

/// Hour-granularity key in the format of the Open-Meteo `time` axis.
pub fn hour_key(now: DateTime<FixedOffset>) -> String {
    now.format("%Y-%m-%dT%H:00").to_string()
}

/// Position of `key` on the time axis, or 0 when the current hour is not covered.
pub fn align_index(times: &[String], key: &str) -> usize {
    times.iter().position(|t| t == key).unwrap_or_else(|| {
        debug!("Hour {} not found on time axis, falling back to index 0", key);
        0
    })
}

fn value_at(series: &[Option<f64>], index: usize) -> Option<f64> {
    series.get(index).copied().flatten()
}

/// Derives the scalar weather reading at `index`.
pub fn derive_weather(hourly: &HourlyWeather, index: usize) -> WeatherReading {
    let pressure = value_at(&hourly.pressure_msl, index);

    let precip_next_hour = if index + 1 < hourly.precipitation.len() {
        value_at(&hourly.precipitation, index + 1)
    } else {
        Some(0.0)
    };

    let pressure_drop_3h = if index >= 3 {
        value_at(&hourly.pressure_msl, index - 3)
            .zip(pressure)
            .map(|(earlier, current)| earlier - current)
    } else {
        Some(0.0)
    };

    WeatherReading {
        temperature: value_at(&hourly.temperature_2m, index),
        humidity: value_at(&hourly.relativehumidity_2m, index),
        pressure,
        precip_now: value_at(&hourly.precipitation, index),
        precip_next_hour,
        pressure_drop_3h,
    }
}

/// Derives the particulate reading for the hour `key`.
///
/// Unlike the weather series, a missing hour is an error here: stale particulates
/// from another hour would be misleading.
pub fn derive_air_quality(hourly: &HourlyAirQuality, key: &str) -> Result<AirQualityReading> {
    let index = hourly
        .time
        .iter()
        .position(|t| t == key)
        .ok_or_else(|| AppError::MalformedResponse(format!("hour {} not in air quality series", key)))?;

    Ok(AirQualityReading {
        pm25: value_at(&hourly.pm2_5, index),
        pm10: value_at(&hourly.pm10, index),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hours(day: &str, count: usize) -> Vec<String> {
        (0..count).map(|h| format!("{}T{:02}:00", day, h)).collect()
    }

    fn series(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    fn sample_weather() -> HourlyWeather {
        HourlyWeather {
            time: hours("2024-07-14", 6),
            temperature_2m: series(&[14.0, 14.5, 15.0, 15.5, 16.0, 16.5]),
            relativehumidity_2m: series(&[88.0, 89.0, 90.0, 91.0, 92.0, 93.0]),
            precipitation: series(&[0.0, 0.1, 0.4, 2.5, 6.0, 11.0]),
            pressure_msl: series(&[1006.0, 1005.5, 1005.0, 1004.0, 1003.0, 1002.5]),
        }
    }

    #[test]
    fn test_hour_key_uses_local_time() {
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        let utc_evening = chrono::Utc.with_ymd_and_hms(2024, 7, 13, 22, 45, 10).unwrap();
        assert_eq!(hour_key(utc_evening.with_timezone(&ist)), "2024-07-14T04:00");
    }

    #[test]
    fn test_align_index_found_and_missing() {
        let time = hours("2024-07-14", 6);
        assert_eq!(align_index(&time, "2024-07-14T04:00"), 4);
        assert_eq!(align_index(&time, "2024-07-15T04:00"), 0);
        assert_eq!(align_index(&[], "2024-07-14T04:00"), 0);
    }

    #[test]
    fn test_derive_weather_mid_series() {
        let reading = derive_weather(&sample_weather(), 4);
        assert_eq!(reading.temperature, Some(16.0));
        assert_eq!(reading.humidity, Some(92.0));
        assert_eq!(reading.pressure, Some(1003.0));
        assert_eq!(reading.precip_now, Some(6.0));
        assert_eq!(reading.precip_next_hour, Some(11.0));
        // pressure[1] - pressure[4]
        assert_eq!(reading.pressure_drop_3h, Some(2.5));
    }

    #[test]
    fn test_derive_weather_edges() {
        let hourly = sample_weather();

        let first = derive_weather(&hourly, 0);
        assert_eq!(first.pressure_drop_3h, Some(0.0));
        assert_eq!(first.precip_next_hour, Some(0.1));

        let third = derive_weather(&hourly, 2);
        assert_eq!(third.pressure_drop_3h, Some(0.0));

        let last = derive_weather(&hourly, 5);
        assert_eq!(last.precip_next_hour, Some(0.0));
        assert_eq!(last.pressure_drop_3h, Some(2.5));

        let beyond = derive_weather(&hourly, 40);
        assert_eq!(beyond.temperature, None);
        assert_eq!(beyond.humidity, None);
        assert_eq!(beyond.precip_now, None);
        assert_eq!(beyond.precip_next_hour, Some(0.0));
        assert_eq!(beyond.pressure_drop_3h, None);
    }

    #[test]
    fn test_derive_weather_null_values() {
        let mut hourly = sample_weather();
        hourly.relativehumidity_2m[3] = None;
        hourly.pressure_msl[0] = None;
        hourly.precipitation[4] = None;

        let reading = derive_weather(&hourly, 3);
        assert_eq!(reading.humidity, None);
        assert_eq!(reading.pressure_drop_3h, None);
        assert_eq!(reading.precip_next_hour, None);
        assert_eq!(reading.precip_now, Some(2.5));
    }

    #[test]
    fn test_derive_air_quality() {
        let hourly = HourlyAirQuality {
            time: hours("2024-07-14", 3),
            pm10: vec![Some(30.0), Some(42.0), None],
            pm2_5: vec![Some(11.0), Some(18.5), Some(20.0)],
        };
        let reading = derive_air_quality(&hourly, "2024-07-14T01:00").unwrap();
        assert_eq!(reading.pm25, Some(18.5));
        assert_eq!(reading.pm10, Some(42.0));

        let partial = derive_air_quality(&hourly, "2024-07-14T02:00").unwrap();
        assert_eq!(partial.pm10, None);

        let missing = derive_air_quality(&hourly, "2024-07-15T01:00");
        assert!(matches!(missing, Err(AppError::MalformedResponse(_))));
    }
}
