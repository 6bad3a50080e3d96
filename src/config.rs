//! Runtime settings, read from the environment (optionally seeded from a `.env` file).
//!
//! Only endpoints, the local timezone, the river name and the log directory can be
//! overridden; the refresh cadence and timeouts are fixed constants.

use crate::error::{AppError, Result};
use chrono::{DateTime, FixedOffset, Utc};
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_AIR_QUALITY_URL: &str = "https://air-quality-api.open-meteo.com/v1/air-quality";
pub const DEFAULT_RIVER_FEED_URL: &str =
    "https://api.thingspeak.com/channels/1231845/feeds.json?results=1";
pub const DEFAULT_RIVER_ADVISORY_URL: &str = "https://ffs.india-water.gov.in/";
pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";
/// IST, UTC+05:30. The zone has no daylight saving, so a fixed offset is exact.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;
pub const DEFAULT_RIVER_NAME: &str = "Teesta";

/// Time between tick starts.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(3 * 60);
pub const WEATHER_TIMEOUT: Duration = Duration::from_secs(10);
pub const RIVER_TIMEOUT: Duration = Duration::from_secs(8);
/// Static elevation fed to the landslide heuristic, metres.
pub const DEFAULT_ELEVATION_M: f64 = 2000.0;

/// Resolved application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub weather_url: String,
    pub air_quality_url: String,
    pub river_feed_url: String,
    pub river_advisory_url: String,
    /// Timezone name passed to the weather APIs.
    pub timezone: String,
    /// Offset used to compute the local "now" matching `timezone`.
    pub utc_offset: FixedOffset,
    pub river_name: String,
    pub elevation_m: f64,
    pub refresh_interval: Duration,
    pub weather_timeout: Duration,
    pub river_timeout: Duration,
    pub log_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            air_quality_url: DEFAULT_AIR_QUALITY_URL.to_string(),
            river_feed_url: DEFAULT_RIVER_FEED_URL.to_string(),
            river_advisory_url: DEFAULT_RIVER_ADVISORY_URL.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            utc_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60)
                .expect("default UTC offset is within ±24h"),
            river_name: DEFAULT_RIVER_NAME.to_string(),
            elevation_m: DEFAULT_ELEVATION_M,
            refresh_interval: REFRESH_INTERVAL,
            weather_timeout: WEATHER_TIMEOUT,
            river_timeout: RIVER_TIMEOUT,
            log_dir: None,
        }
    }
}

impl Settings {
    /// Builds settings from `HAZARD_*` environment variables, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HAZARD_UTC_OFFSET_MINUTES` is not an integer
    /// or lies outside ±18 hours, or if the river name is blank. Returns
    /// `AppError::Env` if a set variable is not valid Unicode.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let utc_offset = match optional_var("HAZARD_UTC_OFFSET_MINUTES")? {
            Some(raw) => parse_offset_minutes(&raw)?,
            None => defaults.utc_offset,
        };

        let river_name = var_or("HAZARD_RIVER_NAME", &defaults.river_name)?;
        if river_name.trim().is_empty() {
            return Err(AppError::Config(
                "HAZARD_RIVER_NAME must not be empty".to_string(),
            ));
        }

        let settings = Self {
            weather_url: var_or("HAZARD_WEATHER_URL", &defaults.weather_url)?,
            air_quality_url: var_or("HAZARD_AIR_QUALITY_URL", &defaults.air_quality_url)?,
            river_feed_url: var_or("HAZARD_RIVER_FEED_URL", &defaults.river_feed_url)?,
            river_advisory_url: var_or("HAZARD_RIVER_ADVISORY_URL", &defaults.river_advisory_url)?,
            timezone: var_or("HAZARD_TIMEZONE", &defaults.timezone)?,
            utc_offset,
            river_name: river_name.trim().to_string(),
            log_dir: optional_var("HAZARD_LOG_DIR")?.filter(|d| !d.is_empty()),
            ..defaults
        };
        debug!("Resolved settings: {:?}", settings);
        Ok(settings)
    }

    /// Current time in the configured local zone.
    pub fn local_now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.utc_offset)
    }
}

/// `None` when the variable is unset; a non-Unicode value is an error, not a default.
fn optional_var(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => {
            warn!("{} is set but unreadable: {}", key, e);
            Err(e.into())
        },
    }
}

fn var_or(key: &str, default: &str) -> Result<String> {
    Ok(optional_var(key)?.unwrap_or_else(|| default.to_string()))
}

fn parse_offset_minutes(raw: &str) -> Result<FixedOffset> {
    let minutes: i32 = raw.trim().parse().map_err(|_| {
        AppError::Config(format!(
            "HAZARD_UTC_OFFSET_MINUTES must be an integer, got '{}'",
            raw
        ))
    })?;
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            AppError::Config(format!(
                "HAZARD_UTC_OFFSET_MINUTES out of range: {}",
                minutes
            ))
        })
}
