//! Best-effort river level acquisition.
//!
//! There is no reliable public feed for the river, so the probe walks an ordered
//! fallback chain: a numeric sensor channel, then a public advisory page, then
//! "no data". Each step is time-boxed and returns its own `Result`; a failed step
//! only moves the chain along.

use crate::api::RiverSource;
use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::models::{ChannelFeedResponse, RiverLevelReading, RiverStatus};
use reqwest::Client;
use tracing::{debug, info, warn};

const PRIMARY_UNIT: &str = "cm";
const ADVISORY_UNIT: &str = "advisory mention";

/// Classifies a river level in centimetres.
pub fn classify_river_level(value: f64) -> RiverStatus {
    if value > 400.0 {
        RiverStatus::FloodWarning
    } else if value > 300.0 {
        RiverStatus::High
    } else if value < 100.0 {
        RiverStatus::Low
    } else {
        RiverStatus::Normal
    }
}

/// Walks the river level fallback chain against configured endpoints.
pub struct RiverLevelProbe {
    client: Client,
    feed_url: String,
    advisory_url: String,
    river_name: String,
}

impl RiverLevelProbe {
    /// Creates a probe whose requests are each bounded by `settings.river_timeout`.
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder().timeout(settings.river_timeout).build()?;
        Ok(Self {
            client,
            feed_url: settings.river_feed_url.clone(),
            advisory_url: settings.river_advisory_url.clone(),
            river_name: settings.river_name.clone(),
        })
    }

    /// Step 1: the most recent numeric value of the sensor channel.
    ///
    /// # Errors
    ///
    /// Transport/status errors as usual; `MalformedResponse` when the channel
    /// has no entries or the latest entry carries no numeric value.
    pub async fn fetch_primary(&self) -> Result<f64> {
        let response = self
            .client
            .get(&self.feed_url)
            .send()
            .await?
            .error_for_status()?;
        let feed: ChannelFeedResponse = serde_json::from_str(&response.text().await?)?;
        feed.latest_value().ok_or_else(|| {
            AppError::MalformedResponse("river feed has no numeric latest value".to_string())
        })
    }

    /// Step 2: whether the advisory page mentions the river (case-insensitive).
    pub async fn fetch_advisory_mention(&self) -> Result<bool> {
        // The page is scanned whatever its status, as long as a body arrives.
        let body = self.client.get(&self.advisory_url).send().await?.text().await?;
        Ok(body
            .to_lowercase()
            .contains(&self.river_name.to_lowercase()))
    }

    /// Runs the full chain. Never fails.
    pub async fn probe_level(&self) -> RiverLevelReading {
        match self.fetch_primary().await {
            Ok(value) => {
                let status = classify_river_level(value);
                info!("River level {} {} ({})", value, PRIMARY_UNIT, status);
                return RiverLevelReading {
                    value: Some(value),
                    unit_label: Some(PRIMARY_UNIT.to_string()),
                    status,
                };
            },
            Err(e) => warn!("Primary river feed failed: {}", e),
        }

        match self.fetch_advisory_mention().await {
            Ok(true) => {
                info!("Advisory page mentions {}", self.river_name);
                return RiverLevelReading {
                    value: None,
                    unit_label: Some(ADVISORY_UNIT.to_string()),
                    status: RiverStatus::SeeExternalSource,
                };
            },
            Ok(false) => debug!("Advisory page does not mention {}", self.river_name),
            Err(e) => warn!("River advisory page failed: {}", e),
        }

        RiverLevelReading::no_data()
    }
}

impl RiverSource for RiverLevelProbe {
    async fn probe(&self) -> RiverLevelReading {
        self.probe_level().await
    }
}
