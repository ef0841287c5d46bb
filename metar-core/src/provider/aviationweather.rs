use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::model::RawObservation;

use super::{MetarSource, ProviderId, SourceError, truncate_body};

pub const DEFAULT_BASE_URL: &str = "https://aviationweather.gov";

/// Free aviationweather.gov client; needs no credentials.
#[derive(Debug, Clone)]
pub struct AviationWeatherSource {
    http: Client,
    base_url: String,
    station: String,
}

impl AviationWeatherSource {
    pub fn new(http: Client, base_url: String, station: String) -> Self {
        Self {
            http,
            base_url,
            station,
        }
    }
}

#[async_trait]
impl MetarSource for AviationWeatherSource {
    fn id(&self) -> ProviderId {
        ProviderId::AviationWeather
    }

    #[instrument(skip(self), fields(station = %self.station), level = "debug")]
    async fn latest_observation(&self) -> Result<RawObservation, SourceError> {
        let url = format!("{}/api/data/metar", self.base_url.trim_end_matches('/'));
        debug!(%url, "requesting aviationweather.gov METAR");

        let res = self
            .http
            .get(&url)
            .query(&[("ids", self.station.as_str()), ("format", "json")])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(SourceError::SourceUnavailable(format!(
                "aviationweather.gov request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        // The service answers an unknown or quiet station with an empty body.
        if body.trim().is_empty() {
            return Err(SourceError::NoData);
        }

        let parsed: Value = serde_json::from_str(&body).map_err(|e| {
            SourceError::SourceUnavailable(format!("Failed to parse aviationweather.gov JSON: {e}"))
        })?;

        match parsed {
            Value::Array(items) => items
                .into_iter()
                .next()
                .map(RawObservation::new)
                .ok_or(SourceError::NoData),
            _ => Err(SourceError::NoData),
        }
    }
}
