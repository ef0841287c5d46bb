use crate::{
    Config, RawObservation,
    provider::{aviationweather::AviationWeatherSource, checkwx::CheckWxSource},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, time::Duration};
use thiserror::Error;

pub mod aviationweather;
pub mod checkwx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    CheckWx,
    AviationWeather,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::CheckWx => "checkwx",
            ProviderId::AviationWeather => "aviationweather",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::CheckWx, ProviderId::AviationWeather]
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderId::CheckWx)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "checkwx" => Ok(ProviderId::CheckWx),
            "aviationweather" => Ok(ProviderId::AviationWeather),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: checkwx, aviationweather."
            )),
        }
    }
}

/// Why a single source could not deliver an observation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("no API key configured")]
    Unconfigured,

    #[error("no METAR data in response")]
    NoData,

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::SourceUnavailable(format!("request timed out: {err}"))
        } else {
            SourceError::SourceUnavailable(err.to_string())
        }
    }
}

/// A provider of the latest observation for the configured station.
///
/// Implementations make exactly one attempt per call; fallback between
/// sources is the caller's job.
#[async_trait]
pub trait MetarSource: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn latest_observation(&self) -> Result<RawObservation, SourceError>;
}

/// Shared HTTP client with the configured request timeout.
pub fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))
}

/// Construct a source from config and explicit ProviderId.
pub fn source_from_config(
    id: ProviderId,
    config: &Config,
    http: reqwest::Client,
) -> Box<dyn MetarSource> {
    match id {
        ProviderId::CheckWx => Box::new(CheckWxSource::new(
            http,
            config.endpoints.checkwx.clone(),
            config.provider_api_key(id).map(str::to_owned),
            config.station.code.clone(),
        )),
        ProviderId::AviationWeather => Box::new(AviationWeatherSource::new(
            http,
            config.endpoints.aviationweather.clone(),
            config.station.code.clone(),
        )),
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
