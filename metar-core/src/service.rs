//! Primary → fallback acquisition followed by detect → normalize → format.

use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    Config,
    detect::detect_schema,
    format::ReportFormatter,
    model::{RawObservation, Station},
    normalize::normalize_as,
    provider::{MetarSource, ProviderId, SourceError, http_client, source_from_config},
};

/// Terminal failure of one invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error(
        "Unable to retrieve the {station} METAR from any source \
         (primary {primary_id}: {primary}; fallback {fallback_id}: {fallback})."
    )]
    AllSourcesFailed {
        station: String,
        primary_id: ProviderId,
        primary: SourceError,
        fallback_id: ProviderId,
        fallback: SourceError,
    },
}

/// Acquisition states. Each source gets exactly one attempt.
#[derive(Debug)]
enum FetchState {
    TryPrimary,
    TryFallback { primary: SourceError },
    Success { source: ProviderId, observation: RawObservation },
    Failure { primary: SourceError, fallback: SourceError },
}

#[derive(Debug)]
pub struct MetarService {
    primary: Box<dyn MetarSource>,
    fallback: Box<dyn MetarSource>,
    formatter: ReportFormatter,
    station: Station,
}

impl MetarService {
    pub fn new(
        primary: Box<dyn MetarSource>,
        fallback: Box<dyn MetarSource>,
        station: Station,
    ) -> Self {
        Self {
            primary,
            fallback,
            formatter: ReportFormatter::new(station.clone()),
            station,
        }
    }

    /// CheckWX as primary, aviationweather.gov as fallback.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = http_client(config.timeout())?;

        Ok(Self::new(
            source_from_config(ProviderId::CheckWx, config, http.clone()),
            source_from_config(ProviderId::AviationWeather, config, http),
            config.station.clone(),
        ))
    }

    pub fn station(&self) -> &Station {
        &self.station
    }

    /// Fetch the latest observation and render it as the chat report.
    pub async fn fetch_and_format_report(&self) -> Result<String, PipelineError> {
        let (source, observation) = self.fetch_observation().await?;

        let schema = detect_schema(&observation);
        info!(%source, ?schema, "METAR observation received");

        let report = normalize_as(&observation, schema);
        Ok(self.formatter.render(&report))
    }

    /// Run the fallback state machine until it reaches a terminal state.
    pub async fn fetch_observation(&self) -> Result<(ProviderId, RawObservation), PipelineError> {
        let mut state = FetchState::TryPrimary;

        loop {
            state = match state {
                FetchState::TryPrimary => match self.primary.latest_observation().await {
                    Ok(observation) => FetchState::Success {
                        source: self.primary.id(),
                        observation,
                    },
                    Err(primary) => {
                        warn!(source = %self.primary.id(), error = %primary, "primary METAR source failed; trying fallback");
                        FetchState::TryFallback { primary }
                    }
                },
                FetchState::TryFallback { primary } => {
                    match self.fallback.latest_observation().await {
                        Ok(observation) => FetchState::Success {
                            source: self.fallback.id(),
                            observation,
                        },
                        Err(fallback) => FetchState::Failure { primary, fallback },
                    }
                }
                FetchState::Success { source, observation } => {
                    return Ok((source, observation));
                }
                FetchState::Failure { primary, fallback } => {
                    let err = PipelineError::AllSourcesFailed {
                        station: self.station.code.clone(),
                        primary_id: self.primary.id(),
                        primary,
                        fallback_id: self.fallback.id(),
                        fallback,
                    };
                    error!(error = %err, "all METAR sources failed");
                    return Err(err);
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct StubSource {
        id: ProviderId,
        result: Result<serde_json::Value, SourceError>,
        calls: Arc<AtomicUsize>,
    }

    impl StubSource {
        fn boxed(
            id: ProviderId,
            result: Result<serde_json::Value, SourceError>,
        ) -> (Box<dyn MetarSource>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = StubSource {
                id,
                result,
                calls: calls.clone(),
            };
            (Box::new(source), calls)
        }
    }

    #[async_trait]
    impl MetarSource for StubSource {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn latest_observation(&self) -> Result<RawObservation, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map(RawObservation::new)
        }
    }

    fn service(
        primary: Result<serde_json::Value, SourceError>,
        fallback: Result<serde_json::Value, SourceError>,
    ) -> (MetarService, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let (p, p_calls) = StubSource::boxed(ProviderId::CheckWx, primary);
        let (f, f_calls) = StubSource::boxed(ProviderId::AviationWeather, fallback);
        (MetarService::new(p, f, Station::default()), p_calls, f_calls)
    }

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let (svc, p_calls, f_calls) = service(
            Ok(json!({"raw": "EGKK 010520Z 27015KT", "temperature": {"celsius": 12}})),
            Ok(json!({"raw_text": "SHOULD NOT BE USED"})),
        );

        let text = svc.fetch_and_format_report().await.unwrap();

        assert_eq!(p_calls.load(Ordering::SeqCst), 1);
        assert_eq!(f_calls.load(Ordering::SeqCst), 0);
        assert!(text.contains("🌡️ Temperature: 12°C"));
        assert!(text.ends_with("📊 Raw METAR: EGKK 010520Z 27015KT"));
    }

    #[tokio::test]
    async fn unconfigured_primary_moves_to_fallback_once() {
        let (svc, p_calls, f_calls) = service(
            Err(SourceError::Unconfigured),
            Ok(json!({"raw_text": "EGKK 010520Z", "temp_c": 9})),
        );

        let (source, _) = svc.fetch_observation().await.unwrap();

        assert_eq!(source, ProviderId::AviationWeather);
        assert_eq!(p_calls.load(Ordering::SeqCst), 1);
        assert_eq!(f_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn every_primary_failure_falls_back() {
        for primary in [
            SourceError::Unconfigured,
            SourceError::NoData,
            SourceError::SourceUnavailable("boom".into()),
        ] {
            let (svc, _, f_calls) = service(Err(primary), Ok(json!({"raw_text": "EGKK"})));
            assert!(svc.fetch_and_format_report().await.is_ok());
            assert_eq!(f_calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn both_failing_yields_diagnostic() {
        let (svc, p_calls, f_calls) = service(
            Err(SourceError::Unconfigured),
            Err(SourceError::SourceUnavailable("status 503".into())),
        );

        let err = svc.fetch_and_format_report().await.unwrap_err();
        let msg = err.to_string();

        assert_eq!(p_calls.load(Ordering::SeqCst), 1);
        assert_eq!(f_calls.load(Ordering::SeqCst), 1);
        assert!(msg.contains("no API key configured"));
        assert!(msg.contains("status 503"));
        assert!(!msg.contains("🛫"));
    }

    #[tokio::test]
    async fn unparseable_observation_still_reports_raw_text() {
        let (svc, _, _) = service(
            Ok(json!({"raw": "EGKK 010520Z AUTO", "wind": ["odd"]})),
            Err(SourceError::NoData),
        );

        let text = svc.fetch_and_format_report().await.unwrap();
        assert!(text.contains("💨 Wind: N/A"));
        assert!(text.ends_with("📊 Raw METAR: EGKK 010520Z AUTO"));
    }

    #[test]
    fn from_config_uses_station() {
        let cfg = Config::default();
        let svc = MetarService::from_config(&cfg).unwrap();
        assert_eq!(svc.station().code, "EGKK");
    }
}
