use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::model::RawObservation;

use super::{MetarSource, ProviderId, SourceError, truncate_body};

pub const DEFAULT_BASE_URL: &str = "https://api.checkwx.com";

/// Keyed CheckWX decoded-METAR client.
#[derive(Debug, Clone)]
pub struct CheckWxSource {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    station: String,
}

impl CheckWxSource {
    pub fn new(http: Client, base_url: String, api_key: Option<String>, station: String) -> Self {
        Self {
            http,
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            station,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/metar/{}/decoded",
            self.base_url.trim_end_matches('/'),
            self.station
        )
    }
}

#[derive(Debug, Deserialize)]
struct CwxResponse {
    #[serde(default)]
    results: u64,
    #[serde(default)]
    data: Vec<Value>,
}

#[async_trait]
impl MetarSource for CheckWxSource {
    fn id(&self) -> ProviderId {
        ProviderId::CheckWx
    }

    #[instrument(skip(self), fields(station = %self.station), level = "debug")]
    async fn latest_observation(&self) -> Result<RawObservation, SourceError> {
        let api_key = self.api_key.as_deref().ok_or(SourceError::Unconfigured)?;

        let url = self.url();
        debug!(%url, "requesting CheckWX METAR");

        let res = self
            .http
            .get(&url)
            .header("X-API-Key", api_key)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(SourceError::SourceUnavailable(format!(
                "CheckWX request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let parsed: CwxResponse = serde_json::from_str(&body).map_err(|e| {
            SourceError::SourceUnavailable(format!("Failed to parse CheckWX JSON: {e}"))
        })?;

        if parsed.results == 0 {
            return Err(SourceError::NoData);
        }

        parsed
            .data
            .into_iter()
            .next()
            .map(RawObservation::new)
            .ok_or(SourceError::NoData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer, key: Option<&str>) -> CheckWxSource {
        let http = Client::builder()
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap();
        CheckWxSource::new(http, server.uri(), key.map(String::from), "EGKK".to_string())
    }

    #[tokio::test]
    async fn returns_first_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/metar/EGKK/decoded"))
            .and(header("X-API-Key", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": 2,
                "data": [{"raw": "EGKK LATEST"}, {"raw": "EGKK OLDER"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let obs = source(&server, Some("test_key")).latest_observation().await.unwrap();
        assert_eq!(obs.get("raw"), Some(&json!("EGKK LATEST")));
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        assert_eq!(
            source(&server, None).latest_observation().await,
            Err(SourceError::Unconfigured)
        );
        assert_eq!(
            source(&server, Some("  ")).latest_observation().await,
            Err(SourceError::Unconfigured)
        );
    }

    #[tokio::test]
    async fn zero_results_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": 0, "data": []})))
            .mount(&server)
            .await;

        assert_eq!(
            source(&server, Some("k")).latest_observation().await,
            Err(SourceError::NoData)
        );
    }

    #[tokio::test]
    async fn unauthorized_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = source(&server, Some("bad")).latest_observation().await.unwrap_err();
        match err {
            SourceError::SourceUnavailable(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("Unauthorized"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"results": 1, "data": [{}]}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = source(&server, Some("k")).latest_observation().await.unwrap_err();
        assert!(matches!(err, SourceError::SourceUnavailable(_)));
    }
}
