//! Outbound message sinks.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt::Debug;
use tracing::{debug, error};

use crate::config::TwilioConfig;
use crate::provider::truncate_body;

pub const TWILIO_API_BASE: &str = "https://api.twilio.com";
const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Delivers a text body to a destination address.
///
/// Returns whether delivery succeeded; failures are logged, never raised.
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    async fn send(&self, to: &str, body: &str) -> bool;
}

/// Prints messages to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn send(&self, _to: &str, body: &str) -> bool {
        println!("{body}");
        true
    }
}

/// Twilio WhatsApp messages API.
#[derive(Debug, Clone)]
pub struct TwilioNotifier {
    http: Client,
    base_url: String,
    config: TwilioConfig,
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
}

impl TwilioNotifier {
    pub fn new(http: Client, config: TwilioConfig) -> Self {
        Self::with_base_url(http, TWILIO_API_BASE.to_string(), config)
    }

    pub fn with_base_url(http: Client, base_url: String, config: TwilioConfig) -> Self {
        Self {
            http,
            base_url,
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }

    fn credentials(&self) -> Option<(&str, &str, &str)> {
        Some((
            non_empty(&self.config.account_sid)?,
            non_empty(&self.config.auth_token)?,
            non_empty(&self.config.whatsapp_number)?,
        ))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, to: &str, body: &str) -> bool {
        let Some((sid, token, from)) = self.credentials() else {
            error!("missing Twilio credentials; cannot send WhatsApp message");
            return false;
        };

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            sid
        );
        let to = whatsapp_address(to);
        let from = whatsapp_address(from);

        let res = self
            .http
            .post(&url)
            .basic_auth(sid, Some(token))
            .form(&[("From", from.as_str()), ("To", to.as_str()), ("Body", body)])
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                error!(error = %err, "failed to send WhatsApp message");
                return false;
            }
        };

        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            error!(%status, body = %truncate_body(&text), "Twilio rejected WhatsApp message");
            return false;
        }

        match serde_json::from_str::<TwilioMessage>(&text) {
            Ok(msg) => debug!(sid = %msg.sid, %to, "WhatsApp message sent"),
            Err(_) => debug!(%to, "WhatsApp message sent"),
        }
        true
    }
}

/// Prefix an address with `whatsapp:` unless it already has it.
pub fn whatsapp_address(number: &str) -> String {
    let number = number.trim();
    if number.starts_with(WHATSAPP_PREFIX) {
        number.to_string()
    } else {
        format!("{WHATSAPP_PREFIX}{number}")
    }
}
