use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, env, fs, path::PathBuf, time::Duration};

use crate::model::Station;
use crate::provider::{ProviderId, aviationweather, checkwx};

pub const ENV_CHECKWX_API_KEY: &str = "CHECKWX_API_KEY";
pub const ENV_TWILIO_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
pub const ENV_TWILIO_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
pub const ENV_TWILIO_WHATSAPP_NUMBER: &str = "TWILIO_WHATSAPP_NUMBER";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Base URLs of both METAR providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub checkwx: String,
    pub aviationweather: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            checkwx: checkwx::DEFAULT_BASE_URL.to_string(),
            aviationweather: aviationweather::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Twilio WhatsApp credentials used for outbound replies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    /// Sender number, with or without the `whatsapp:` prefix.
    pub whatsapp_number: Option<String>,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-request timeout for outbound HTTP calls, in seconds.
    pub timeout_secs: u64,

    pub station: Station,

    /// Example TOML:
    /// [providers.checkwx]
    /// api_key = "..."
    pub providers: HashMap<String, ProviderConfig>,

    pub endpoints: Endpoints,

    pub twilio: TwilioConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            station: Station::default(),
            providers: HashMap::new(),
            endpoints: Endpoints::default(),
            twilio: TwilioConfig::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "metar-relay", "metar-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay credentials from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| env::var(name).ok())
    }

    /// Overlay credentials from `lookup`; empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_CHECKWX_API_KEY) {
            self.upsert_provider_api_key(ProviderId::CheckWx, key);
        }
        if let Some(sid) = get(ENV_TWILIO_ACCOUNT_SID) {
            self.twilio.account_sid = Some(sid);
        }
        if let Some(token) = get(ENV_TWILIO_AUTH_TOKEN) {
            self.twilio.auth_token = Some(token);
        }
        if let Some(number) = get(ENV_TWILIO_WHATSAPP_NUMBER) {
            self.twilio.whatsapp_number = Some(number);
        }

        self
    }

    /// Set or replace a provider API key.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });
    }

    /// Returns API key for a provider, if present and non-empty.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers
            .get(provider_id.as_str())
            .map(|cfg| cfg.api_key.as_str())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        !provider_id.requires_api_key() || self.provider_api_key(provider_id).is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderId;

    #[test]
    fn default_config_targets_gatwick() {
        let cfg = Config::default();

        assert_eq!(cfg.station.code, "EGKK");
        assert_eq!(cfg.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.endpoints.checkwx, "https://api.checkwx.com");
        assert!(!cfg.is_provider_configured(ProviderId::CheckWx));
        assert!(cfg.is_provider_configured(ProviderId::AviationWeather));
    }

    #[test]
    fn set_api_key_for_provider() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::CheckWx, "CWX_KEY".into());

        assert_eq!(cfg.provider_api_key(ProviderId::CheckWx), Some("CWX_KEY"));
        assert!(cfg.is_provider_configured(ProviderId::CheckWx));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::CheckWx, "   ".into());

        assert_eq!(cfg.provider_api_key(ProviderId::CheckWx), None);
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::CheckWx, "FROM_FILE".into());

        let cfg = cfg.with_overrides(|name| match name {
            ENV_CHECKWX_API_KEY => Some("FROM_ENV".to_string()),
            ENV_TWILIO_ACCOUNT_SID => Some("AC123".to_string()),
            ENV_TWILIO_AUTH_TOKEN => Some(String::new()),
            _ => None,
        });

        assert_eq!(cfg.provider_api_key(ProviderId::CheckWx), Some("FROM_ENV"));
        assert_eq!(cfg.twilio.account_sid.as_deref(), Some("AC123"));
        assert_eq!(cfg.twilio.auth_token, None);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = Config::from_toml(
            r#"
            timeout_secs = 5

            [providers.checkwx]
            api_key = "abc"

            [endpoints]
            aviationweather = "http://localhost:9000"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.station, Station::default());
        assert_eq!(cfg.provider_api_key(ProviderId::CheckWx), Some("abc"));
        assert_eq!(cfg.endpoints.aviationweather, "http://localhost:9000");
        assert_eq!(cfg.endpoints.checkwx, checkwx::DEFAULT_BASE_URL);
    }

    #[test]
    fn toml_roundtrip_keeps_key() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::CheckWx, "KEY".into());

        let text = toml::to_string_pretty(&cfg).unwrap();
        let back = Config::from_toml(&text).unwrap();
        assert_eq!(back.provider_api_key(ProviderId::CheckWx), Some("KEY"));
    }
}
