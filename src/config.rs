//! Configuration management for the WeCom admin client.
//!
//! Configuration is explicit: the binary loads it from environment
//! variables, library callers can build it directly with [`Config::new`].

use std::env;
use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::WeComError;

/// Default WeCom API base URL.
pub const DEFAULT_BASE_URL: &str = "https://qyapi.weixin.qq.com/cgi-bin";

/// Agent id used when none is configured.
pub const DEFAULT_AGENT_ID: u32 = 1;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Identity and transport settings for one WeCom corp.
///
/// The corp secret is stored but never logged or exposed in error messages.
#[derive(Clone)]
pub struct Config {
    /// API base URL, without trailing slash.
    pub base_url: String,

    /// Corp id (`corpid`).
    pub corp_id: String,

    /// Corp secret (`corpsecret`).
    /// This value must never be logged or included in error messages.
    pub corp_secret: String,

    /// Agent id messages are sent under.
    pub agent_id: u32,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("corp_id", &self.corp_id)
            .field("corp_secret", &"[REDACTED]")
            .field("agent_id", &self.agent_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    /// Creates a configuration with default base URL, agent id and timeout.
    pub fn new(corp_id: impl Into<String>, corp_secret: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            corp_id: corp_id.into(),
            corp_secret: corp_secret.into(),
            agent_id: DEFAULT_AGENT_ID,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Sets the agent id.
    pub fn with_agent_id(mut self, agent_id: u32) -> Self {
        self.agent_id = agent_id;
        self
    }

    /// Sets the API base URL (trailing slashes are trimmed).
    ///
    /// # Errors
    ///
    /// Returns `WeComError::Config` if the URL is not an absolute
    /// `http://` or `https://` URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, WeComError> {
        self.base_url = Self::validate_base_url(base_url.into())?;
        Ok(self)
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the corp secret.
    pub fn corp_secret(&self) -> &str {
        &self.corp_secret
    }

    /// Loads configuration from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `WECOM_CORP_ID`: The corp id
    /// - `WECOM_CORP_SECRET`: The corp secret
    ///
    /// # Optional Environment Variables
    ///
    /// - `WECOM_AGENT_ID`: Agent id (default `1`)
    /// - `WECOM_BASE_URL`: API base URL (default [`DEFAULT_BASE_URL`])
    /// - `WECOM_TIMEOUT_SECS`: Request timeout in seconds (default `30`)
    ///
    /// # Errors
    ///
    /// Returns `WeComError::Config` if any required variable is missing
    /// or if values fail validation.
    pub fn from_env() -> Result<Self, WeComError> {
        let corp_id = Self::get_required_env("WECOM_CORP_ID")?;
        let corp_secret = Self::get_required_env("WECOM_CORP_SECRET")?;

        Self::validate_secret(&corp_secret)?;

        let base_url = match Self::get_optional_env("WECOM_BASE_URL") {
            Some(url) => Self::validate_base_url(url)?,
            None => DEFAULT_BASE_URL.to_string(),
        };

        let agent_id = match Self::get_optional_env("WECOM_AGENT_ID") {
            Some(raw) => Self::parse_agent_id(&raw)?,
            None => DEFAULT_AGENT_ID,
        };

        let timeout = match Self::get_optional_env("WECOM_TIMEOUT_SECS") {
            Some(raw) => Self::parse_timeout(&raw)?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Config {
            base_url,
            corp_id: corp_id.trim().to_string(),
            corp_secret: corp_secret.trim().to_string(),
            agent_id,
            timeout,
        })
    }

    /// Gets a required environment variable, returning an error if missing or empty.
    fn get_required_env(name: &str) -> Result<String, WeComError> {
        env::var(name)
            .map_err(|_| WeComError::missing_env(name))
            .and_then(|value| {
                if value.trim().is_empty() {
                    Err(WeComError::missing_env(name))
                } else {
                    Ok(value)
                }
            })
    }

    fn get_optional_env(name: &str) -> Option<String> {
        env::var(name).ok().filter(|value| !value.trim().is_empty())
    }

    /// Validates and normalizes the base URL.
    fn validate_base_url(url: String) -> Result<String, WeComError> {
        let url = url.trim().trim_end_matches('/').to_string();

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(WeComError::invalid_config(
                "WECOM_BASE_URL must start with http:// or https://",
            ));
        }

        Url::parse(&url)
            .map_err(|e| WeComError::invalid_config(format!("WECOM_BASE_URL is invalid: {}", e)))?;

        Ok(url)
    }

    fn parse_agent_id(raw: &str) -> Result<u32, WeComError> {
        raw.trim().parse::<u32>().map_err(|_| {
            WeComError::invalid_config(format!(
                "WECOM_AGENT_ID must be an unsigned integer, got: {:?}",
                raw
            ))
        })
    }

    fn parse_timeout(raw: &str) -> Result<Duration, WeComError> {
        match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(WeComError::invalid_config(format!(
                "WECOM_TIMEOUT_SECS must be a positive integer, got: {:?}",
                raw
            ))),
        }
    }

    /// Validates the corp secret is not a placeholder value.
    fn validate_secret(secret: &str) -> Result<(), WeComError> {
        let secret_lower = secret.to_lowercase();
        let placeholder_patterns = [
            "your_secret",
            "your_corp_secret",
            "placeholder",
            "xxx",
            "changeme",
        ];

        for pattern in placeholder_patterns {
            if secret_lower.contains(pattern) {
                return Err(WeComError::invalid_config(
                    "WECOM_CORP_SECRET appears to be a placeholder value",
                ));
            }
        }

        Ok(())
    }
}
