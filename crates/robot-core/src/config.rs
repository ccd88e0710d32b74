//! Configuration structures for Robot clients.
//!
//! [`RobotConfig`] is the serde-friendly description of a client (endpoint, credentials,
//! timeouts, polling, provider time zone). It is validated with `validator` before a
//! client is built from it.

use crate::error::{Error, Result};
use crate::poll::{
    PollPolicy, DEFAULT_POLL_INITIAL_DELAY_MS, DEFAULT_POLL_MAX_ATTEMPTS, DEFAULT_POLL_MAX_DELAY_MS,
};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;
use validator::{Validate, ValidationError};

/// Public endpoint of the Robot webservice.
pub const DEFAULT_BASE_URL: &str = "https://robot-ws.your-server.de";

/// Offset of the provider's local time (CET), used for timestamps without a zone.
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 3600;

/// Configuration for a Robot client instance.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct RobotConfig {
    /// Webservice base URL
    #[validate(url)]
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Webservice user name
    #[validate(length(min = 1))]
    pub username: String,

    /// Webservice password
    #[serde(skip_serializing)]
    #[validate(length(min = 1))]
    pub password: String,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Optional user agent override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Offset in seconds east of UTC used for provider timestamps without a zone
    #[validate(range(min = -86_399, max = 86_399))]
    #[serde(default = "default_utc_offset_secs")]
    pub utc_offset_secs: i32,

    /// Polling configuration
    #[validate(nested)]
    #[serde(default)]
    pub poll: PollConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_utc_offset_secs() -> i32 {
    DEFAULT_UTC_OFFSET_SECS
}

impl RobotConfig {
    /// Create a configuration for the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (e.g. empty credentials).
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let config = Self {
            base_url: default_base_url(),
            username: username.into(),
            password: password.into(),
            tls_verify: default_tls_verify(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: None,
            utc_offset_secs: default_utc_offset_secs(),
            poll: PollConfig::default(),
        };

        config.check()?;
        Ok(config)
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the provider UTC offset in seconds.
    #[must_use]
    pub const fn with_utc_offset_secs(mut self, seconds: i32) -> Self {
        self.utc_offset_secs = seconds;
        self
    }

    /// Set polling configuration.
    #[must_use]
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Validate all fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing every invalid field.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL: {e}")))
    }

    /// Provider UTC offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset is out of range.
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_secs).ok_or_else(|| {
            Error::Config(format!("Invalid UTC offset: {}s", self.utc_offset_secs))
        })
    }
}

impl fmt::Debug for RobotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobotConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("tls_verify", &self.tls_verify)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("utc_offset_secs", &self.utc_offset_secs)
            .field("poll", &self.poll)
            .finish()
    }
}

/// Polling configuration for operations that wait on provider-side state.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_poll_delays"))]
pub struct PollConfig {
    /// Delay after the first unsuccessful check, in milliseconds
    #[validate(range(min = 1, max = 300_000))]
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay between checks, in milliseconds
    #[validate(range(min = 1, max = 3_600_000))]
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Maximum number of checks
    #[validate(range(min = 1, max = 10_000))]
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

const fn default_initial_delay_ms() -> u64 {
    DEFAULT_POLL_INITIAL_DELAY_MS
}

const fn default_max_delay_ms() -> u64 {
    DEFAULT_POLL_MAX_DELAY_MS
}

const fn default_max_attempts() -> u32 {
    DEFAULT_POLL_MAX_ATTEMPTS
}

fn validate_poll_delays(config: &PollConfig) -> std::result::Result<(), ValidationError> {
    if config.max_delay_ms < config.initial_delay_ms {
        return Err(ValidationError::new("max_delay_below_initial_delay"));
    }
    Ok(())
}

impl PollConfig {
    /// Create a polling configuration with defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }

    /// Build the [`PollPolicy`] described by this configuration.
    #[must_use]
    pub const fn policy(&self) -> PollPolicy {
        PollPolicy::new()
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_max_attempts(self.max_attempts)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new()
    }
}
