//! Robot API client.
//!
//! [`RobotClient`] turns a [`Request`] into a decoded value: it executes the request
//! through a [`Transport`], strips the response envelope on success, and maps error
//! payloads into [`Error::Api`] on failure. It holds only immutable configuration and
//! is cheap to clone and share between tasks.

use crate::config::{RobotConfig, DEFAULT_UTC_OFFSET_SECS};
use crate::envelope;
use crate::error::{ApiError, Error, ErrorCode, ErrorResponse, Result};
use crate::poll::PollPolicy;
use crate::request::{Envelope, Request};
use crate::transport::{Credentials, HttpTransport, RawResponse, Transport};
use chrono::{FixedOffset, Offset, Utc};
use reqwest::{ClientBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Default request timeout in seconds
pub const ROBOT_DEFAULT_TIMEOUT: u64 = 30;

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

/// Default idle timeout for connection pools
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Default maximum idle connections per host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

const USER_AGENT: &str = concat!("robot-core/", env!("CARGO_PKG_VERSION"));

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Connection establishment timeout
    pub connect_timeout: Duration,

    /// Connection pool idle timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Enable response compression
    pub enable_compression: bool,

    /// Verify TLS certificates
    pub tls_verify: bool,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(ROBOT_DEFAULT_TIMEOUT),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            enable_compression: true,
            tls_verify: true,
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set connection pool idle timeout.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set maximum idle connections per host.
    #[must_use]
    pub const fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Enable or disable compression.
    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }

    /// Enable or disable TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_utc_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Builder for [`RobotClient`].
#[derive(Debug)]
pub struct RobotClientBuilder {
    base_url: Url,
    credentials: Option<Credentials>,
    user_agent: String,
    http_config: ClientConfig,
    poll_policy: PollPolicy,
    utc_offset: FixedOffset,
}

impl RobotClientBuilder {
    /// Create a builder for the specified base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is invalid.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| Error::Config(format!("Invalid base URL: {e}")))?;

        Ok(Self {
            base_url,
            credentials: None,
            user_agent: USER_AGENT.to_string(),
            http_config: ClientConfig::new(),
            poll_policy: PollPolicy::new(),
            utc_offset: default_utc_offset(),
        })
    }

    /// Create a builder from a validated [`RobotConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn from_config(config: &RobotConfig) -> Result<Self> {
        config.check()?;

        let mut builder = Self::new(&config.base_url)?
            .with_basic_auth(config.username.clone(), config.password.clone())
            .with_http_config(
                ClientConfig::new()
                    .with_timeout(config.timeout())
                    .with_tls_verify(config.tls_verify),
            )
            .with_poll_policy(config.poll.policy())
            .with_utc_offset(config.utc_offset()?);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.with_user_agent(user_agent.clone());
        }

        Ok(builder)
    }

    /// Configure HTTP basic authentication credentials.
    #[must_use]
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Override the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Override the polling policy used by waiting operations.
    #[must_use]
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Set the offset used for zone-less provider timestamps.
    #[must_use]
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be created.
    pub fn build(self) -> Result<RobotClient> {
        let config = &self.http_config;
        let mut builder = ClientBuilder::new()
            .user_agent(self.user_agent.as_str())
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .gzip(config.enable_compression);

        if !config.tls_verify {
            warn!("TLS verification disabled for Robot client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if self.credentials.is_none() {
            warn!("Robot client built without credentials");
        }

        let http = builder
            .build()
            .map_err(|err| Error::Config(format!("Failed to build HTTP client: {err}")))?;

        let transport = HttpTransport::new(http, self.base_url, self.credentials);
        let base_url = transport.base_url().clone();

        Ok(RobotClient {
            transport: Arc::new(transport),
            base_url,
            poll_policy: self.poll_policy,
            utc_offset: self.utc_offset,
        })
    }
}

/// Asynchronous Robot API client.
#[derive(Clone)]
pub struct RobotClient {
    transport: Arc<dyn Transport>,
    base_url: Url,
    poll_policy: PollPolicy,
    utc_offset: FixedOffset,
}

impl RobotClient {
    /// Construct a client directly from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn from_config(config: &RobotConfig) -> Result<Self> {
        RobotClientBuilder::from_config(config)?.build()
    }

    /// Start a builder for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is invalid.
    pub fn builder(base_url: impl AsRef<str>) -> Result<RobotClientBuilder> {
        RobotClientBuilder::new(base_url)
    }

    /// Create a client on top of a custom transport.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>, base_url: Url) -> Self {
        Self {
            transport,
            base_url,
            poll_policy: PollPolicy::new(),
            utc_offset: default_utc_offset(),
        }
    }

    /// Replace the polling policy.
    #[must_use]
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Polling policy used by waiting operations.
    #[must_use]
    pub const fn poll_policy(&self) -> &PollPolicy {
        &self.poll_policy
    }

    /// Offset applied to zone-less provider timestamps.
    #[must_use]
    pub const fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Execute a request and return the raw response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] or [`Error::Cancelled`].
    pub async fn execute(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        self.transport.execute(request, cancel).await
    }

    /// Execute a request and decode the response into `T`.
    ///
    /// # Errors
    ///
    /// - [`Error::Network`] / [`Error::Cancelled`] from the transport
    /// - [`Error::Api`] for responses with status >= 400
    /// - [`Error::Parse`] when the body does not decode into `T`
    pub async fn send<T>(&self, request: Request, cancel: &CancellationToken) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.execute(&request, cancel).await?;
        decode_response(&request, &response)
    }
}

/// Decode a raw response for `request`.
///
/// Empty bodies and `204 No Content` decode `T` from JSON `null`, which succeeds for
/// `()` and `Option<_>` targets.
///
/// # Errors
///
/// See [`RobotClient::send`].
pub fn decode_response<T>(request: &Request, response: &RawResponse) -> Result<T>
where
    T: DeserializeOwned,
{
    let status = response.status;
    if status.as_u16() >= 400 {
        return Err(map_error_response(request, response));
    }

    if status == StatusCode::NO_CONTENT || response.is_empty() {
        return serde_json::from_value(Value::Null).map_err(|err| {
            Error::parse(format!("empty response for `{}`", request.path()), err)
        });
    }

    let value = match request.envelope() {
        Envelope::Auto => envelope::unwrap(&response.body)?,
        Envelope::Array(key) => envelope::unwrap_array(&response.body, key)?,
        Envelope::None => serde_json::from_slice(&response.body)
            .map_err(|err| Error::parse("invalid response body", err))?,
    };

    serde_json::from_value(value).map_err(|err| {
        Error::parse(
            format!("unexpected response shape for `{}`", request.path()),
            err,
        )
    })
}

fn map_error_response(request: &Request, response: &RawResponse) -> Error {
    let status = response.status.as_u16();
    let api = match ErrorResponse::parse(&response.body) {
        Ok(payload) => payload.into_api_error(status),
        Err(err) => {
            debug!(status, error = %err, "error body is not an error envelope");
            ApiError::new(
                ErrorCode::Unknown,
                format!("HTTP {status}: {}", response.text().trim()),
            )
            .with_status(status)
        }
    };

    warn!(
        method = %request.method(),
        path = request.path(),
        status,
        code = %api.code,
        "Robot API request failed"
    );

    Error::Api(api)
}
