//! Error types for Robot operations.
//!
//! Every failure surfaced by the client is a single [`Error`] value. The HTTP path only
//! produces network, parse and provider API errors; authentication errors and the
//! remaining variants come from callers, the poller, client construction and local argument
//! validation.

use serde::Deserialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;

/// Shared, cloneable error cause.
pub type Cause = Arc<dyn std::error::Error + Send + Sync>;

/// Main error type for Robot operations.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Request construction or transport-level failure.
    #[error("network error: {message}: {source}")]
    Network {
        /// What the client was doing when the failure happened
        message: String,
        /// Underlying transport error
        #[source]
        source: Cause,
    },

    /// The response body could not be interpreted as the expected JSON.
    #[error("parse error: {message}: {source}")]
    Parse {
        /// What was being decoded
        message: String,
        /// Underlying decode error
        #[source]
        source: Cause,
    },

    /// Explicit authentication failure raised by the caller.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Business-rule rejection reported by the provider.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The poll attempt budget ran out before the condition held.
    #[error("timed out waiting for condition after {attempts} attempts")]
    Timeout {
        /// Number of predicate evaluations performed
        attempts: u32,
    },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Client configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Arguments were rejected before any request was made.
    #[error("validation error: {0}")]
    Validation(String),
}

/// Specialized result type for Robot operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::Network`].
    Network,
    /// See [`Error::Parse`].
    Parse,
    /// See [`Error::Authentication`].
    Authentication,
    /// See [`Error::Api`].
    Api,
    /// See [`Error::Timeout`].
    Timeout,
    /// See [`Error::Cancelled`].
    Cancelled,
    /// See [`Error::Config`].
    Config,
    /// See [`Error::Validation`].
    Validation,
}

/// Error codes issued by the provider.
///
/// Only the codes the client branches on are named; everything else is kept verbatim in
/// [`ErrorCode::Other`]. Codes compare by their wire form, so `Other("SERVER_NOT_FOUND")`
/// equals [`ErrorCode::ServerNotFound`].
#[derive(Debug, Clone)]
pub enum ErrorCode {
    /// Generic resource not found
    NotFound,
    /// Server number does not exist
    ServerNotFound,
    /// IP address does not exist
    IpNotFound,
    /// Request quota exhausted
    RateLimitExceeded,
    /// Credentials were rejected
    Unauthorized,
    /// Input parameters were rejected
    InvalidInput,
    /// Another operation is still running
    Conflict,
    /// The provider omitted the code or sent a non-string value
    Unknown,
    /// Any other code, kept as sent
    Other(String),
}

impl ErrorCode {
    /// Returns the code as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::ServerNotFound => "SERVER_NOT_FOUND",
            Self::IpNotFound => "IP_NOT_FOUND",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidInput => "INVALID_INPUT",
            Self::Conflict => "CONFLICT",
            Self::Unknown => "UNKNOWN",
            Self::Other(code) => code,
        }
    }

    fn from_json(value: Option<&serde_json::Value>) -> Self {
        match value.and_then(serde_json::Value::as_str) {
            Some(code) => Self::from(code),
            None => Self::Unknown,
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "NOT_FOUND" => Self::NotFound,
            "SERVER_NOT_FOUND" => Self::ServerNotFound,
            "IP_NOT_FOUND" => Self::IpNotFound,
            "RATE_LIMIT_EXCEEDED" => Self::RateLimitExceeded,
            "UNAUTHORIZED" => Self::Unauthorized,
            "INVALID_INPUT" => Self::InvalidInput,
            "CONFLICT" => Self::Conflict,
            "UNKNOWN" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }
}

impl PartialEq for ErrorCode {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ErrorCode {}

impl Hash for ErrorCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-issued API error.
///
/// Displays as `CODE: message`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// Provider error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// HTTP status of the response, when the error came from one
    pub status: Option<u16>,
}

impl ApiError {
    /// Create an API error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
        }
    }

    /// Attach the HTTP status.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// Error envelope returned by the provider on failed requests.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Body of the provider error envelope.
///
/// Fields stay untyped because the provider sometimes omits them or sends the wrong type.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ErrorDetail {
    /// HTTP status echoed by the provider, normally a number
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    /// Error code, normally a string
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    /// Human-readable message, normally a string
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Parse a provider error body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the body is not an error envelope.
    pub fn parse(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|err| Error::parse("error response", err))
    }

    /// Convert into an [`ApiError`], preferring the HTTP status of the response.
    #[must_use]
    pub fn into_api_error(self, http_status: u16) -> ApiError {
        let code = ErrorCode::from_json(self.error.code.as_ref());
        let message = match self.error.message {
            Some(serde_json::Value::String(message)) => message,
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let status = self
            .error
            .status
            .as_ref()
            .and_then(serde_json::Value::as_u64)
            .and_then(|status| u16::try_from(status).ok())
            .unwrap_or(http_status);
        ApiError {
            code,
            message,
            status: Some(status),
        }
    }
}

impl Error {
    /// Build a network error from a cause.
    pub fn network<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Build a parse error from a cause.
    pub fn parse<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Parse {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Build an API error from a code and message.
    pub fn api(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self::Api(ApiError::new(code.into(), message))
    }

    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Api(_) => ErrorKind::Api,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Config(_) => ErrorKind::Config,
            Self::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Returns the provider error code, for API errors.
    #[must_use]
    pub const fn code(&self) -> Option<&ErrorCode> {
        match self {
            Self::Api(err) => Some(&err.code),
            _ => None,
        }
    }

    /// Returns true if this is an API error with the given code.
    #[must_use]
    pub fn is_code(&self, code: &ErrorCode) -> bool {
        self.code() == Some(code)
    }

    /// Returns true if the provider rejected the request for exceeding its rate limit.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        self.is_code(&ErrorCode::RateLimitExceeded)
    }

    /// Returns true if the provider reported a missing server or IP.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.is_code(&ErrorCode::ServerNotFound) || self.is_code(&ErrorCode::IpNotFound)
    }

    /// Returns true for caller cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true if the poll budget ran out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connection failed"
        } else if err.is_builder() {
            "failed to build request"
        } else if err.is_body() || err.is_decode() {
            "failed to read response body"
        } else {
            "request failed"
        };
        Self::network(message, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::parse("invalid JSON", err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("invalid URL: {err}"))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}
