//! HTTP transport.
//!
//! [`Transport`] is the seam between request description and the network. The
//! production implementation, [`HttpTransport`], sends requests with `reqwest` using
//! basic authentication and always reads the whole body before returning.

use crate::error::{Error, Result};
use crate::request::{Body, Request};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Status and fully drained body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response body
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Create a raw response.
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true if the body is empty or whitespace only.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }

    /// Body as text, lossily decoded.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Executes requests against the provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the status and body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] on transport failures and [`Error::Cancelled`] if
    /// `cancel` fires before the body has been read.
    async fn execute(&self, request: &Request, cancel: &CancellationToken) -> Result<RawResponse>;
}

/// Basic authentication credentials.
#[derive(Debug)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Create credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// User name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

/// `reqwest`-backed [`Transport`].
#[derive(Debug)]
pub struct HttpTransport {
    http: Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl HttpTransport {
    /// Create a transport. `base_url` is normalized to end with `/` so that request
    /// paths are resolved beneath it.
    #[must_use]
    pub fn new(http: Client, base_url: Url, credentials: Option<Credentials>) -> Self {
        Self {
            http,
            base_url: normalize_base_url(base_url),
            credentials,
        }
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| Error::Config(format!("Invalid request path `{path}`: {err}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &Request, cancel: &CancellationToken) -> Result<RawResponse> {
        let url = self.build_url(request.path())?;
        let mut builder = self
            .http
            .request(request.method().clone(), url)
            .header(ACCEPT, "application/json");

        if let Some(credentials) = &self.credentials {
            builder = builder.basic_auth(
                &credentials.username,
                Some(credentials.password.expose_secret()),
            );
        }

        if let Some(body) = request.body() {
            builder = builder.header(CONTENT_TYPE, body.content_type());
            builder = match body {
                Body::Form(pairs) => builder.form(pairs),
                Body::Hierarchical(form) => builder.body(form.encode()),
                Body::Json(value) => builder.body(
                    serde_json::to_vec(value)
                        .map_err(|err| Error::network("failed to encode request body", err))?,
                ),
            };
        }

        debug!(method = %request.method(), path = request.path(), "sending request");

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(RawResponse::new(status, body.to_vec()))
        };

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(method = %request.method(), path = request.path(), "request cancelled");
                return Err(Error::Cancelled);
            }
            response = exchange => response?,
        };

        debug!(
            method = %request.method(),
            path = request.path(),
            status = response.status.as_u16(),
            bytes = response.body.len(),
            "received response"
        );

        Ok(response)
    }
}

fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
