//! Asynchronous SSH key client implementation.

use crate::models::{is_fingerprint, CreateKeyRequest, KeyRecord, SshKey};
use crate::Result;
use chrono::FixedOffset;
use robot_core::client::{ClientConfig, RobotClient, RobotClientBuilder};
use robot_core::config::RobotConfig;
use robot_core::form::FormParams;
use robot_core::request::Request;
use robot_core::{CancellationToken, Error};
use tracing::info;
use url::Url;
use validator::Validate;

const USER_AGENT: &str = concat!("robot-key/", env!("CARGO_PKG_VERSION"));

/// Builder for [`KeyClient`].
#[derive(Debug)]
pub struct KeyClientBuilder {
    inner: RobotClientBuilder,
}

impl KeyClientBuilder {
    /// Create a builder for the specified base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let inner = RobotClientBuilder::new(base_url)?.with_user_agent(USER_AGENT);
        Ok(Self { inner })
    }

    /// Create a builder from a [`RobotConfig`].
    pub fn from_config(config: &RobotConfig) -> Result<Self> {
        let mut inner = RobotClientBuilder::from_config(config)?;
        if config.user_agent.is_none() {
            inner = inner.with_user_agent(USER_AGENT);
        }
        Ok(Self { inner })
    }

    /// Configure HTTP basic authentication credentials.
    #[must_use]
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.inner = self.inner.with_basic_auth(username, password);
        self
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.inner = self.inner.with_http_config(config);
        self
    }

    /// Set the offset used to decode key creation times.
    #[must_use]
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.inner = self.inner.with_utc_offset(offset);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<KeyClient> {
        let inner = self.inner.build()?;
        Ok(KeyClient { inner })
    }
}

/// Asynchronous SSH key client.
#[derive(Clone)]
pub struct KeyClient {
    inner: RobotClient,
}

impl KeyClient {
    /// Construct a client directly from the base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        KeyClientBuilder::new(base_url)?.build()
    }

    /// Construct a client from a [`RobotConfig`].
    pub fn from_config(config: &RobotConfig) -> Result<Self> {
        KeyClientBuilder::from_config(config)?.build()
    }

    /// Wrap an existing core client.
    #[must_use]
    pub fn from_client(inner: RobotClient) -> Self {
        Self { inner }
    }

    /// Start a builder for the given base URL.
    pub fn builder(base_url: impl AsRef<str>) -> Result<KeyClientBuilder> {
        KeyClientBuilder::new(base_url)
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.inner.base_url()
    }

    /// List all stored keys.
    pub async fn list_keys(&self, cancel: &CancellationToken) -> Result<Vec<SshKey>> {
        let records: Vec<KeyRecord> = self
            .inner
            .send(Request::get("key").unwrap_array("key"), cancel)
            .await?;

        let offset = self.inner.utc_offset();
        records
            .into_iter()
            .map(|record| record.into_key(offset))
            .collect()
    }

    /// Fetch a key by fingerprint.
    pub async fn get_key(&self, fingerprint: &str, cancel: &CancellationToken) -> Result<SshKey> {
        check_fingerprint(fingerprint)?;
        let record: KeyRecord = self
            .inner
            .send(Request::get(key_path(fingerprint)), cancel)
            .await?;
        record.into_key(self.inner.utc_offset())
    }

    /// Store a new public key.
    pub async fn create_key(
        &self,
        request: &CreateKeyRequest,
        cancel: &CancellationToken,
    ) -> Result<SshKey> {
        request.validate()?;

        info!(name = %request.name, "storing SSH key");
        let record: KeyRecord = self
            .inner
            .send(Request::post("key").with_form(request.to_form()), cancel)
            .await?;
        record.into_key(self.inner.utc_offset())
    }

    /// Rename a stored key.
    pub async fn rename_key(
        &self,
        fingerprint: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<SshKey> {
        check_fingerprint(fingerprint)?;
        if name.trim().is_empty() {
            return Err(Error::Validation("key name must not be empty".into()));
        }

        let form = FormParams::new().with("name", name);
        let record: KeyRecord = self
            .inner
            .send(Request::post(key_path(fingerprint)).with_form(form), cancel)
            .await?;
        record.into_key(self.inner.utc_offset())
    }

    /// Delete a stored key.
    pub async fn delete_key(&self, fingerprint: &str, cancel: &CancellationToken) -> Result<()> {
        check_fingerprint(fingerprint)?;

        info!(fingerprint, "deleting SSH key");
        self.inner
            .send(Request::delete(key_path(fingerprint)), cancel)
            .await
    }
}

fn key_path(fingerprint: &str) -> String {
    format!("key/{fingerprint}")
}

fn check_fingerprint(fingerprint: &str) -> Result<()> {
    if is_fingerprint(fingerprint) {
        return Ok(());
    }
    Err(Error::Validation(format!(
        "`{fingerprint}` is not a key fingerprint"
    )))
}
