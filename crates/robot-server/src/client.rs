//! Asynchronous server client implementation.

use crate::models::{Reset, ResetType, Rescue, RescueActivation, Server};
use crate::Result;
use chrono::FixedOffset;
use robot_core::client::{ClientConfig, RobotClient, RobotClientBuilder};
use robot_core::config::RobotConfig;
use robot_core::form::FormParams;
use robot_core::poll::{self, PollPolicy};
use robot_core::request::Request;
use robot_core::Error;
use robot_core::CancellationToken;
use tracing::{debug, info};
use url::Url;

const USER_AGENT: &str = concat!("robot-server/", env!("CARGO_PKG_VERSION"));

/// Builder for [`ServerClient`].
#[derive(Debug)]
pub struct ServerClientBuilder {
    inner: RobotClientBuilder,
}

impl ServerClientBuilder {
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

    /// Override the polling policy used by [`ServerClient::wait_until_ready`].
    #[must_use]
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.inner = self.inner.with_poll_policy(policy);
        self
    }

    /// Set the provider UTC offset.
    #[must_use]
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.inner = self.inner.with_utc_offset(offset);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ServerClient> {
        let inner = self.inner.build()?;
        Ok(ServerClient { inner })
    }
}

/// Asynchronous client for servers, resets and the rescue system.
#[derive(Clone)]
pub struct ServerClient {
    inner: RobotClient,
}

impl ServerClient {
    /// Construct a client directly from the base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        ServerClientBuilder::new(base_url)?.build()
    }

    /// Construct a client from a [`RobotConfig`].
    pub fn from_config(config: &RobotConfig) -> Result<Self> {
        ServerClientBuilder::from_config(config)?.build()
    }

    /// Wrap an existing core client.
    #[must_use]
    pub fn from_client(inner: RobotClient) -> Self {
        Self { inner }
    }

    /// Start a builder for the given base URL.
    pub fn builder(base_url: impl AsRef<str>) -> Result<ServerClientBuilder> {
        ServerClientBuilder::new(base_url)
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.inner.base_url()
    }

    /// List all servers of the account.
    pub async fn list_servers(&self, cancel: &CancellationToken) -> Result<Vec<Server>> {
        self.inner
            .send(Request::get("server").unwrap_array("server"), cancel)
            .await
    }

    /// Fetch a single server.
    pub async fn get_server(&self, server_number: u32, cancel: &CancellationToken) -> Result<Server> {
        check_server_number(server_number)?;
        self.inner
            .send(Request::get(format!("server/{server_number}")), cancel)
            .await
    }

    /// Change the customer-assigned name of a server.
    pub async fn rename_server(
        &self,
        server_number: u32,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Server> {
        check_server_number(server_number)?;
        if name.trim().is_empty() {
            return Err(Error::Validation("server name must not be empty".into()));
        }

        let form = FormParams::new().with("server_name", name);
        self.inner
            .send(
                Request::post(format!("server/{server_number}")).with_form(form),
                cancel,
            )
            .await
    }

    /// Fetch the reset methods available for a server.
    pub async fn get_reset(&self, server_number: u32, cancel: &CancellationToken) -> Result<Reset> {
        check_server_number(server_number)?;
        self.inner
            .send(Request::get(format!("reset/{server_number}")), cancel)
            .await
    }

    /// Execute a reset.
    pub async fn reset(
        &self,
        server_number: u32,
        reset_type: ResetType,
        cancel: &CancellationToken,
    ) -> Result<Reset> {
        check_server_number(server_number)?;
        if reset_type == ResetType::Unsupported {
            return Err(Error::Validation("unsupported reset type".into()));
        }

        info!(server_number, %reset_type, "executing server reset");
        let form = FormParams::new().with("type", reset_type);
        self.inner
            .send(
                Request::post(format!("reset/{server_number}")).with_form(form),
                cancel,
            )
            .await
    }

    /// Fetch the rescue system state of a server.
    pub async fn get_rescue(&self, server_number: u32, cancel: &CancellationToken) -> Result<Rescue> {
        check_server_number(server_number)?;
        self.inner
            .send(Request::get(rescue_path(server_number)), cancel)
            .await
    }

    /// Activate the rescue system for the next boot.
    pub async fn activate_rescue(
        &self,
        server_number: u32,
        activation: &RescueActivation,
        cancel: &CancellationToken,
    ) -> Result<Rescue> {
        check_server_number(server_number)?;
        if activation.os.is_empty() {
            return Err(Error::Validation("rescue system must be named".into()));
        }

        let mut form = FormParams::new().with("os", &activation.os);
        form.push_opt("arch", activation.arch);
        for fingerprint in &activation.authorized_keys {
            form.push("authorized_key[]", fingerprint);
        }
        form.push_opt("keyboard", activation.keyboard.as_deref());

        self.inner
            .send(Request::post(rescue_path(server_number)).with_form(form), cancel)
            .await
    }

    /// Deactivate the rescue system.
    pub async fn deactivate_rescue(
        &self,
        server_number: u32,
        cancel: &CancellationToken,
    ) -> Result<Rescue> {
        check_server_number(server_number)?;
        self.inner
            .send(Request::delete(rescue_path(server_number)), cancel)
            .await
    }

    /// Poll the server until it reports the `ready` status.
    ///
    /// Returns [`Error::Timeout`] when the client's poll budget is exhausted and
    /// [`Error::Cancelled`] when `cancel` fires.
    pub async fn wait_until_ready(
        &self,
        server_number: u32,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_server_number(server_number)?;
        info!(server_number, "waiting for server to become ready");

        poll::wait_until(self.inner.poll_policy(), cancel, || async move {
            let server = self.get_server(server_number, cancel).await?;
            debug!(server_number, status = %server.status, "server status");
            Ok::<_, Error>(server.is_ready())
        })
        .await
    }
}

fn rescue_path(server_number: u32) -> String {
    format!("boot/{server_number}/rescue")
}

fn check_server_number(server_number: u32) -> Result<()> {
    if server_number == 0 {
        return Err(Error::Validation("server number must be positive".into()));
    }
    Ok(())
}
