//! Asynchronous firewall client implementation.

use crate::models::{Firewall, FirewallConfig};
use crate::Result;
use robot_core::client::{ClientConfig, RobotClient, RobotClientBuilder};
use robot_core::config::RobotConfig;
use robot_core::poll::{self, PollPolicy, PollState};
use robot_core::request::Request;
use robot_core::{CancellationToken, Error};
use tracing::{debug, info};
use url::Url;

const USER_AGENT: &str = concat!("robot-firewall/", env!("CARGO_PKG_VERSION"));

/// Builder for [`FirewallClient`].
#[derive(Debug)]
pub struct FirewallClientBuilder {
    inner: RobotClientBuilder,
}

impl FirewallClientBuilder {
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

    /// Override the polling policy used while waiting for changes to apply.
    #[must_use]
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.inner = self.inner.with_poll_policy(policy);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<FirewallClient> {
        let inner = self.inner.build()?;
        Ok(FirewallClient { inner })
    }
}

/// Asynchronous firewall client.
#[derive(Clone)]
pub struct FirewallClient {
    inner: RobotClient,
}

impl FirewallClient {
    /// Construct a client directly from the base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        FirewallClientBuilder::new(base_url)?.build()
    }

    /// Construct a client from a [`RobotConfig`].
    pub fn from_config(config: &RobotConfig) -> Result<Self> {
        FirewallClientBuilder::from_config(config)?.build()
    }

    /// Wrap an existing core client.
    #[must_use]
    pub fn from_client(inner: RobotClient) -> Self {
        Self { inner }
    }

    /// Start a builder for the given base URL.
    pub fn builder(base_url: impl AsRef<str>) -> Result<FirewallClientBuilder> {
        FirewallClientBuilder::new(base_url)
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.inner.base_url()
    }

    /// Fetch the firewall of a server.
    pub async fn get_firewall(
        &self,
        server_number: u32,
        cancel: &CancellationToken,
    ) -> Result<Firewall> {
        check_server_number(server_number)?;
        self.inner
            .send(Request::get(firewall_path(server_number)), cancel)
            .await
    }

    /// Replace the firewall configuration.
    ///
    /// The provider applies the change asynchronously; the returned firewall usually
    /// reports `in process`.
    pub async fn set_firewall(
        &self,
        server_number: u32,
        config: &FirewallConfig,
        cancel: &CancellationToken,
    ) -> Result<Firewall> {
        check_server_number(server_number)?;
        config.check()?;

        info!(
            server_number,
            status = %config.status,
            input_rules = config.rules.input.len(),
            output_rules = config.rules.output.len(),
            "updating firewall"
        );

        let request =
            Request::post(firewall_path(server_number)).with_hierarchical_form(config.to_form());
        self.inner.send(request, cancel).await
    }

    /// Remove all rules and disable the firewall.
    pub async fn delete_firewall(
        &self,
        server_number: u32,
        cancel: &CancellationToken,
    ) -> Result<Firewall> {
        check_server_number(server_number)?;
        info!(server_number, "deleting firewall");
        self.inner
            .send(Request::delete(firewall_path(server_number)), cancel)
            .await
    }

    /// Poll until the firewall is no longer `in process`.
    pub async fn wait_until_applied(
        &self,
        server_number: u32,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_server_number(server_number)?;

        poll::wait_until_observed(
            self.inner.poll_policy(),
            cancel,
            || async move {
                let firewall = self.get_firewall(server_number, cancel).await?;
                Ok::<_, Error>(!firewall.is_in_process())
            },
            |state| {
                if state == PollState::Waiting {
                    debug!(server_number, "firewall change still in process");
                }
            },
        )
        .await
    }

    /// Replace the configuration and wait until it has been applied.
    pub async fn set_and_wait(
        &self,
        server_number: u32,
        config: &FirewallConfig,
        cancel: &CancellationToken,
    ) -> Result<Firewall> {
        let firewall = self.set_firewall(server_number, config, cancel).await?;
        if firewall.is_in_process() {
            self.wait_until_applied(server_number, cancel).await?;
            return self.get_firewall(server_number, cancel).await;
        }
        Ok(firewall)
    }
}

fn firewall_path(server_number: u32) -> String {
    format!("firewall/{server_number}")
}

fn check_server_number(server_number: u32) -> Result<()> {
    if server_number == 0 {
        return Err(Error::Validation("server number must be positive".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FirewallRule, FirewallStatus, RuleAction};
    use robot_core::error::ErrorKind;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> FirewallClient {
        FirewallClient::builder(server.uri())
            .unwrap()
            .with_basic_auth("robot", "secret")
            .with_poll_policy(
                PollPolicy::new()
                    .with_initial_delay(Duration::from_millis(5))
                    .with_max_delay(Duration::from_millis(10))
                    .with_max_attempts(3),
            )
            .build()
            .unwrap()
    }

    fn firewall_json(status: &str) -> serde_json::Value {
        json!({
            "firewall": {
                "server_ip": "123.123.123.123",
                "server_number": 321,
                "status": status,
                "filter_ipv6": false,
                "whitelist_hos": true,
                "port": "main",
                "rules": {
                    "input": [{
                        "ip_version": "ipv4",
                        "name": "rule 1",
                        "dst_ip": null,
                        "src_ip": "1.1.1.1",
                        "dst_port": "80",
                        "src_port": null,
                        "protocol": null,
                        "tcp_flags": null,
                        "action": "accept"
                    }],
                    "output": [{
                        "ip_version": null,
                        "name": "Allow all",
                        "dst_ip": null,
                        "src_ip": null,
                        "dst_port": null,
                        "src_port": null,
                        "protocol": null,
                        "tcp_flags": null,
                        "action": "accept"
                    }]
                }
            }
        })
    }

    #[tokio::test]
    async fn get_firewall_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/firewall/321"))
            .respond_with(ResponseTemplate::new(200).set_body_json(firewall_json("active")))
            .mount(&server)
            .await;

        let firewall = test_client(&server)
            .get_firewall(321, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(firewall.status, FirewallStatus::Active);
        assert_eq!(firewall.rules.input[0].src_ip.as_deref(), Some("1.1.1.1"));
        assert_eq!(firewall.rules.output[0].action, RuleAction::Accept);
    }

    #[tokio::test]
    async fn set_firewall_sends_hierarchical_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/firewall/321"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string(
                "status=active&filter_ipv6=false&whitelist_hos=true\
                 &rules[input][0][src_ip]=1.1.1.1&rules[input][0][action]=accept\
                 &rules[output][0][action]=discard",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(firewall_json("in process")))
            .expect(1)
            .mount(&server)
            .await;

        let config = FirewallConfig::new()
            .with_input_rule(FirewallRule::accept().with_src_ip("1.1.1.1"))
            .with_output_rule(FirewallRule::discard());

        let firewall = test_client(&server)
            .set_firewall(321, &config, &CancellationToken::new())
            .await
            .unwrap();
        assert!(firewall.is_in_process());
    }

    #[tokio::test]
    async fn set_firewall_rejects_in_process_target() {
        let server = MockServer::start().await;
        let config = FirewallConfig::new().with_status(FirewallStatus::InProcess);

        let err = test_client(&server)
            .set_firewall(321, &config, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_and_wait_polls_until_applied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/firewall/321"))
            .respond_with(ResponseTemplate::new(200).set_body_json(firewall_json("in process")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/firewall/321"))
            .respond_with(ResponseTemplate::new(200).set_body_json(firewall_json("in process")))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/firewall/321"))
            .respond_with(ResponseTemplate::new(200).set_body_json(firewall_json("active")))
            .with_priority(2)
            .mount(&server)
            .await;

        let firewall = test_client(&server)
            .set_and_wait(321, &FirewallConfig::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(firewall.status, FirewallStatus::Active);
        // POST, two polls, final read
        assert_eq!(server.received_requests().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn wait_until_applied_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/firewall/321"))
            .respond_with(ResponseTemplate::new(200).set_body_json(firewall_json("in process")))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .wait_until_applied(321, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn wait_until_applied_honours_cancellation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/firewall/321"))
            .respond_with(ResponseTemplate::new(200).set_body_json(firewall_json("in process")))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = test_client(&server)
            .wait_until_applied(321, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_firewall() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/firewall/321"))
            .respond_with(ResponseTemplate::new(200).set_body_json(firewall_json("in process")))
            .mount(&server)
            .await;

        let firewall = test_client(&server)
            .delete_firewall(321, &CancellationToken::new())
            .await
            .unwrap();
        assert!(firewall.is_in_process());
    }

    #[tokio::test]
    async fn firewall_not_available_maps_api_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/firewall/321"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"status": 404, "code": "FIREWALL_PORT_NOT_FOUND", "message": "no port"}
            })))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .get_firewall(321, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Api);
        assert!(!err.is_not_found());
        assert!(err.to_string().starts_with("FIREWALL_PORT_NOT_FOUND"));
    }
}
