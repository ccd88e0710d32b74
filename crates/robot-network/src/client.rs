//! Asynchronous IP and vSwitch client implementation.

use crate::models::{CancellationDate, CreateVSwitchRequest, Ip, TrafficWarnings, VSwitch};
use crate::Result;
use robot_core::client::{ClientConfig, RobotClient, RobotClientBuilder};
use robot_core::config::RobotConfig;
use robot_core::form::FormParams;
use robot_core::request::Request;
use robot_core::{CancellationToken, Error};
use std::net::IpAddr;
use tracing::info;
use url::Url;
use validator::Validate;

const USER_AGENT: &str = concat!("robot-network/", env!("CARGO_PKG_VERSION"));

/// Builder for [`NetworkClient`].
#[derive(Debug)]
pub struct NetworkClientBuilder {
    inner: RobotClientBuilder,
}

impl NetworkClientBuilder {
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

    /// Build the client.
    pub fn build(self) -> Result<NetworkClient> {
        let inner = self.inner.build()?;
        Ok(NetworkClient { inner })
    }
}

/// Asynchronous client for IP addresses and vSwitches.
#[derive(Clone)]
pub struct NetworkClient {
    inner: RobotClient,
}

impl NetworkClient {
    /// Construct a client directly from the base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        NetworkClientBuilder::new(base_url)?.build()
    }

    /// Construct a client from a [`RobotConfig`].
    pub fn from_config(config: &RobotConfig) -> Result<Self> {
        NetworkClientBuilder::from_config(config)?.build()
    }

    /// Wrap an existing core client.
    #[must_use]
    pub fn from_client(inner: RobotClient) -> Self {
        Self { inner }
    }

    /// Start a builder for the given base URL.
    pub fn builder(base_url: impl AsRef<str>) -> Result<NetworkClientBuilder> {
        NetworkClientBuilder::new(base_url)
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.inner.base_url()
    }

    /// List all single IP addresses of the account.
    pub async fn list_ips(&self, cancel: &CancellationToken) -> Result<Vec<Ip>> {
        self.inner
            .send(Request::get("ip").unwrap_array("ip"), cancel)
            .await
    }

    /// Fetch a single IP address.
    pub async fn get_ip(&self, ip: &str, cancel: &CancellationToken) -> Result<Ip> {
        let ip = parse_ip(ip)?;
        self.inner.send(Request::get(format!("ip/{ip}")), cancel).await
    }

    /// Update the traffic warning settings of an IP address.
    pub async fn update_traffic_warnings(
        &self,
        ip: &str,
        warnings: &TrafficWarnings,
        cancel: &CancellationToken,
    ) -> Result<Ip> {
        let ip = parse_ip(ip)?;
        warnings.validate()?;

        self.inner
            .send(
                Request::post(format!("ip/{ip}")).with_form(warnings.to_form()),
                cancel,
            )
            .await
    }

    /// List all vSwitches of the account.
    pub async fn list_vswitches(&self, cancel: &CancellationToken) -> Result<Vec<VSwitch>> {
        self.inner.send(Request::get("vswitch"), cancel).await
    }

    /// Fetch a vSwitch including its attached servers and subnets.
    pub async fn get_vswitch(&self, id: u64, cancel: &CancellationToken) -> Result<VSwitch> {
        check_vswitch_id(id)?;
        self.inner
            .send(Request::get(format!("vswitch/{id}")), cancel)
            .await
    }

    /// Create a vSwitch.
    pub async fn create_vswitch(
        &self,
        request: &CreateVSwitchRequest,
        cancel: &CancellationToken,
    ) -> Result<VSwitch> {
        request.validate()?;

        info!(name = %request.name, vlan = request.vlan, "creating vSwitch");
        self.inner
            .send(Request::post("vswitch").with_form(request.to_form()), cancel)
            .await
    }

    /// Cancel a vSwitch.
    pub async fn cancel_vswitch(
        &self,
        id: u64,
        date: CancellationDate,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_vswitch_id(id)?;

        info!(id, %date, "cancelling vSwitch");
        let form = FormParams::new().with("cancellation_date", date);
        self.inner
            .send(Request::delete(format!("vswitch/{id}")).with_form(form), cancel)
            .await
    }
}

fn parse_ip(ip: &str) -> Result<IpAddr> {
    ip.trim()
        .parse()
        .map_err(|_| Error::Validation(format!("`{ip}` is not an IP address")))
}

fn check_vswitch_id(id: u64) -> Result<()> {
    if id == 0 {
        return Err(Error::Validation("vSwitch id must be positive".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use robot_core::error::{ErrorCode, ErrorKind};
    use serde_json::json;
    use wiremock::matchers::{body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> NetworkClient {
        NetworkClient::builder(server.uri())
            .unwrap()
            .with_basic_auth("robot", "secret")
            .build()
            .unwrap()
    }

    fn ip_json(ip: &str) -> serde_json::Value {
        json!({
            "ip": {
                "ip": ip,
                "server_ip": "123.123.123.123",
                "server_number": 321,
                "locked": false,
                "separate_mac": null,
                "traffic_warnings": false,
                "traffic_hourly": 50,
                "traffic_daily": 50,
                "traffic_monthly": 8
            }
        })
    }

    #[tokio::test]
    async fn list_ips_unwraps_each_item() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([ip_json("123.123.123.123"), ip_json("124.124.124.124")])),
            )
            .mount(&server)
            .await;

        let ips = test_client(&server)
            .list_ips(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ips.len(), 2);
        assert_eq!(ips[1].ip, "124.124.124.124");
        assert_eq!(ips[0].traffic_monthly, 8);
    }

    #[tokio::test]
    async fn get_ip_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip/10.0.0.1"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"status": 404, "code": "IP_NOT_FOUND", "message": "IP not found"}
            })))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .get_ip("10.0.0.1", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.is_code(&ErrorCode::IpNotFound));
    }

    #[tokio::test]
    async fn get_ip_rejects_garbage_locally() {
        let server = MockServer::start().await;
        let err = test_client(&server)
            .get_ip("not-an-ip", &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_traffic_warnings_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ip/123.123.123.123"))
            .and(body_string("traffic_warnings=true&traffic_hourly=200"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ip_json("123.123.123.123")))
            .expect(1)
            .mount(&server)
            .await;

        let warnings = TrafficWarnings::new().with_enabled(true).with_hourly(200);
        let ip = test_client(&server)
            .update_traffic_warnings("123.123.123.123", &warnings, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ip.server_number, 321);
    }

    #[tokio::test]
    async fn empty_traffic_warning_update_is_rejected() {
        let server = MockServer::start().await;
        let err = test_client(&server)
            .update_traffic_warnings(
                "123.123.123.123",
                &TrafficWarnings::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn list_vswitches_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vswitch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 4321, "name": "vswitch 1234", "vlan": 4000, "cancelled": false},
                {"id": 4322, "name": "vswitch 1235", "vlan": 4001, "cancelled": true}
            ])))
            .mount(&server)
            .await;

        let vswitches = test_client(&server)
            .list_vswitches(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(vswitches.len(), 2);
        assert!(vswitches[1].cancelled);
        assert!(vswitches[0].server.is_empty());
    }

    #[tokio::test]
    async fn get_vswitch_keeps_server_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vswitch/4321"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 4321,
                "name": "vswitch 1234",
                "vlan": 4000,
                "cancelled": false,
                "server": [
                    {
                        "server_ip": "123.123.123.123",
                        "server_ipv6_net": "2a01:4f8:111:4221::",
                        "server_number": 321,
                        "status": "ready"
                    }
                ],
                "subnet": [
                    {"ip": "213.239.252.48", "mask": 29, "gateway": "213.239.252.49"}
                ],
                "cloud_network": [
                    {"id": 123, "ip": "10.0.2.0", "mask": 24, "gateway": "10.0.2.1"}
                ]
            })))
            .mount(&server)
            .await;

        let vswitch = test_client(&server)
            .get_vswitch(4321, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(vswitch.id, 4321);
        assert_eq!(vswitch.server.len(), 1);
        assert_eq!(vswitch.server[0].server_number, 321);
        assert_eq!(vswitch.subnet[0].mask, 29);
        assert_eq!(vswitch.cloud_network[0].id, 123);
    }

    #[tokio::test]
    async fn create_vswitch_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vswitch"))
            .and(body_string("name=backend&vlan=4010"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 4400,
                "name": "backend",
                "vlan": 4010,
                "cancelled": false,
                "server": [],
                "subnet": [],
                "cloud_network": []
            })))
            .mount(&server)
            .await;

        let vswitch = test_client(&server)
            .create_vswitch(
                &CreateVSwitchRequest::new("backend", 4010),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(vswitch.id, 4400);
    }

    #[tokio::test]
    async fn create_vswitch_validates_vlan() {
        let server = MockServer::start().await;
        let err = test_client(&server)
            .create_vswitch(
                &CreateVSwitchRequest::new("backend", 12),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_vswitch_sends_form_body_with_delete() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/vswitch/4321"))
            .and(body_string("cancellation_date=2030-01-31"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let date = NaiveDate::from_ymd_opt(2030, 1, 31).unwrap();
        test_client(&server)
            .cancel_vswitch(4321, CancellationDate::On(date), &CancellationToken::new())
            .await
            .unwrap();
    }
}
