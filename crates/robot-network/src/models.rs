//! IP address and vSwitch models.

use chrono::NaiveDate;
use robot_core::form::FormParams;
use robot_core::time::PROVIDER_DATE_FORMAT;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

/// Lowest VLAN id accepted for vSwitches.
pub const VSWITCH_VLAN_MIN: u16 = 4000;

/// Highest VLAN id accepted for vSwitches.
pub const VSWITCH_VLAN_MAX: u16 = 4091;

/// Single IP address assigned to a server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ip {
    /// The address
    pub ip: String,
    /// Main address of the server it is routed to
    pub server_ip: String,
    /// Server number
    pub server_number: u32,
    /// Whether the address is locked
    #[serde(default)]
    pub locked: bool,
    /// Separate MAC address, if one is assigned
    #[serde(default)]
    pub separate_mac: Option<String>,
    /// Whether traffic warnings are enabled
    #[serde(default)]
    pub traffic_warnings: bool,
    /// Hourly warning threshold in MB
    #[serde(default)]
    pub traffic_hourly: u64,
    /// Daily warning threshold in MB
    #[serde(default)]
    pub traffic_daily: u64,
    /// Monthly warning threshold in GB
    #[serde(default)]
    pub traffic_monthly: u64,
    /// Gateway (detail only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    /// Prefix length (detail only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<u8>,
    /// Broadcast address (detail only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast: Option<String>,
}

/// Traffic warning settings of an IP address. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
#[validate(schema(function = "validate_any_warning_set"))]
pub struct TrafficWarnings {
    /// Enable or disable warnings
    pub enabled: Option<bool>,
    /// Hourly threshold in MB
    #[validate(range(min = 1))]
    pub hourly: Option<u64>,
    /// Daily threshold in MB
    #[validate(range(min = 1))]
    pub daily: Option<u64>,
    /// Monthly threshold in GB
    #[validate(range(min = 1))]
    pub monthly: Option<u64>,
}

fn validate_any_warning_set(warnings: &TrafficWarnings) -> Result<(), ValidationError> {
    if warnings == &TrafficWarnings::default() {
        return Err(ValidationError::new("no_traffic_warning_change"));
    }
    Ok(())
}

impl TrafficWarnings {
    /// Create an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable warnings.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set the hourly threshold.
    #[must_use]
    pub const fn with_hourly(mut self, megabytes: u64) -> Self {
        self.hourly = Some(megabytes);
        self
    }

    /// Set the daily threshold.
    #[must_use]
    pub const fn with_daily(mut self, megabytes: u64) -> Self {
        self.daily = Some(megabytes);
        self
    }

    /// Set the monthly threshold.
    #[must_use]
    pub const fn with_monthly(mut self, gigabytes: u64) -> Self {
        self.monthly = Some(gigabytes);
        self
    }

    /// Form encoding of the update.
    #[must_use]
    pub fn to_form(&self) -> FormParams {
        let mut form = FormParams::new();
        form.push_opt("traffic_warnings", self.enabled);
        form.push_opt("traffic_hourly", self.hourly);
        form.push_opt("traffic_daily", self.daily);
        form.push_opt("traffic_monthly", self.monthly);
        form
    }
}

/// Server attached to a vSwitch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VSwitchServer {
    /// Server number
    pub server_number: u32,
    /// Main IPv4 address
    #[serde(default)]
    pub server_ip: Option<String>,
    /// Main IPv6 network
    #[serde(default)]
    pub server_ipv6_net: Option<String>,
    /// Attachment status, e.g. `ready` or `in process`
    pub status: String,
}

/// Subnet routed into a vSwitch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VSwitchSubnet {
    /// Network address
    pub ip: String,
    /// Prefix length
    pub mask: u8,
    /// Gateway
    #[serde(default)]
    pub gateway: Option<String>,
}

/// Cloud network connected to a vSwitch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudNetwork {
    /// Cloud network id
    pub id: u64,
    /// Network address
    pub ip: String,
    /// Prefix length
    pub mask: u8,
    /// Gateway
    #[serde(default)]
    pub gateway: Option<String>,
}

/// vSwitch.
///
/// The list endpoint omits the attachment lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VSwitch {
    /// vSwitch id
    pub id: u64,
    /// Name
    pub name: String,
    /// VLAN id
    pub vlan: u16,
    /// Whether the vSwitch has been cancelled
    #[serde(default)]
    pub cancelled: bool,
    /// Attached servers
    #[serde(default)]
    pub server: Vec<VSwitchServer>,
    /// Routed subnets
    #[serde(default)]
    pub subnet: Vec<VSwitchSubnet>,
    /// Connected cloud networks
    #[serde(default)]
    pub cloud_network: Vec<CloudNetwork>,
}

/// Parameters for creating a vSwitch.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct CreateVSwitchRequest {
    /// Name
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// VLAN id
    #[validate(range(min = VSWITCH_VLAN_MIN, max = VSWITCH_VLAN_MAX))]
    pub vlan: u16,
}

impl CreateVSwitchRequest {
    /// Create a request.
    #[must_use]
    pub fn new(name: impl Into<String>, vlan: u16) -> Self {
        Self {
            name: name.into(),
            vlan,
        }
    }

    /// Form encoding of the request.
    #[must_use]
    pub fn to_form(&self) -> FormParams {
        FormParams::new()
            .with("name", &self.name)
            .with("vlan", self.vlan)
    }
}

/// When a vSwitch cancellation takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationDate {
    /// Immediately
    Now,
    /// At the end of the given day
    On(NaiveDate),
}

impl fmt::Display for CancellationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Now => f.write_str("now"),
            Self::On(date) => write!(f, "{}", date.format(PROVIDER_DATE_FORMAT)),
        }
    }
}
