//! Server, reset and rescue models.

use chrono::NaiveDate;
use robot_core::envelope;
use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Provisioning status of a server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// Server is usable
    Ready,
    /// Server is being provisioned or reinstalled
    #[serde(rename = "in process")]
    InProcess,
    /// Status not known to this client
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Ready => "ready",
            Self::InProcess => "in process",
            Self::Unknown => "unknown",
        };
        f.write_str(value)
    }
}

/// Additional subnet routed to a server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subnet {
    /// Network address
    pub ip: String,
    /// Prefix length, sent as a string by the API
    pub mask: String,
}

/// Dedicated server.
///
/// The list endpoint returns the summary fields only; the detail endpoint also reports
/// which boot and reset features the server supports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Server {
    /// Server number, the primary identifier
    pub server_number: u32,
    /// Main IPv4 address
    pub server_ip: Option<String>,
    /// Main IPv6 network
    #[serde(default)]
    pub server_ipv6_net: Option<String>,
    /// Customer-assigned name
    #[serde(default)]
    pub server_name: String,
    /// Product name
    pub product: String,
    /// Data center
    pub dc: String,
    /// Included traffic
    pub traffic: String,
    /// Provisioning status
    pub status: ServerStatus,
    /// Whether the server has been cancelled
    pub cancelled: bool,
    /// Paid-until date
    pub paid_until: NaiveDate,
    /// Assigned single IP addresses
    #[serde(default)]
    pub ip: Vec<String>,
    /// Assigned subnets
    #[serde(default)]
    pub subnet: Option<Vec<Subnet>>,
    /// Reset support (detail only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset: Option<bool>,
    /// Rescue system support (detail only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescue: Option<bool>,
    /// VNC installation support (detail only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnc: Option<bool>,
    /// Wake on LAN support (detail only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wol: Option<bool>,
    /// Hot swap support (detail only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hot_swap: Option<bool>,
}

impl Server {
    /// Returns true once the server reports the `ready` status.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == ServerStatus::Ready
    }
}

/// Reset method.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResetType {
    /// Send CTRL+ALT+DEL
    Sw,
    /// Hardware reset
    Hw,
    /// Manual reset by a technician
    Man,
    /// Press the power button
    Power,
    /// Hold the power button
    PowerLong,
    /// Method not known to this client
    #[serde(other)]
    Unsupported,
}

impl ResetType {
    /// Form value of the reset type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sw => "sw",
            Self::Hw => "hw",
            Self::Man => "man",
            Self::Power => "power",
            Self::PowerLong => "power_long",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for ResetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reset options of a server, or the result of executing a reset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reset {
    /// Server number
    pub server_number: u32,
    /// Main IPv4 address
    #[serde(default)]
    pub server_ip: Option<String>,
    /// Main IPv6 network
    #[serde(default)]
    pub server_ipv6_net: Option<String>,
    /// Available reset methods, or the executed one
    #[serde(rename = "type", deserialize_with = "one_or_many")]
    pub types: Vec<ResetType>,
    /// Power state as reported by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_status: Option<String>,
}

/// SSH key fingerprint reference inside rescue data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyReference {
    /// Key name
    #[serde(default)]
    pub name: Option<String>,
    /// Key fingerprint
    pub fingerprint: String,
    /// Key algorithm
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    /// Key size in bits
    #[serde(default)]
    pub size: Option<u32>,
}

/// Rescue system state of a server.
///
/// While inactive, `os` lists the available systems; once activated it holds the
/// selected one and `password` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rescue {
    /// Server number
    pub server_number: u32,
    /// Main IPv4 address
    #[serde(default)]
    pub server_ip: Option<String>,
    /// Main IPv6 network
    #[serde(default)]
    pub server_ipv6_net: Option<String>,
    /// Available or active rescue systems
    #[serde(deserialize_with = "one_or_many")]
    pub os: Vec<String>,
    /// Available or active architectures
    #[serde(default, deserialize_with = "one_or_many")]
    pub arch: Vec<u32>,
    /// Whether the rescue system is active
    pub active: bool,
    /// Root password of the active rescue system
    #[serde(default)]
    pub password: Option<String>,
    /// SSH keys installed into the rescue system
    #[serde(default, deserialize_with = "unwrapped_items")]
    pub authorized_key: Vec<KeyReference>,
    /// Host keys of the rescue system
    #[serde(default, deserialize_with = "unwrapped_items")]
    pub host_key: Vec<KeyReference>,
}

/// Parameters for activating the rescue system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RescueActivation {
    /// Rescue system, e.g. `linux`
    pub os: String,
    /// Architecture
    pub arch: Option<u32>,
    /// Fingerprints of SSH keys to install
    pub authorized_keys: Vec<String>,
    /// Keyboard layout
    pub keyboard: Option<String>,
}

impl RescueActivation {
    /// Activate the given rescue system.
    #[must_use]
    pub fn new(os: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            ..Self::default()
        }
    }

    /// Select the architecture.
    #[must_use]
    pub const fn with_arch(mut self, arch: u32) -> Self {
        self.arch = Some(arch);
        self
    }

    /// Install an SSH key by fingerprint.
    #[must_use]
    pub fn with_authorized_key(mut self, fingerprint: impl Into<String>) -> Self {
        self.authorized_keys.push(fingerprint.into());
        self
    }

    /// Select the keyboard layout.
    #[must_use]
    pub fn with_keyboard(mut self, keyboard: impl Into<String>) -> Self {
        self.keyboard = Some(keyboard.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
        None => Vec::new(),
    })
}

// Items such as `{"key": {...}}` are unwrapped the same way as top-level responses.
fn unwrapped_items<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Option::<Vec<Value>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .map(|item| serde_json::from_value(envelope::unwrap_value(item)).map_err(D::Error::custom))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn server_status_accepts_unknown_values() {
        let status: ServerStatus = serde_json::from_value(json!("in process")).unwrap();
        assert_eq!(status, ServerStatus::InProcess);
        let status: ServerStatus = serde_json::from_value(json!("migrating")).unwrap();
        assert_eq!(status, ServerStatus::Unknown);
        assert_eq!(ServerStatus::InProcess.to_string(), "in process");
    }

    #[test]
    fn reset_type_accepts_single_value() {
        let reset: Reset = serde_json::from_value(json!({
            "server_ip": "123.123.123.123",
            "server_number": 321,
            "type": "hw"
        }))
        .unwrap();
        assert_eq!(reset.types, vec![ResetType::Hw]);
        assert_eq!(ResetType::PowerLong.as_str(), "power_long");
    }

    #[test]
    fn rescue_unwraps_key_items() {
        let rescue: Rescue = serde_json::from_value(json!({
            "server_number": 321,
            "os": "linux",
            "arch": 64,
            "active": true,
            "password": "jEt0dtUvomJC",
            "authorized_key": [
                {"key": {"name": "laptop", "fingerprint": "15:28:b0:03", "type": "ED25519", "size": 256}}
            ],
            "host_key": []
        }))
        .unwrap();

        assert_eq!(rescue.os, vec!["linux"]);
        assert_eq!(rescue.arch, vec![64]);
        assert_eq!(rescue.authorized_key.len(), 1);
        assert_eq!(rescue.authorized_key[0].fingerprint, "15:28:b0:03");
        assert!(rescue.host_key.is_empty());
    }

    #[test]
    fn rescue_activation_builder() {
        let activation = RescueActivation::new("linux")
            .with_arch(64)
            .with_authorized_key("aa:bb")
            .with_keyboard("us");
        assert_eq!(activation.arch, Some(64));
        assert_eq!(activation.authorized_keys, vec!["aa:bb"]);
        assert_eq!(activation.keyboard.as_deref(), Some("us"));
    }
}
