//! Firewall models and their form encoding.

use robot_core::form::{Direction, HierarchicalForm, RuleFields};
use robot_core::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Firewall state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FirewallStatus {
    /// Rules are enforced
    Active,
    /// Firewall is switched off
    Disabled,
    /// A configuration change is being applied
    #[serde(rename = "in process")]
    InProcess,
    /// State not known to this client
    #[serde(other)]
    Unknown,
}

impl FirewallStatus {
    /// String representation used by the API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
            Self::InProcess => "in process",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FirewallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to matching packets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Let the packet through
    Accept,
    /// Drop the packet
    Discard,
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accept => "accept",
            Self::Discard => "discard",
        })
    }
}

/// IP version a rule applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    /// IPv4 only
    Ipv4,
    /// IPv6 only
    Ipv6,
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
        })
    }
}

/// A single firewall rule.
///
/// Unset match fields match everything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FirewallRule {
    /// IP version; unset applies to both
    #[serde(default)]
    pub ip_version: Option<IpVersion>,
    /// Rule name
    #[serde(default)]
    pub name: Option<String>,
    /// Destination address or network
    #[serde(default)]
    pub dst_ip: Option<String>,
    /// Source address or network
    #[serde(default)]
    pub src_ip: Option<String>,
    /// Destination port or range
    #[serde(default)]
    pub dst_port: Option<String>,
    /// Source port or range
    #[serde(default)]
    pub src_port: Option<String>,
    /// Protocol, e.g. `tcp`
    #[serde(default)]
    pub protocol: Option<String>,
    /// TCP flags, e.g. `ack`
    #[serde(default)]
    pub tcp_flags: Option<String>,
    /// Action for matching packets
    pub action: RuleAction,
}

impl FirewallRule {
    /// Create a rule with only an action set.
    #[must_use]
    pub const fn new(action: RuleAction) -> Self {
        Self {
            ip_version: None,
            name: None,
            dst_ip: None,
            src_ip: None,
            dst_port: None,
            src_port: None,
            protocol: None,
            tcp_flags: None,
            action,
        }
    }

    /// Rule accepting matching packets.
    #[must_use]
    pub const fn accept() -> Self {
        Self::new(RuleAction::Accept)
    }

    /// Rule discarding matching packets.
    #[must_use]
    pub const fn discard() -> Self {
        Self::new(RuleAction::Discard)
    }

    /// Set the rule name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restrict to one IP version.
    #[must_use]
    pub const fn with_ip_version(mut self, version: IpVersion) -> Self {
        self.ip_version = Some(version);
        self
    }

    /// Match a source address or network.
    #[must_use]
    pub fn with_src_ip(mut self, ip: impl Into<String>) -> Self {
        self.src_ip = Some(ip.into());
        self
    }

    /// Match a destination address or network.
    #[must_use]
    pub fn with_dst_ip(mut self, ip: impl Into<String>) -> Self {
        self.dst_ip = Some(ip.into());
        self
    }

    /// Match a source port or range.
    #[must_use]
    pub fn with_src_port(mut self, port: impl Into<String>) -> Self {
        self.src_port = Some(port.into());
        self
    }

    /// Match a destination port or range.
    #[must_use]
    pub fn with_dst_port(mut self, port: impl Into<String>) -> Self {
        self.dst_port = Some(port.into());
        self
    }

    /// Match a protocol.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// Match TCP flags.
    #[must_use]
    pub fn with_tcp_flags(mut self, flags: impl Into<String>) -> Self {
        self.tcp_flags = Some(flags.into());
        self
    }

    /// Ordered form fields of this rule. Unset fields are omitted.
    #[must_use]
    pub fn to_rule_fields(&self) -> RuleFields {
        RuleFields::new()
            .field_opt("ip_version", self.ip_version)
            .field_opt("name", self.name.as_deref())
            .field_opt("dst_ip", self.dst_ip.as_deref())
            .field_opt("src_ip", self.src_ip.as_deref())
            .field_opt("dst_port", self.dst_port.as_deref())
            .field_opt("src_port", self.src_port.as_deref())
            .field_opt("protocol", self.protocol.as_deref())
            .field_opt("tcp_flags", self.tcp_flags.as_deref())
            .field("action", self.action)
    }
}

/// Input and output rule lists, each evaluated in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FirewallRules {
    /// Incoming traffic rules
    #[serde(default)]
    pub input: Vec<FirewallRule>,
    /// Outgoing traffic rules
    #[serde(default)]
    pub output: Vec<FirewallRule>,
}

/// Firewall of a server as reported by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Firewall {
    /// Server number
    pub server_number: u32,
    /// Main IPv4 address
    #[serde(default)]
    pub server_ip: Option<String>,
    /// Current state
    pub status: FirewallStatus,
    /// Whether IPv6 traffic is filtered
    #[serde(default)]
    pub filter_ipv6: bool,
    /// Whether provider services are whitelisted
    #[serde(default)]
    pub whitelist_hos: bool,
    /// Switch port the firewall is attached to
    #[serde(default)]
    pub port: Option<String>,
    /// Configured rules
    #[serde(default)]
    pub rules: FirewallRules,
}

impl Firewall {
    /// Returns true while a configuration change is still being applied.
    #[must_use]
    pub fn is_in_process(&self) -> bool {
        self.status == FirewallStatus::InProcess
    }
}

/// Desired firewall configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallConfig {
    /// Target state, `active` or `disabled`
    pub status: FirewallStatus,
    /// Whether IPv6 traffic is filtered
    pub filter_ipv6: bool,
    /// Whether provider services are whitelisted
    pub whitelist_hos: bool,
    /// Rules replacing the current ones
    pub rules: FirewallRules,
}

impl FirewallConfig {
    /// Active firewall without rules.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: FirewallStatus::Active,
            filter_ipv6: false,
            whitelist_hos: true,
            rules: FirewallRules::default(),
        }
    }

    /// Set the target state.
    #[must_use]
    pub const fn with_status(mut self, status: FirewallStatus) -> Self {
        self.status = status;
        self
    }

    /// Enable or disable IPv6 filtering.
    #[must_use]
    pub const fn with_filter_ipv6(mut self, enabled: bool) -> Self {
        self.filter_ipv6 = enabled;
        self
    }

    /// Enable or disable the provider service whitelist.
    #[must_use]
    pub const fn with_whitelist_hos(mut self, enabled: bool) -> Self {
        self.whitelist_hos = enabled;
        self
    }

    /// Append an input rule.
    #[must_use]
    pub fn with_input_rule(mut self, rule: FirewallRule) -> Self {
        self.rules.input.push(rule);
        self
    }

    /// Append an output rule.
    #[must_use]
    pub fn with_output_rule(mut self, rule: FirewallRule) -> Self {
        self.rules.output.push(rule);
        self
    }

    /// Check the configuration before it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the target state cannot be requested.
    pub fn check(&self) -> robot_core::Result<()> {
        match self.status {
            FirewallStatus::Active | FirewallStatus::Disabled => Ok(()),
            other => Err(Error::Validation(format!(
                "firewall status `{other}` cannot be requested"
            ))),
        }
    }

    /// Encode as a hierarchical form.
    #[must_use]
    pub fn to_form(&self) -> HierarchicalForm {
        HierarchicalForm::new()
            .field("status", self.status)
            .field("filter_ipv6", self.filter_ipv6)
            .field("whitelist_hos", self.whitelist_hos)
            .rules(
                Direction::Input,
                self.rules.input.iter().map(FirewallRule::to_rule_fields),
            )
            .rules(
                Direction::Output,
                self.rules.output.iter().map(FirewallRule::to_rule_fields),
            )
    }
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&Firewall> for FirewallConfig {
    fn from(firewall: &Firewall) -> Self {
        let status = match firewall.status {
            FirewallStatus::Disabled => FirewallStatus::Disabled,
            _ => FirewallStatus::Active,
        };
        Self {
            status,
            filter_ipv6: firewall.filter_ipv6,
            whitelist_hos: firewall.whitelist_hos,
            rules: firewall.rules.clone(),
        }
    }
}
