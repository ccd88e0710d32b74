//! Firewall management for the Robot API.
//!
//! This crate provides typed models and an asynchronous client for reading and replacing
//! the stateless firewall of a dedicated server, including waiting for the provider to
//! finish applying a new configuration.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{FirewallClient, FirewallClientBuilder};
pub use models::{
    Firewall, FirewallConfig, FirewallRule, FirewallRules, FirewallStatus, IpVersion, RuleAction,
};

/// Convenient result alias that reuses the shared Robot error type.
pub type Result<T> = robot_core::Result<T>;
