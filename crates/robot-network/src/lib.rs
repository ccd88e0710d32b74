//! Network resources of the Robot API.
//!
//! This crate provides typed models and an asynchronous client for single IP addresses
//! and vSwitches.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{NetworkClient, NetworkClientBuilder};
pub use models::{
    CancellationDate, CloudNetwork, CreateVSwitchRequest, Ip, TrafficWarnings, VSwitch,
    VSwitchServer, VSwitchSubnet,
};

/// Convenient result alias that reuses the shared Robot error type.
pub type Result<T> = robot_core::Result<T>;
