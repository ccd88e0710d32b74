//! SSH key management for the Robot API.
//!
//! Keys stored here can be installed into the rescue system and into operating system
//! images.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{KeyClient, KeyClientBuilder};
pub use models::{CreateKeyRequest, KeyRecord, SshKey};

/// Convenient result alias that reuses the shared Robot error type.
pub type Result<T> = robot_core::Result<T>;
