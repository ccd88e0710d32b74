//! Server management for the Robot API.
//!
//! This crate provides typed models and an asynchronous client for listing and renaming
//! dedicated servers, triggering resets and managing the rescue system.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{ServerClient, ServerClientBuilder};
pub use models::{
    KeyReference, Reset, ResetType, Rescue, RescueActivation, Server, ServerStatus, Subnet,
};

/// Convenient result alias that reuses the shared Robot error type.
pub type Result<T> = robot_core::Result<T>;
