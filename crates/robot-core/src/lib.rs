//! # robot-core
//!
//! Core client for the Robot dedicated-server management API.
//!
//! This crate provides the shared request pipeline used by the resource crates:
//! authenticated transport, response envelope handling, error mapping, form encoding
//! and bounded polling of provider-side state.
//!
//! ## Modules
//!
//! - [`client`] - Client builder and response decoding
//! - [`config`] - Configuration structures for Robot clients
//! - [`envelope`] - Response envelope unwrapping
//! - [`error`] - Error types and provider error codes
//! - [`form`] - Flat and hierarchical form encoding
//! - [`poll`] - Condition polling with exponential backoff
//! - [`request`] - Request description
//! - [`time`] - Provider timestamp parsing
//! - [`transport`] - HTTP transport seam

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod form;
pub mod poll;
pub mod request;
pub mod time;
pub mod transport;

// Re-export commonly used types
pub use client::{ClientConfig, RobotClient, RobotClientBuilder};
pub use config::{PollConfig, RobotConfig};
pub use error::{ApiError, Error, ErrorCode, ErrorKind, Result};
pub use form::{Direction, FormParams, HierarchicalForm, RuleFields};
pub use poll::{wait_until, PollPolicy, PollState};
pub use request::Request;
pub use tokio_util::sync::CancellationToken;
pub use transport::{RawResponse, Transport};
