//! Types shared by the ping service and client
//!
//! This module contains the TLS trust configuration, the call context
//! used for cooperative cancellation, log setup for the binaries, and
//! helpers for spinning up test servers.

pub mod config;
pub mod context;
pub mod logging;
pub mod test_utils;

pub use config::TlsConfig;
pub use context::{parse_grpc_timeout, CallContext};
pub use test_utils::{spawn_test_server, TestServer};
