//! Ping client: unary calls and batch streaming with concurrent send/receive

pub mod client;
pub mod config;

pub use client::PingClient;
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_CALL_TIMEOUT};
