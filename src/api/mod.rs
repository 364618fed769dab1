//! Wire types for the `ping.v1.PingService` gRPC service
//!
//! The messages are plain `prost` structs and the client/server glue in
//! [`client`] and [`server`] is written by hand against tonic's codegen
//! support types, so the crate builds without a protobuf compiler. The
//! matching schema for reflection clients lives in [`descriptor`].

pub mod client;
pub mod descriptor;
pub mod server;

use std::collections::HashMap;

/// Fully-qualified gRPC service name
pub const SERVICE_NAME: &str = "ping.v1.PingService";

/// Path of the unary `Ping` method
pub const PING_PATH: &str = "/ping.v1.PingService/Ping";

/// Path of the bidirectional `Stream` method
pub const STREAM_PATH: &str = "/ping.v1.PingService/Stream";

/// Message content sent by a client
#[derive(Clone, PartialEq, prost::Message)]
pub struct Content {
    /// Request identifier; the server assigns one when empty
    #[prost(string, tag = "1")]
    pub id: String,

    /// Payload to be reversed, UTF-8 text
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,

    /// Caller context such as `client-id` and `created-on`
    #[prost(map = "string, string", tag = "3")]
    pub metadata: HashMap<String, String>,
}

/// Ping request message
#[derive(Clone, PartialEq, prost::Message)]
pub struct PingRequest {
    /// Client-side send time in unix nanoseconds
    #[prost(int64, tag = "1")]
    pub sent: i64,

    /// Request content; a request without content is rejected
    #[prost(message, optional, tag = "2")]
    pub content: Option<Content>,
}

/// Ping response message
#[derive(Clone, PartialEq, prost::Message)]
pub struct PingResponse {
    /// Identifier copied from the request or assigned by the server
    #[prost(string, tag = "1")]
    pub id: String,

    /// Original payload
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,

    /// Payload with its characters in reverse order
    #[prost(string, tag = "3")]
    pub transformed: String,

    /// Sequence counter value assigned to this request
    #[prost(uint64, tag = "4")]
    pub sequence: u64,

    /// Server-side creation time in unix nanoseconds (UTC)
    #[prost(int64, tag = "5")]
    pub created_at: i64,

    /// Server-observed context, e.g. the bound listener `address`
    #[prost(map = "string, string", tag = "6")]
    pub metadata: HashMap<String, String>,
}

impl PingRequest {
    /// Builds a request carrying `content`, stamped with the current time
    pub fn new(content: Content) -> Self {
        Self {
            sent: now_nanos(),
            content: Some(content),
        }
    }
}

/// Current UTC time in unix nanoseconds
pub fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
}
