use crate::security::CredentialError;
use thiserror::Error;

/// Error types for the pingsrv library
#[derive(Error, Debug)]
pub enum PingError {
    /// Absent or malformed request
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Bad or incomplete TLS material
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Dialing the target failed
    #[error("error dialing {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: tonic::transport::Error,
    },

    /// The call context was cancelled
    #[error("request is canceled")]
    Cancelled,

    /// The call context ran past its deadline
    #[error("deadline is exceeded")]
    DeadlineExceeded,

    /// Read or write failure on an open stream
    #[error("I/O error: {0}")]
    Io(String),

    /// Operation not provided by this server build
    #[error("unimplemented: {0}")]
    Unimplemented(String),

    /// A client call failed; carries the message that was being sent
    #[error("error on ping {message:?}: {source}")]
    Ping {
        message: String,
        #[source]
        source: Box<PingError>,
    },

    /// Status returned by the remote peer
    #[error("rpc error: {0}")]
    Status(tonic::Status),

    /// Server transport errors (bind, serve)
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

impl PingError {
    /// Tags an error with the message whose call produced it
    pub fn for_message(self, message: impl Into<String>) -> Self {
        PingError::Ping {
            message: message.into(),
            source: Box::new(self),
        }
    }
}

impl From<PingError> for tonic::Status {
    fn from(err: PingError) -> Self {
        match err {
            PingError::InvalidArgument(msg) => tonic::Status::invalid_argument(msg),
            PingError::Credential(e) => tonic::Status::unauthenticated(e.to_string()),
            PingError::Cancelled => tonic::Status::cancelled("request is canceled"),
            PingError::DeadlineExceeded => tonic::Status::deadline_exceeded("deadline is exceeded"),
            PingError::Io(msg) => tonic::Status::unavailable(msg),
            PingError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            PingError::Status(status) => status,
            PingError::Ping { source, .. } => (*source).into(),
            other => tonic::Status::internal(other.to_string()),
        }
    }
}

impl From<tonic::Status> for PingError {
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::InvalidArgument => PingError::InvalidArgument(status.message().to_string()),
            tonic::Code::Cancelled => PingError::Cancelled,
            tonic::Code::DeadlineExceeded => PingError::DeadlineExceeded,
            tonic::Code::Unimplemented => PingError::Unimplemented(status.message().to_string()),
            _ => PingError::Status(status),
        }
    }
}

/// Result type for the pingsrv library
pub type Result<T> = std::result::Result<T, PingError>;

pub mod api;
pub mod client;
pub mod common;
pub mod security;
pub mod service;

// Re-export main types for convenience
pub use api::{Content, PingRequest, PingResponse};
pub use client::{ClientConfig, ClientConfigBuilder, PingClient};
pub use common::{CallContext, TlsConfig};
pub use security::{Role, TransportCredential};
pub use service::{PingServer, PingService, SequenceCounter, ServerConfig};
