//! Transport security: mutual-TLS credential construction

pub mod credentials;

pub use credentials::{build, Artifact, CredentialError, Role, TransportCredential};
