use std::path::{Path, PathBuf};

/// Locations of the TLS material and the expected server name
///
/// Built once at process start and never mutated afterwards.
///
/// # Examples
///
/// ```
/// use pingsrv::common::TlsConfig;
///
/// let tls = TlsConfig {
///     ca_path: Some("certs/ca.pem".into()),
///     cert_path: Some("certs/client.pem".into()),
///     key_path: Some("certs/client.key".into()),
///     peer_name: Some("localhost".to_string()),
/// };
/// assert!(tls.has_credentials());
/// ```
///
/// A partially filled configuration is requested but incomplete:
///
/// ```
/// use pingsrv::common::TlsConfig;
///
/// let tls = TlsConfig {
///     cert_path: Some("certs/server.pem".into()),
///     ..Default::default()
/// };
/// assert!(tls.is_requested());
/// assert!(!tls.has_credentials());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    /// PEM bundle of the trusted certificate authorities
    pub ca_path: Option<PathBuf>,
    /// PEM certificate presented to the peer
    pub cert_path: Option<PathBuf>,
    /// PEM private key matching `cert_path`
    pub key_path: Option<PathBuf>,
    /// Name the server must present; only used by clients
    pub peer_name: Option<String>,
}

impl TlsConfig {
    /// Returns the CA path if set and non-empty
    pub fn ca(&self) -> Option<&Path> {
        non_empty(&self.ca_path)
    }

    /// Returns the certificate path if set and non-empty
    pub fn cert(&self) -> Option<&Path> {
        non_empty(&self.cert_path)
    }

    /// Returns the key path if set and non-empty
    pub fn key(&self) -> Option<&Path> {
        non_empty(&self.key_path)
    }

    /// Returns the expected server name if set and non-empty
    pub fn peer_name(&self) -> Option<&str> {
        self.peer_name.as_deref().filter(|name| !name.is_empty())
    }

    /// True when the CA, certificate and key paths are all present
    pub fn has_credentials(&self) -> bool {
        self.ca().is_some() && self.cert().is_some() && self.key().is_some()
    }

    /// True when any certificate material is configured
    pub fn is_requested(&self) -> bool {
        self.ca().is_some() || self.cert().is_some() || self.key().is_some()
    }
}

fn non_empty(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| !p.as_os_str().is_empty())
}
