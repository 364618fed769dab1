use crate::common::TlsConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::sign::CertifiedKey;
use rustls::{InconsistentKeys, RootCertStore};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tonic::transport::{Certificate, ClientTlsConfig, Identity, ServerTlsConfig};
use tracing::{debug, info};

/// Which side of the connection the credential is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

/// TLS material a credential is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    CaBundle,
    Certificate,
    PrivateKey,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::CaBundle => write!(f, "ca file"),
            Artifact::Certificate => write!(f, "cert file"),
            Artifact::PrivateKey => write!(f, "key file"),
        }
    }
}

/// Failure to build transport credentials
#[derive(Error, Debug)]
pub enum CredentialError {
    /// One or more of the ca/cert/key paths is not configured
    #[error("missing certificates: {}", join_artifacts(.missing))]
    Missing { missing: Vec<Artifact> },

    /// A configured artifact could not be read or parsed
    #[error("error loading {artifact} {}: {reason}", .path.display())]
    Load {
        artifact: Artifact,
        path: PathBuf,
        reason: String,
    },
}

fn join_artifacts(artifacts: &[Artifact]) -> String {
    artifacts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Transport security for one side of a connection
#[derive(Debug, Clone)]
pub enum TransportCredential {
    /// Presents the local pair and requires verified client certificates
    Server(ServerTlsConfig),
    /// Presents the local pair and verifies the server against the CA pool
    Client(ClientTlsConfig),
}

/// PEM material that passed validation
struct LoadedPem {
    ca: Vec<u8>,
    cert: Vec<u8>,
    key: Vec<u8>,
}

/// Builds mutual-TLS credentials for `role` from `config`
///
/// Every call reads the files again, so rotated material is picked up by
/// the next connection or server start.
pub fn build(config: &TlsConfig, role: Role) -> Result<TransportCredential, CredentialError> {
    match role {
        Role::Server => server_credentials(config).map(TransportCredential::Server),
        Role::Client => client_credentials(config).map(TransportCredential::Client),
    }
}

/// Server-role credentials: client certificates are required and verified
fn server_credentials(config: &TlsConfig) -> Result<ServerTlsConfig, CredentialError> {
    let pem = load(config, Role::Server)?;
    Ok(ServerTlsConfig::new()
        .identity(Identity::from_pem(pem.cert, pem.key))
        .client_ca_root(Certificate::from_pem(pem.ca)))
}

/// Client-role credentials: the server is verified against the CA pool
fn client_credentials(config: &TlsConfig) -> Result<ClientTlsConfig, CredentialError> {
    let pem = load(config, Role::Client)?;
    let mut tls = ClientTlsConfig::new()
        .ca_certificate(Certificate::from_pem(pem.ca))
        .identity(Identity::from_pem(pem.cert, pem.key));
    if let Some(name) = config.peer_name() {
        tls = tls.domain_name(name);
    }
    Ok(tls)
}

fn load(config: &TlsConfig, role: Role) -> Result<LoadedPem, CredentialError> {
    let (ca_path, cert_path, key_path) = required_paths(config)?;
    info!(ca = %ca_path.display(), cert = %cert_path.display(), key = %key_path.display(), ?role, "Using TLS");

    let ca = read_artifact(Artifact::CaBundle, ca_path)?;
    let roots = load_roots(ca_path, &ca)?;
    debug!(roots = roots.len(), "Loaded trust pool");

    let cert = read_artifact(Artifact::Certificate, cert_path)?;
    let key = read_artifact(Artifact::PrivateKey, key_path)?;
    check_key_pair(cert_path, &cert, key_path, &key)?;

    Ok(LoadedPem { ca, cert, key })
}

fn required_paths(config: &TlsConfig) -> Result<(&Path, &Path, &Path), CredentialError> {
    match (config.ca(), config.cert(), config.key()) {
        (Some(ca), Some(cert), Some(key)) => Ok((ca, cert, key)),
        (ca, cert, key) => {
            let missing = [
                (ca.is_none(), Artifact::CaBundle),
                (cert.is_none(), Artifact::Certificate),
                (key.is_none(), Artifact::PrivateKey),
            ]
            .into_iter()
            .filter_map(|(absent, artifact)| absent.then_some(artifact))
            .collect();
            Err(CredentialError::Missing { missing })
        }
    }
}

fn load_error(artifact: Artifact, path: &Path, reason: impl Into<String>) -> CredentialError {
    CredentialError::Load {
        artifact,
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn read_artifact(artifact: Artifact, path: &Path) -> Result<Vec<u8>, CredentialError> {
    std::fs::read(path).map_err(|e| load_error(artifact, path, e.to_string()))
}

fn parse_certs(
    artifact: Artifact,
    path: &Path,
    pem: &[u8],
) -> Result<Vec<CertificateDer<'static>>, CredentialError> {
    let certs = rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| load_error(artifact, path, format!("malformed PEM: {e}")))?;
    if certs.is_empty() {
        return Err(load_error(artifact, path, "no PEM certificates found"));
    }
    Ok(certs)
}

fn load_roots(path: &Path, pem: &[u8]) -> Result<RootCertStore, CredentialError> {
    let certs = parse_certs(Artifact::CaBundle, path, pem)?;
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);
    if added == 0 {
        return Err(load_error(
            Artifact::CaBundle,
            path,
            format!("error adding CA: none of {ignored} certificates could be parsed"),
        ));
    }
    Ok(roots)
}

fn parse_key(path: &Path, pem: &[u8]) -> Result<PrivateKeyDer<'static>, CredentialError> {
    match rustls_pemfile::private_key(&mut &pem[..]) {
        Ok(Some(key)) => Ok(key),
        Ok(None) => Err(load_error(Artifact::PrivateKey, path, "no PEM private key found")),
        Err(e) => Err(load_error(Artifact::PrivateKey, path, format!("malformed PEM: {e}"))),
    }
}

/// Verifies that the key is usable and belongs to the leaf certificate
fn check_key_pair(
    cert_path: &Path,
    cert_pem: &[u8],
    key_path: &Path,
    key_pem: &[u8],
) -> Result<(), CredentialError> {
    let certs = parse_certs(Artifact::Certificate, cert_path, cert_pem)?;
    let key = parse_key(key_path, key_pem)?;
    let signing_key = rustls::crypto::ring::sign::any_supported_type(&key)
        .map_err(|e| load_error(Artifact::PrivateKey, key_path, e.to_string()))?;

    match CertifiedKey::new(certs, signing_key).keys_match() {
        Ok(()) => Ok(()),
        // The key type cannot report its public half; nothing to compare.
        Err(rustls::Error::InconsistentKeys(InconsistentKeys::Unknown)) => Ok(()),
        Err(rustls::Error::InconsistentKeys(InconsistentKeys::KeyMismatch)) => Err(load_error(
            Artifact::PrivateKey,
            key_path,
            format!("private key does not match certificate {}", cert_path.display()),
        )),
        Err(e) => Err(load_error(Artifact::Certificate, cert_path, e.to_string())),
    }
}
