//! Mutual-TLS credential bundles for service-to-service RPC.
//!
//! Both sides load a PEM certificate chain, its private key, and the peer's
//! CA. The resulting `rustls` configs only negotiate TLS 1.3; the server
//! requires and verifies a client certificate.

use std::path::Path;
use std::sync::Arc;

use rustls::crypto::{CryptoProvider, ring};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{ClientConfig, ProtocolVersion, RootCertStore, ServerConfig};
use tracing::info;

use crate::config::{ConfigError, TlsSettings};

/// Lowest protocol version any bundle will negotiate.
pub const MIN_PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::TLSv1_3;

static PROTOCOL_VERSIONS: &[&rustls::SupportedProtocolVersion] = &[&rustls::version::TLS13];

/// How a bundle authenticates its peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerPolicy {
    /// Server side: a client certificate chaining to the CA pool is mandatory.
    RequireAndVerifyClientCert,
    /// Client side: the server certificate must chain to the CA pool.
    VerifyServerCert,
}

/// Server-side mTLS bundle. Cheap to clone; the config is shared.
#[derive(Debug, Clone)]
pub struct ServerCredentials {
    config: Arc<ServerConfig>,
    trust_anchors: usize,
}

impl ServerCredentials {
    /// Load the server identity and the CA that client certificates must
    /// chain to.
    pub fn build(cert_path: &Path, key_path: &Path, client_ca_path: &Path) -> Result<Self, ConfigError> {
        let chain = load_certs(cert_path)?;
        let key = load_private_key(key_path)?;
        let roots = load_trust_pool(client_ca_path)?;
        let trust_anchors = roots.len();
        let provider = provider();

        let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
            .build()
            .map_err(|e| ConfigError::Tls(format!("client verifier: {e}")))?;

        let config = ServerConfig::builder_with_provider(provider)
            .with_protocol_versions(PROTOCOL_VERSIONS)
            .map_err(|e| ConfigError::Tls(format!("protocol versions: {e}")))?
            .with_client_cert_verifier(verifier)
            .with_single_cert(chain, key)
            .map_err(|e| {
                ConfigError::Tls(format!(
                    "server key pair {} / {}: {e}",
                    cert_path.display(),
                    key_path.display()
                ))
            })?;

        info!(cert = %cert_path.display(), trust_anchors, "built server mTLS credentials");
        Ok(Self {
            config: Arc::new(config),
            trust_anchors,
        })
    }

    /// Build from settings; `None` when TLS is not configured.
    pub fn from_settings(settings: &TlsSettings) -> Result<Option<Self>, ConfigError> {
        settings
            .paths()
            .map(|(cert, key, ca)| Self::build(cert, key, ca))
            .transpose()
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }

    pub fn policy(&self) -> PeerPolicy {
        PeerPolicy::RequireAndVerifyClientCert
    }

    pub fn min_protocol_version(&self) -> ProtocolVersion {
        MIN_PROTOCOL_VERSION
    }

    pub fn trust_anchors(&self) -> usize {
        self.trust_anchors
    }
}

/// Client-side mTLS bundle. Cheap to clone; the config is shared.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    config: Arc<ClientConfig>,
    trust_anchors: usize,
}

impl ClientCredentials {
    /// Load the client identity and the CA the server certificate must
    /// chain to.
    pub fn build(cert_path: &Path, key_path: &Path, server_ca_path: &Path) -> Result<Self, ConfigError> {
        let chain = load_certs(cert_path)?;
        let key = load_private_key(key_path)?;
        let roots = load_trust_pool(server_ca_path)?;
        let trust_anchors = roots.len();

        let config = ClientConfig::builder_with_provider(provider())
            .with_protocol_versions(PROTOCOL_VERSIONS)
            .map_err(|e| ConfigError::Tls(format!("protocol versions: {e}")))?
            .with_root_certificates(roots)
            .with_client_auth_cert(chain, key)
            .map_err(|e| {
                ConfigError::Tls(format!(
                    "client key pair {} / {}: {e}",
                    cert_path.display(),
                    key_path.display()
                ))
            })?;

        info!(cert = %cert_path.display(), trust_anchors, "built client mTLS credentials");
        Ok(Self {
            config: Arc::new(config),
            trust_anchors,
        })
    }

    /// Build from settings; `None` when TLS is not configured.
    pub fn from_settings(settings: &TlsSettings) -> Result<Option<Self>, ConfigError> {
        settings
            .paths()
            .map(|(cert, key, ca)| Self::build(cert, key, ca))
            .transpose()
    }

    pub fn config(&self) -> Arc<ClientConfig> {
        self.config.clone()
    }

    pub fn policy(&self) -> PeerPolicy {
        PeerPolicy::VerifyServerCert
    }

    pub fn min_protocol_version(&self) -> ProtocolVersion {
        MIN_PROTOCOL_VERSION
    }

    pub fn trust_anchors(&self) -> usize {
        self.trust_anchors
    }
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(ring::default_provider())
}

fn read(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Every certificate in a PEM file. At least one is required.
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ConfigError> {
    let pem = read(path)?;
    let certs = CertificateDer::pem_slice_iter(&pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ConfigError::Tls(format!("{}: {e}", path.display())))?;
    if certs.is_empty() {
        return Err(ConfigError::Tls(format!(
            "{}: no certificates found",
            path.display()
        )));
    }
    Ok(certs)
}

/// The first private key (PKCS#8, PKCS#1 or SEC1) in a PEM file.
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, ConfigError> {
    let pem = read(path)?;
    PrivateKeyDer::from_pem_slice(&pem)
        .map_err(|e| ConfigError::Tls(format!("{}: no usable private key: {e}", path.display())))
}

fn load_trust_pool(path: &Path) -> Result<RootCertStore, ConfigError> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(path)? {
        roots
            .add(cert)
            .map_err(|e| ConfigError::Tls(format!("{}: {e}", path.display())))?;
    }
    Ok(roots)
}
