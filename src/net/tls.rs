//! TLS configuration and certificate loading.
//!
//! Link TLS material arrives as base64-encoded PEM text. Decoding happens
//! when the link values are validated; PEM parsing happens when the listener
//! is built. A failure at either step downgrades the link to direct mode.

use std::fmt;
use std::io;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use base64::{engine::general_purpose::STANDARD, Engine};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::ResolvesServerCert;
use rustls::ServerConfig;
use thiserror::Error;

/// Errors raised while preparing TLS for a listener.
#[derive(Debug, Error)]
pub enum TlsMaterialError {
    #[error("failed to decode tls certificate: {0}")]
    CertificateEncoding(base64::DecodeError),

    #[error("failed to decode tls private key: {0}")]
    KeyEncoding(base64::DecodeError),

    #[error("failed to parse tls certificate: {0}")]
    Certificate(io::Error),

    #[error("failed to parse tls private key: {0}")]
    PrivateKey(io::Error),

    #[error("no certificates found in tls certificate")]
    NoCertificates,

    #[error("no private key found in tls private key")]
    NoPrivateKey,

    #[error("failed to create x509 key pair: {0}")]
    KeyPair(rustls::Error),
}

/// A decoded PEM certificate chain and private key.
#[derive(Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("cert_pem", &format_args!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// Decode base64 link values into PEM text.
pub fn decode_tls_material(cert_b64: &str, key_b64: &str) -> Result<TlsMaterial, TlsMaterialError> {
    let cert_pem = STANDARD
        .decode(cert_b64)
        .map_err(TlsMaterialError::CertificateEncoding)?;
    let key_pem = STANDARD
        .decode(key_b64)
        .map_err(TlsMaterialError::KeyEncoding)?;
    Ok(TlsMaterial { cert_pem, key_pem })
}

/// Parse a PEM certificate chain.
pub fn parse_cert_chain(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, TlsMaterialError> {
    let mut reader = pem;
    let certificates = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(TlsMaterialError::Certificate)?;
    if certificates.is_empty() {
        return Err(TlsMaterialError::NoCertificates);
    }
    Ok(certificates)
}

/// Parse the first PEM private key (PKCS#8, PKCS#1 or SEC1).
pub fn parse_private_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>, TlsMaterialError> {
    let mut reader = pem;
    rustls_pemfile::private_key(&mut reader)
        .map_err(TlsMaterialError::PrivateKey)?
        .ok_or(TlsMaterialError::NoPrivateKey)
}

fn server_config_builder() -> Result<rustls::ConfigBuilder<ServerConfig, rustls::WantsVerifier>, TlsMaterialError> {
    ServerConfig::builder_with_provider(Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(TlsMaterialError::KeyPair)
}

/// Build a server config from a link's own certificate and key.
pub fn local_tls_config(material: &TlsMaterial) -> Result<RustlsConfig, TlsMaterialError> {
    let certs = parse_cert_chain(&material.cert_pem)?;
    let key = parse_private_key(&material.key_pem)?;

    let mut config = server_config_builder()?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(TlsMaterialError::KeyPair)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(RustlsConfig::from_config(Arc::new(config)))
}

/// Build a server config whose certificate is fetched per handshake.
pub fn on_demand_tls_config(
    resolver: Arc<dyn ResolvesServerCert>,
) -> Result<RustlsConfig, TlsMaterialError> {
    let mut config = server_config_builder()?
        .with_no_client_auth()
        .with_cert_resolver(resolver);
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(RustlsConfig::from_config(Arc::new(config)))
}
