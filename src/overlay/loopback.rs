//! Loopback overlay client.
//!
//! Stands in for a real overlay node on a single machine: "joining" records the
//! node name, listeners bind on a local address, identities come from a static
//! table, and funnel exposure is only offered when a certificate pair has been
//! configured for it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::net::{IpAddr, SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;

use crate::config::OverlayConfig;
use crate::net::mode::FUNNEL_PORT;
use crate::net::tls::{parse_cert_chain, parse_private_key};
use crate::overlay::{
    FunnelExposure, IdentityRecord, IdentityResolver, OverlayError, OverlayNetwork, OverlaySession,
};

/// Overlay client backed by local sockets.
#[derive(Debug, Clone)]
pub struct LoopbackOverlay {
    bind_host: IpAddr,
    funnel_port: u16,
    identities: Arc<HashMap<IpAddr, IdentityRecord>>,
    default_identity: Option<IdentityRecord>,
    funnel_key: Option<Arc<CertifiedKey>>,
}

impl LoopbackOverlay {
    /// Build from settings, loading funnel certificates from disk if configured.
    pub fn from_config(config: &OverlayConfig) -> Result<Self, OverlayError> {
        let funnel_key = match (&config.funnel_cert_path, &config.funnel_key_path) {
            (Some(cert_path), Some(key_path)) => {
                let read = |path: &std::path::Path| {
                    fs::read(path).map_err(|e| {
                        OverlayError::FunnelUnavailable(format!("{}: {}", path.display(), e))
                    })
                };
                let certs = parse_cert_chain(&read(cert_path)?)
                    .map_err(|e| OverlayError::FunnelUnavailable(e.to_string()))?;
                let key = parse_private_key(&read(key_path)?)
                    .map_err(|e| OverlayError::FunnelUnavailable(e.to_string()))?;
                let signing_key = rustls::crypto::aws_lc_rs::sign::any_supported_type(&key)
                    .map_err(|e| OverlayError::FunnelUnavailable(e.to_string()))?;
                Some(Arc::new(CertifiedKey::new(certs, signing_key)))
            }
            _ => None,
        };

        let identities = config
            .identities
            .iter()
            .map(|entry| (entry.address, entry.identity.clone()))
            .collect();

        Ok(Self {
            bind_host: config.bind_host,
            funnel_port: config.funnel_port.unwrap_or(FUNNEL_PORT),
            identities: Arc::new(identities),
            default_identity: config.default_identity.clone(),
            funnel_key,
        })
    }
}

#[async_trait]
impl OverlayNetwork for LoopbackOverlay {
    async fn join(&self, hostname: &str, auth_key: &str) -> Result<Arc<dyn OverlaySession>, OverlayError> {
        if auth_key.is_empty() {
            return Err(OverlayError::Join {
                hostname: hostname.to_string(),
                reason: "empty auth key".to_string(),
            });
        }

        tracing::info!(hostname, bind_host = %self.bind_host, "Joined loopback overlay");

        Ok(Arc::new(LoopbackSession {
            hostname: hostname.to_string(),
            overlay: self.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// One node on the loopback overlay.
#[derive(Debug)]
pub struct LoopbackSession {
    hostname: String,
    overlay: LoopbackOverlay,
    closed: AtomicBool,
}

#[async_trait]
impl IdentityResolver for LoopbackSession {
    async fn resolve_identity(&self, remote: SocketAddr) -> Result<IdentityRecord, OverlayError> {
        self.overlay
            .identities
            .get(&remote.ip())
            .or(self.overlay.default_identity.as_ref())
            .cloned()
            .ok_or(OverlayError::UnknownPeer(remote))
    }
}

#[async_trait]
impl OverlaySession for LoopbackSession {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    async fn listen(&self, port: u16) -> Result<TcpListener, OverlayError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(OverlayError::AlreadyClosed);
        }

        let real_port = if port == FUNNEL_PORT { self.overlay.funnel_port } else { port };
        let listener = TcpListener::bind((self.overlay.bind_host, real_port))
            .map_err(|source| OverlayError::Listen { port, source })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| OverlayError::Listen { port, source })?;
        Ok(listener)
    }

    async fn expose_funnel(&self) -> Result<Box<dyn FunnelExposure>, OverlayError> {
        if self.overlay.funnel_key.is_none() {
            return Err(OverlayError::FunnelUnavailable(
                "no funnel certificate configured".to_string(),
            ));
        }
        tracing::info!(hostname = %self.hostname, "Funnel exposed");
        Ok(Box::new(LoopbackFunnel {
            hostname: self.hostname.clone(),
            open: true,
        }))
    }

    fn certificate_resolver(&self) -> Result<Arc<dyn ResolvesServerCert>, OverlayError> {
        let key = self.overlay.funnel_key.clone().ok_or_else(|| {
            OverlayError::FunnelUnavailable("no funnel certificate configured".to_string())
        })?;
        Ok(Arc::new(StaticCertResolver(key)))
    }

    async fn close(&self) -> Result<(), OverlayError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(OverlayError::AlreadyClosed);
        }
        tracing::info!(hostname = %self.hostname, "Left loopback overlay");
        Ok(())
    }
}

struct LoopbackFunnel {
    hostname: String,
    open: bool,
}

#[async_trait]
impl FunnelExposure for LoopbackFunnel {
    async fn close(&mut self) -> Result<(), OverlayError> {
        if !std::mem::replace(&mut self.open, false) {
            return Err(OverlayError::AlreadyClosed);
        }
        tracing::info!(hostname = %self.hostname, "Funnel closed");
        Ok(())
    }
}

/// Serves the same certificate for every handshake.
#[derive(Debug)]
struct StaticCertResolver(Arc<CertifiedKey>);

impl ResolvesServerCert for StaticCertResolver {
    fn resolve(&self, _client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        Some(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::IdentityEntry;
    use std::net::Ipv4Addr;

    fn identity(user: &str) -> IdentityRecord {
        IdentityRecord {
            user_id: user.to_string(),
            display_name: format!("User {user}"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn resolves_table_then_default() {
        let mut config = OverlayConfig::default();
        config.identities.push(IdentityEntry {
            address: IpAddr::V4(Ipv4Addr::new(100, 64, 0, 1)),
            identity: identity("u1"),
        });
        config.default_identity = Some(identity("anyone"));

        let overlay = LoopbackOverlay::from_config(&config).unwrap();
        let session = overlay.join("node", "key").await.unwrap();

        let known = session
            .resolve_identity("100.64.0.1:5555".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(known.user_id, "u1");

        let other = session
            .resolve_identity("100.64.0.9:5555".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(other.user_id, "anyone");
    }

    #[tokio::test]
    async fn unknown_peer_without_default_fails() {
        let overlay = LoopbackOverlay::from_config(&OverlayConfig::default()).unwrap();
        let session = overlay.join("node", "key").await.unwrap();
        let err = session
            .resolve_identity("10.1.2.3:80".parse().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no identity known for peer 10.1.2.3:80");
    }

    #[tokio::test]
    async fn join_requires_auth_key() {
        let overlay = LoopbackOverlay::from_config(&OverlayConfig::default()).unwrap();
        assert!(matches!(
            overlay.join("node", "").await,
            Err(OverlayError::Join { .. })
        ));
    }

    #[tokio::test]
    async fn funnel_needs_certificate() {
        let overlay = LoopbackOverlay::from_config(&OverlayConfig::default()).unwrap();
        let session = overlay.join("node", "key").await.unwrap();
        assert!(matches!(
            session.expose_funnel().await,
            Err(OverlayError::FunnelUnavailable(_))
        ));
        assert!(session.certificate_resolver().is_err());
    }

    #[tokio::test]
    async fn close_twice_is_benign() {
        let overlay = LoopbackOverlay::from_config(&OverlayConfig::default()).unwrap();
        let session = overlay.join("node", "key").await.unwrap();
        session.close().await.unwrap();
        assert!(matches!(session.close().await, Err(OverlayError::AlreadyClosed)));
        assert!(matches!(session.listen(0).await, Err(OverlayError::AlreadyClosed)));
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port() {
        let overlay = LoopbackOverlay::from_config(&OverlayConfig::default()).unwrap();
        let session = overlay.join("node", "key").await.unwrap();
        let listener = session.listen(0).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }
}
