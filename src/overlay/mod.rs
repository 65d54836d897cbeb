//! Overlay network client boundary.
//!
//! # Data Flow
//! ```text
//! LinkManager::configure
//!     → OverlayNetwork::join(hostname, auth key) → OverlaySession
//!     → OverlaySession::listen(port)             → TCP listener on the overlay
//!     → OverlaySession::expose_funnel()          → public ingress (funnel mode)
//!     → OverlaySession::certificate_resolver()   → per-handshake certificates
//!
//! Per request:
//!     → IdentityResolver::resolve_identity(peer) → IdentityRecord
//!
//! Teardown:
//!     → FunnelExposure::close → listener shutdown → OverlaySession::close
//! ```
//!
//! The overlay's membership and authentication protocols live behind these
//! traits. [`loopback`] provides a local implementation for development and
//! tests.

pub mod loopback;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

use rustls::server::ResolvesServerCert;

pub use loopback::LoopbackOverlay;

/// Caller identity as reported by the overlay for one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct IdentityRecord {
    pub user_id: String,
    pub display_name: String,
    pub login_name: String,
    /// Name of the overlay node the connection came from.
    pub network_name: String,
    pub profile_picture_url: String,
}

/// Errors reported by the overlay client.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("failed to join overlay network as '{hostname}': {reason}")]
    Join { hostname: String, reason: String },

    #[error("failed to listen on overlay port {port}: {source}")]
    Listen { port: u16, source: io::Error },

    #[error("funnel is not available: {0}")]
    FunnelUnavailable(String),

    #[error("no identity known for peer {0}")]
    UnknownPeer(SocketAddr),

    #[error("identity lookup failed: {0}")]
    Lookup(String),

    #[error("overlay session already closed")]
    AlreadyClosed,
}

/// Looks up who is on the other end of a connection.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve_identity(&self, remote: SocketAddr) -> Result<IdentityRecord, OverlayError>;
}

/// Entry point into the overlay network.
#[async_trait]
pub trait OverlayNetwork: Send + Sync {
    /// Register `hostname` as a node using `auth_key`.
    async fn join(&self, hostname: &str, auth_key: &str) -> Result<Arc<dyn OverlaySession>, OverlayError>;
}

/// Membership of one node in the overlay network.
#[async_trait]
pub trait OverlaySession: IdentityResolver {
    fn hostname(&self) -> &str;

    /// Bind a TCP listener on the node's overlay address.
    async fn listen(&self, port: u16) -> Result<std::net::TcpListener, OverlayError>;

    /// Open the node to the public internet through the funnel ingress.
    async fn expose_funnel(&self) -> Result<Box<dyn FunnelExposure>, OverlayError>;

    /// Certificates for the node's overlay DNS name, resolved per handshake.
    fn certificate_resolver(&self) -> Result<Arc<dyn ResolvesServerCert>, OverlayError>;

    /// Leave the overlay network.
    async fn close(&self) -> Result<(), OverlayError>;
}

/// A live public funnel exposure.
#[async_trait]
pub trait FunnelExposure: Send + Sync {
    async fn close(&mut self) -> Result<(), OverlayError>;
}
