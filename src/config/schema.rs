//! Configuration schema definitions.
//!
//! Process-wide settings for the gateway. All types derive Serde traits for
//! deserialization from the TOML settings file; every field has a default so
//! an empty file (or no file) yields a working development setup.
//!
//! Per-link settings are not part of this file; they arrive from the host as
//! flat string maps and are validated in [`crate::config::link`].

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::overlay::IdentityRecord;

/// Root configuration for the gateway process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Per-link listener limits.
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Actor dispatch settings.
    pub dispatch: DispatchConfig,

    /// Overlay network client settings.
    pub overlay: OverlayConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Host admin API.
    pub admin: AdminConfig,
}

/// Listener configuration applied to every link.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Maximum requests in flight per link (backpressure).
    pub max_connections: usize,

    /// Maximum request body accepted before the request fails.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_connections: 1024,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline covering identity lookup, body read and actor dispatch.
    pub request_secs: u64,

    /// Time in-flight requests get to finish when a link is torn down.
    pub shutdown_grace_secs: u64,
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_grace_secs: 5,
        }
    }
}

/// Actor invocation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Base URL of the actor invocation endpoint.
    pub endpoint: String,

    /// Operation name the actor handles HTTP requests under.
    pub operation: String,

    /// Largest reply accepted from the actor.
    pub max_reply_bytes: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:4000".to_string(),
            operation: "HttpServer.HandleRequest".to_string(),
            max_reply_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Settings for the loopback overlay client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Local address that stands in for the overlay interface.
    pub bind_host: IpAddr,

    /// Real port used when a link asks for the funnel port (443).
    pub funnel_port: Option<u16>,

    /// PEM certificate chain served for funnel exposure.
    pub funnel_cert_path: Option<PathBuf>,

    /// PEM private key served for funnel exposure.
    pub funnel_key_path: Option<PathBuf>,

    /// Known peers and the identity each resolves to.
    pub identities: Vec<IdentityEntry>,

    /// Identity returned for peers missing from `identities`.
    pub default_identity: Option<IdentityRecord>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            funnel_port: None,
            funnel_cert_path: None,
            funnel_key_path: None,
            identities: Vec::new(),
            default_identity: None,
        }
    }
}

/// A static identity table entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityEntry {
    /// Peer address (port is ignored when matching).
    pub address: IpAddr,

    #[serde(flatten)]
    pub identity: IdentityRecord,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
