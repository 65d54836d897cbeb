//! Link configuration parsing.
//!
//! The host hands each link over as a flat string map. This module turns that
//! map into an immutable [`LinkConfig`], reporting every missing or invalid
//! field at once.
//!
//! Recognized keys:
//!
//! | key | meaning |
//! |---|---|
//! | `port` | TCP port for direct and local TLS exposure |
//! | `hostname` | overlay node name to register |
//! | `ts_authkey` | overlay join credential |
//! | `funnel` | boolean; expose publicly through the overlay funnel |
//! | `tls_cert`, `tls_private_key` | base64 PEM pair for local TLS |

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::net::tls::{decode_tls_material, TlsMaterial};
use crate::observability::metrics;

pub const KEY_PORT: &str = "port";
pub const KEY_HOSTNAME: &str = "hostname";
pub const KEY_AUTH_KEY: &str = "ts_authkey";
pub const KEY_FUNNEL: &str = "funnel";
pub const KEY_TLS_CERT: &str = "tls_cert";
pub const KEY_TLS_PRIVATE_KEY: &str = "tls_private_key";

/// A single problem with a link's values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkFieldError {
    #[error("missing required link value '{0}'")]
    Missing(&'static str),

    #[error("link value '{key}' is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Link values rejected; no listener is started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct LinkConfigError {
    pub errors: Vec<LinkFieldError>,
}

impl fmt::Display for LinkConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid link settings: ")?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

/// Validated, immutable settings for one link.
#[derive(Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Actor that receives this link's requests.
    pub actor_id: String,
    pub port: u16,
    pub hostname: String,
    pub auth_key: String,
    pub funnel: bool,
    /// Local TLS material. Always `None` for funnel links.
    pub tls: Option<TlsMaterial>,
}

impl fmt::Debug for LinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkConfig")
            .field("actor_id", &self.actor_id)
            .field("port", &self.port)
            .field("hostname", &self.hostname)
            .field("auth_key", &"<redacted>")
            .field("funnel", &self.funnel)
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

impl LinkConfig {
    /// Validate the host-supplied values for `actor_id`.
    ///
    /// `port`, `hostname` and `ts_authkey` are required. An unparsable
    /// `funnel` is logged and read as `false`. TLS material that fails to
    /// decode is logged and dropped, leaving the link in direct mode.
    pub fn from_values(
        actor_id: &str,
        values: &HashMap<String, String>,
    ) -> Result<Self, LinkConfigError> {
        let mut errors = Vec::new();
        let value = |key: &str| values.get(key).map(String::as_str).unwrap_or("");

        let port = match value(KEY_PORT) {
            "" => {
                errors.push(LinkFieldError::Missing(KEY_PORT));
                0
            }
            raw => match raw.parse::<u16>() {
                Ok(port) => port,
                Err(e) => {
                    errors.push(LinkFieldError::Invalid {
                        key: KEY_PORT,
                        reason: e.to_string(),
                    });
                    0
                }
            },
        };

        let hostname = value(KEY_HOSTNAME);
        if hostname.is_empty() {
            errors.push(LinkFieldError::Missing(KEY_HOSTNAME));
        }

        let auth_key = value(KEY_AUTH_KEY);
        if auth_key.is_empty() {
            errors.push(LinkFieldError::Missing(KEY_AUTH_KEY));
        }

        if !errors.is_empty() {
            return Err(LinkConfigError { errors });
        }

        let funnel = match value(KEY_FUNNEL) {
            "" => false,
            raw => parse_bool(raw).unwrap_or_else(|| {
                tracing::error!(actor_id, value = raw, "Failed to parse funnel input");
                false
            }),
        };

        let cert = value(KEY_TLS_CERT);
        let key = value(KEY_TLS_PRIVATE_KEY);
        let tls = if funnel || cert.is_empty() || key.is_empty() {
            None
        } else {
            match decode_tls_material(cert, key) {
                Ok(material) => Some(material),
                Err(e) => {
                    tracing::error!(actor_id, error = %e, "Ignoring TLS material, serving without TLS");
                    metrics::record_tls_fallback();
                    None
                }
            }
        };

        Ok(Self {
            actor_id: actor_id.to_string(),
            port,
            hostname: hostname.to_string(),
            auth_key: auth_key.to_string(),
            funnel,
            tls,
        })
    }
}

/// Boolean spellings accepted by link values.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
