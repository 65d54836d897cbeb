//! Exposure mode selection.
//!
//! | funnel | TLS material | mode |
//! |---|---|---|
//! | true | ignored | [`ExposureMode::PublicFunnel`] on port 443 |
//! | false | present | [`ExposureMode::LocalTls`] on the link port |
//! | false | absent | [`ExposureMode::Direct`] on the link port |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::LinkConfig;

/// Port the funnel ingress always forwards to.
pub const FUNNEL_PORT: u16 = 443;

/// How a link's listener is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureMode {
    /// Plain HTTP on the overlay interface.
    Direct,
    /// HTTPS on the overlay interface with the link's own certificate.
    LocalTls,
    /// Public HTTPS through the overlay funnel, certificate from the overlay.
    PublicFunnel,
}

impl ExposureMode {
    /// Pick the mode for a validated link.
    pub fn select(config: &LinkConfig) -> Self {
        if config.funnel {
            ExposureMode::PublicFunnel
        } else if config.tls.is_some() {
            ExposureMode::LocalTls
        } else {
            ExposureMode::Direct
        }
    }

    /// Port the listener binds for this mode.
    pub fn port(&self, config: &LinkConfig) -> u16 {
        match self {
            ExposureMode::PublicFunnel => FUNNEL_PORT,
            ExposureMode::LocalTls | ExposureMode::Direct => config.port,
        }
    }

    pub fn is_tls(&self) -> bool {
        !matches!(self, ExposureMode::Direct)
    }
}

impl fmt::Display for ExposureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExposureMode::Direct => "direct",
            ExposureMode::LocalTls => "local_tls",
            ExposureMode::PublicFunnel => "public_funnel",
        };
        f.write_str(name)
    }
}
