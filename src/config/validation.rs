//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Check that optional file pairs are supplied together
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a loaded configuration for values serde cannot reject.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.dispatch.operation.is_empty() {
        errors.push(ValidationError::new("dispatch.operation", "must not be empty"));
    }
    if !config.dispatch.endpoint.starts_with("http://") {
        errors.push(ValidationError::new(
            "dispatch.endpoint",
            format!("'{}' must be an http:// URL", config.dispatch.endpoint),
        ));
    }

    match (&config.overlay.funnel_cert_path, &config.overlay.funnel_key_path) {
        (Some(_), None) | (None, Some(_)) => errors.push(ValidationError::new(
            "overlay.funnel_cert_path",
            "funnel certificate and key must be set together",
        )),
        _ => {}
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.admin.enabled {
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "admin.bind_address",
                format!("'{}' is not a socket address", config.admin.bind_address),
            ));
        }
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_error() {
        let mut config = GatewayConfig::default();
        config.listener.max_connections = 0;
        config.timeouts.request_secs = 0;
        config.dispatch.endpoint = "unix:///tmp/actor.sock".to_string();
        config.overlay.funnel_cert_path = Some(PathBuf::from("cert.pem"));

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.max_connections",
                "timeouts.request_secs",
                "dispatch.endpoint",
                "overlay.funnel_cert_path",
            ]
        );
    }

    #[test]
    fn admin_address_checked_only_when_enabled() {
        let mut config = GatewayConfig::default();
        config.admin.bind_address = "nowhere".to_string();
        assert!(validate_config(&config).is_err());

        config.admin.enabled = false;
        assert!(validate_config(&config).is_ok());
    }
}
