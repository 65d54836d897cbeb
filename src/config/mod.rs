//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared with the link manager, admin API and observability
//!
//! Host link event (flat string map):
//!     → link.rs (required fields, funnel flag, TLS material decode)
//!     → LinkConfig (validated, immutable)
//!     → lifecycle::link (listener construction)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All process settings have defaults to allow minimal configs
//! - Link validation reports every bad field, TLS problems only downgrade

pub mod link;
pub mod loader;
pub mod schema;
pub mod validation;

pub use link::{LinkConfig, LinkConfigError};
pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
pub use schema::OverlayConfig;
pub use schema::DispatchConfig;
pub use schema::ObservabilityConfig;
