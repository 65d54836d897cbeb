//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! LinkConfig
//!     → mode.rs (Direct / LocalTls / PublicFunnel, listen port)
//!     → tls.rs (link certificate or per-handshake overlay certificate)
//!     → listener.rs (overlay listener, serve task, teardown)
//!     → Hand off to HTTP layer
//!
//! Listener States:
//!     Listening → Closed
//! ```
//!
//! # Design Decisions
//! - Funnel always listens on 443 with overlay-provided certificates
//! - Invalid link TLS material falls back to plain HTTP on the link port
//! - Teardown is idempotent and tolerates partial failures

pub mod listener;
pub mod mode;
pub mod tls;

pub use listener::{ListenError, ListenerHandle};
pub use mode::ExposureMode;
