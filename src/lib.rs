//! Overlay-network HTTP gateway library.
//!
//! Accepts HTTP on an overlay network node, attributes each caller through
//! the overlay, and forwards every request to a backend actor as a binary
//! envelope.

pub mod admin;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod overlay;
pub mod resilience;

pub use config::{GatewayConfig, LinkConfig};
pub use dispatch::{Dispatcher, HttpDispatcher};
pub use lifecycle::{LinkDefinition, LinkId, LinkLifecycle, LinkManager, Shutdown};
pub use net::{ExposureMode, ListenerHandle};
pub use overlay::{IdentityRecord, LoopbackOverlay, OverlayNetwork, OverlaySession};
