//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Links (link.rs):
//!     Host add    → validate values → join overlay → bind listener → registry
//!     Host remove → registry → funnel close → drain listener → leave overlay
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop admin API → tear down every link → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Links are independent; one failing to bind leaves the others running
//! - Re-adding a link id replaces the running link
//! - Teardown has a grace period for in-flight requests

pub mod link;
pub mod shutdown;
pub mod signals;

pub use link::{LinkDefinition, LinkError, LinkId, LinkLifecycle, LinkManager, LinkSettings, LinkSummary};
pub use shutdown::Shutdown;
