//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every request runs inside a span carrying a request ID and the peer address
//! - The request ID stays local; it is never forwarded to the actor
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
