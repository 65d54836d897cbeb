//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request handling:
//!     → timeouts.rs (one deadline over identity lookup, body read, dispatch)
//!     → On expiry: the in-flight future is dropped, cancelling the dispatch
//! ```
//!
//! # Design Decisions
//! - Every external call made on behalf of a request sits under a deadline
//! - No retries: a failed request is reported to the client as-is
pub mod timeouts;
