//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Client connection (per link)
//!     → server.rs (admission, tracing, deadline)
//!     → overlay identity lookup for the peer
//!     → headers.rs (capture, inject identity)
//!     → envelope.rs (encode request)
//!     → Dispatcher (actor)
//!     → envelope.rs (decode reply)
//!     → headers.rs (merge, content-type override)
//!     → Send to client
//!
//! Any failure on the way → response.rs (plain-text 500)
//! ```

pub mod envelope;
pub mod headers;
pub mod response;
pub mod server;

pub use envelope::{HeaderMultimap, HttpRequest, HttpResponse};
pub use response::GatewayError;
pub use server::{build_router, LinkState};
