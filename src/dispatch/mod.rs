//! Actor invocation boundary.
//!
//! The gateway hands each encoded request envelope to a [`Dispatcher`] along
//! with the target actor and the operation name, and gets the encoded reply
//! envelope back. How the bytes reach the actor is the dispatcher's concern.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

pub use self::http::HttpDispatcher;

/// Errors from delivering a request to an actor.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid dispatch target: {0}")]
    InvalidTarget(String),

    #[error("actor transport error: {0}")]
    Transport(String),

    #[error("actor returned {status}: {message}")]
    Actor { status: u16, message: String },
}

/// Delivers an opaque payload to a named operation on an actor.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(
        &self,
        actor_id: &str,
        payload: Vec<u8>,
        operation: &str,
    ) -> Result<Vec<u8>, DispatchError>;
}
