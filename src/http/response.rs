//! Per-request failures and their HTTP rendering.
//!
//! # Design Decisions
//! - Every failure is terminal for its request; nothing is retried
//! - Failures reach the client as plain-text 500s carrying the error text
//! - Each kind is counted separately for metrics

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::http::envelope::EnvelopeError;
use crate::observability::metrics;
use crate::overlay::OverlayError;
use crate::resilience::timeouts::DeadlineExceeded;

/// Why a request could not be answered by the actor.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Identity(OverlayError),

    #[error("failed to read request body: {0}")]
    Body(axum::Error),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Deadline(#[from] DeadlineExceeded),

    #[error("gateway is shutting down")]
    Closed,
}

impl GatewayError {
    /// Label used in metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Identity(_) => "identity",
            GatewayError::Body(_) => "body",
            GatewayError::Envelope(_) => "envelope",
            GatewayError::Dispatch(_) => "dispatch",
            GatewayError::Deadline(_) => "deadline",
            GatewayError::Closed => "closed",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        metrics::record_request_error(self.kind());
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    #[tokio::test]
    async fn renders_plain_text_500_with_error_text() {
        let peer: SocketAddr = "100.64.0.7:41000".parse().unwrap();
        let response = GatewayError::Identity(OverlayError::UnknownPeer(peer)).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"no identity known for peer 100.64.0.7:41000");
    }

    #[test]
    fn dispatch_errors_keep_their_text() {
        let err = GatewayError::from(DispatchError::Transport("connection refused".into()));
        assert_eq!(err.kind(), "dispatch");
        assert_eq!(err.to_string(), "actor transport error: connection refused");
    }
}
