//! Per-link HTTP server.
//!
//! # Responsibilities
//! - Build the Axum router a link's listener serves
//! - Bound in-flight requests per link (backpressure)
//! - Resolve caller identity and inject it into the request headers
//! - Transcode the request into an envelope and dispatch it to the actor
//! - Turn the actor's reply into the client response
//! - Put one deadline over the whole exchange

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::dispatch::Dispatcher;
use crate::http::envelope::{
    decode_response, encode_request, EnvelopeError, HeaderMultimap, HttpRequest, HttpResponse,
};
use crate::http::headers::{apply_content_type_override, collect_headers, inject_identity, merge_headers};
use crate::http::response::GatewayError;
use crate::observability::metrics;
use crate::overlay::OverlaySession;
use crate::resilience::timeouts::with_deadline;

/// Everything a link's request handler needs.
#[derive(Clone)]
pub struct LinkState {
    /// Actor receiving this link's requests.
    pub actor_id: Arc<str>,
    /// Operation name passed to the dispatcher.
    pub operation: Arc<str>,
    /// Overlay session used for identity lookups.
    pub overlay: Arc<dyn OverlaySession>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    /// Permits for requests in flight on this link.
    pub admission: Arc<Semaphore>,
}

/// Build the router for one link.
pub fn build_router(state: LinkState) -> Router {
    let admission = state.admission.clone();
    Router::new()
        .route("/{*path}", any(gateway_handler))
        .route("/", any(gateway_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(admission, admit)),
        )
}

/// Wait for an in-flight slot before handling the request.
async fn admit(State(permits): State<Arc<Semaphore>>, request: Request, next: Next) -> Response {
    let Ok(_permit) = permits.acquire_owned().await else {
        return GatewayError::Closed.into_response();
    };
    next.run(request).await
}

/// Main gateway handler.
/// Resolves the caller, forwards to the actor and relays the reply.
async fn gateway_handler(
    State(state): State<LinkState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "gateway_request",
        %request_id,
        %peer,
        method = %request.method(),
        path = %request.uri().path(),
        actor_id = %state.actor_id
    );

    let result = with_deadline(state.request_timeout, forward(&state, peer, request))
        .instrument(span.clone())
        .await
        .map_err(GatewayError::from)
        .and_then(|inner| inner);

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            span.in_scope(|| tracing::warn!(error = %e, kind = e.kind(), "Request failed"));
            e.into_response()
        }
    };

    metrics::record_request(response.status().as_u16(), start);
    response
}

async fn forward(
    state: &LinkState,
    peer: SocketAddr,
    request: Request,
) -> Result<Response, GatewayError> {
    let identity = state
        .overlay
        .resolve_identity(peer)
        .await
        .map_err(GatewayError::Identity)?;

    let (parts, body) = request.into_parts();
    let mut headers = collect_headers(&parts.headers);
    inject_identity(&mut headers, &identity);

    let body = axum::body::to_bytes(body, state.max_body_bytes)
        .await
        .map_err(GatewayError::Body)?;

    let envelope = HttpRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query_string: parts.uri.query().unwrap_or_default().to_string(),
        headers,
        body: body.to_vec(),
    };
    let payload = encode_request(&envelope)?;

    let reply = state
        .dispatcher
        .dispatch(&state.actor_id, payload, &state.operation)
        .await?;
    let reply = decode_response(&reply)?;
    tracing::debug!(status = reply.status_code, body_bytes = reply.body.len(), "Actor replied");

    build_response(&envelope.path, &envelope.headers, reply)
}

/// Assemble the client response from the actor's reply.
///
/// Status and body come from the reply. Headers come from the request-side
/// set, then the path-based content type override.
pub fn build_response(
    path: &str,
    headers: &HeaderMultimap,
    reply: HttpResponse,
) -> Result<Response, GatewayError> {
    let status = StatusCode::from_u16(reply.status_code)
        .map_err(|_| EnvelopeError::InvalidStatus(reply.status_code))?;

    let mut response = Response::new(Body::from(reply.body));
    *response.status_mut() = status;
    merge_headers(response.headers_mut(), headers);
    apply_content_type_override(path, response.headers_mut());
    Ok(response)
}
