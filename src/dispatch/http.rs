//! Dispatcher that invokes actors over plain HTTP.
//!
//! Each call is a `POST {endpoint}/actors/{actor_id}/{operation}` carrying the
//! envelope as `application/msgpack`; the response body is the reply envelope.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Uri};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use url::Url;

use crate::config::DispatchConfig;
use crate::dispatch::{DispatchError, Dispatcher};

pub const ENVELOPE_CONTENT_TYPE: &str = "application/msgpack";

/// HTTP client for an actor invocation endpoint.
#[derive(Clone)]
pub struct HttpDispatcher {
    client: Client<HttpConnector, Body>,
    endpoint: String,
    max_reply_bytes: usize,
}

impl HttpDispatcher {
    pub fn new(config: &DispatchConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            client,
            endpoint: config.endpoint.clone(),
            max_reply_bytes: config.max_reply_bytes,
        }
    }

    /// URI for one actor operation. Actor id and operation are each
    /// percent-encoded as a single path segment.
    pub fn target(&self, actor_id: &str, operation: &str) -> Result<Uri, DispatchError> {
        let invalid = |reason: String| DispatchError::InvalidTarget(format!("{actor_id}/{operation}: {reason}"));

        let mut url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("endpoint '{}' cannot take a path", self.endpoint)))?
            .pop_if_empty()
            .extend(["actors", actor_id, operation]);

        url.as_str().parse().map_err(|e: axum::http::uri::InvalidUri| invalid(e.to_string()))
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(
        &self,
        actor_id: &str,
        payload: Vec<u8>,
        operation: &str,
    ) -> Result<Vec<u8>, DispatchError> {
        let uri = self.target(actor_id, operation)?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, ENVELOPE_CONTENT_TYPE)
            .body(Body::from(payload))
            .map_err(|e| DispatchError::InvalidTarget(e.to_string()))?;

        let response: hyper::Response<Incoming> = self
            .client
            .request(request)
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let (parts, body) = response.into_parts();
        let status = parts.status;
        let body = axum::body::to_bytes(Body::new(body), self.max_reply_bytes)
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(DispatchError::Actor {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        tracing::trace!(actor_id, operation, reply_bytes = body.len(), "Actor replied");
        Ok(body.to_vec())
    }
}
