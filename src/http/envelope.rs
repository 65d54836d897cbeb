//! Binary request/response envelopes exchanged with the actor.
//!
//! Envelopes are MessagePack maps keyed by field name. The schema is shared
//! with the actor side and must not change:
//!
//! ```text
//! request  { method, path, queryString, header: { name: [value, ...] }, body: bin }
//! response { statusCode, body: bin }
//! ```
//!
//! A reply may carry further fields (for example a `header` map); they are
//! ignored.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Header names to their values, in the order the request supplied them.
pub type HeaderMultimap = IndexMap<String, Vec<String>>;

/// Request envelope sent to the actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query_string: String,
    #[serde(rename = "header")]
    pub headers: HeaderMultimap,
    #[serde(with = "serde_bytes")]
    pub body: Vec<u8>,
}

/// Reply envelope received from the actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    #[serde(with = "serde_bytes", default)]
    pub body: Vec<u8>,
}

fn default_status_code() -> u16 {
    200
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status_code: default_status_code(),
            body: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode envelope: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("response envelope carries invalid status code {0}")]
    InvalidStatus(u16),
}

/// A writer that only counts bytes.
#[derive(Debug, Default)]
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, EnvelopeError> {
    // Size pass first so the output is allocated exactly once.
    let mut sizer = ByteCounter::default();
    rmp_serde::encode::write_named(&mut sizer, value)?;

    let mut buf = Vec::with_capacity(sizer.0);
    rmp_serde::encode::write_named(&mut buf, value)?;
    debug_assert_eq!(buf.len(), sizer.0);
    Ok(buf)
}

/// Serialize a request envelope for dispatch.
pub fn encode_request(request: &HttpRequest) -> Result<Vec<u8>, EnvelopeError> {
    encode(request)
}

/// Deserialize an actor's reply envelope.
pub fn decode_response(bytes: &[u8]) -> Result<HttpResponse, EnvelopeError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Actor-side counterpart of [`encode_request`].
pub fn decode_request(bytes: &[u8]) -> Result<HttpRequest, EnvelopeError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Actor-side counterpart of [`decode_response`].
pub fn encode_response(response: &HttpResponse) -> Result<Vec<u8>, EnvelopeError> {
    encode(response)
}
