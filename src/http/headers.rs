//! Header handling between the client, the actor and the response.
//!
//! # Responsibilities
//! - Capture request headers into an ordered multimap for the envelope
//! - Inject caller identity headers, replacing anything the client sent
//! - Merge the request-side header set into the outgoing response
//! - Force a content type for stylesheet and script paths
//!
//! # Design Decisions
//! - Keys use canonical MIME casing (`Content-Type`) as actors expect
//! - Framing and hop-by-hop headers describe the inbound message and are
//!   never copied onto the response

use axum::http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

use crate::http::envelope::HeaderMultimap;
use crate::overlay::IdentityRecord;

pub const PROVIDER_MARKER: &str = "wasmcloud_provider";
pub const WEBAUTH_USER: &str = "X-Webauth-User";
pub const WEBAUTH_NAME: &str = "X-Webauth-Name";
pub const WEBAUTH_LOGIN: &str = "X-Webauth-Login";
pub const WEBAUTH_TAILNET: &str = "X-Webauth-Tailnet";
pub const WEBAUTH_PROFILE_PICTURE: &str = "X-Webauth-Profile-Picture";

/// Never copied from the request onto the response.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "content-length",
    "host",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Canonical MIME form of a header name: `x-webauth-user` → `X-Webauth-User`.
///
/// Names with characters outside `[A-Za-z0-9-]` are returned unchanged.
pub fn canonical_header_key(name: &str) -> String {
    if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return name.to_string();
    }
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() };
            upper = c == '-';
            out
        })
        .collect()
}

/// Capture request headers in the order they arrived.
pub fn collect_headers(headers: &HeaderMap) -> HeaderMultimap {
    let mut collected = HeaderMultimap::with_capacity(headers.keys_len());
    for name in headers.keys() {
        let values = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect();
        collected.insert(canonical_header_key(name.as_str()), values);
    }
    collected
}

/// Replace every value of `name` (any casing) with `value`.
pub fn set_single(headers: &mut HeaderMultimap, name: &str, value: &str) {
    headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
    headers.insert(name.to_string(), vec![value.to_string()]);
}

/// Stamp the gateway marker and the caller's identity onto the request.
pub fn inject_identity(headers: &mut HeaderMultimap, identity: &IdentityRecord) {
    set_single(headers, PROVIDER_MARKER, "true");
    set_single(headers, WEBAUTH_USER, &identity.user_id);
    set_single(headers, WEBAUTH_NAME, &identity.display_name);
    set_single(headers, WEBAUTH_LOGIN, &identity.login_name);
    set_single(headers, WEBAUTH_TAILNET, &identity.network_name);
    set_single(headers, WEBAUTH_PROFILE_PICTURE, &identity.profile_picture_url);
}

/// Merge `source` into `target`.
///
/// The first value seen for a name becomes its only value; later values are
/// appended. Names or values that are not valid HTTP are skipped.
pub fn merge_headers(target: &mut HeaderMap, source: &HeaderMultimap) {
    for (key, values) in source {
        let name = match HeaderName::from_bytes(key.as_bytes()) {
            Ok(name) => name,
            Err(_) => {
                tracing::warn!(header = %key, "Skipping invalid header name");
                continue;
            }
        };
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }

        for value in values {
            let value = match HeaderValue::from_str(value) {
                Ok(value) => value,
                Err(_) => {
                    tracing::warn!(header = %key, "Skipping invalid header value");
                    continue;
                }
            };
            let unset = target.get(&name).map_or(true, |v| v.is_empty());
            if unset {
                target.insert(name.clone(), value);
            } else {
                target.append(name.clone(), value);
            }
        }
    }
}

/// Content type implied by the final `.`-separated segment of `path`.
pub fn content_type_for_path(path: &str) -> Option<&'static str> {
    match path.rsplit('.').next() {
        Some("css") => Some("text/css"),
        Some("js") => Some("application/javascript"),
        _ => None,
    }
}

/// Force the content type for `.css` and `.js` paths, whatever is already set.
pub fn apply_content_type_override(path: &str, headers: &mut HeaderMap) -> Option<&'static str> {
    let content_type = content_type_for_path(path)?;
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    tracing::debug!(path, headers = ?headers, "Content type overridden");
    Some(content_type)
}
