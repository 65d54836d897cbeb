//! Shared utilities for integration testing.

#![allow(dead_code)]

use async_trait::async_trait;
use rustls::server::ResolvesServerCert;
use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tailnet_gateway::dispatch::{DispatchError, Dispatcher};
use tailnet_gateway::http::envelope::{decode_request, encode_response, HttpRequest, HttpResponse};
use tailnet_gateway::lifecycle::{LinkManager, LinkSettings};
use tailnet_gateway::overlay::{
    FunnelExposure, IdentityRecord, IdentityResolver, OverlayError, OverlayNetwork, OverlaySession,
};

/// Overlay that binds plain local sockets and hands out a fixed identity.
pub struct MockOverlay {
    identity: Option<IdentityRecord>,
    pub joins: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    /// `join:<hostname>` and `close:<hostname>` in the order they happened.
    events: Arc<Mutex<Vec<String>>>,
}

impl MockOverlay {
    /// Every peer resolves to `identity`.
    pub fn with_identity(identity: IdentityRecord) -> Arc<Self> {
        Arc::new(Self {
            identity: Some(identity),
            joins: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            events: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Every identity lookup fails.
    pub fn without_identity() -> Arc<Self> {
        Arc::new(Self {
            identity: None,
            joins: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            events: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn joins(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn session(&self, hostname: &str) -> Arc<MockSession> {
        Arc::new(MockSession {
            hostname: hostname.to_string(),
            identity: self.identity.clone(),
            closes: self.closes.clone(),
            events: self.events.clone(),
        })
    }
}

#[async_trait]
impl OverlayNetwork for MockOverlay {
    async fn join(&self, hostname: &str, _auth_key: &str) -> Result<Arc<dyn OverlaySession>, OverlayError> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(format!("join:{hostname}"));
        Ok(self.session(hostname))
    }
}

pub struct MockSession {
    hostname: String,
    identity: Option<IdentityRecord>,
    closes: Arc<AtomicUsize>,
    events: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl IdentityResolver for MockSession {
    async fn resolve_identity(&self, remote: SocketAddr) -> Result<IdentityRecord, OverlayError> {
        self.identity.clone().ok_or(OverlayError::UnknownPeer(remote))
    }
}

#[async_trait]
impl OverlaySession for MockSession {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    async fn listen(&self, port: u16) -> Result<TcpListener, OverlayError> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .map_err(|source| OverlayError::Listen { port, source })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| OverlayError::Listen { port, source })?;
        Ok(listener)
    }

    async fn expose_funnel(&self) -> Result<Box<dyn FunnelExposure>, OverlayError> {
        Err(OverlayError::FunnelUnavailable("mock overlay has no funnel".to_string()))
    }

    fn certificate_resolver(&self) -> Result<Arc<dyn ResolvesServerCert>, OverlayError> {
        Err(OverlayError::FunnelUnavailable("mock overlay has no funnel".to_string()))
    }

    async fn close(&self) -> Result<(), OverlayError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(format!("close:{}", self.hostname));
        Ok(())
    }
}

/// Dispatcher that records every request and answers with a fixed reply.
pub struct MockDispatcher {
    reply: Result<HttpResponse, String>,
    delay: Duration,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    requests: Mutex<Vec<(String, String, HttpRequest)>>,
}

impl MockDispatcher {
    fn build(reply: Result<HttpResponse, String>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply,
            delay,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(status_code: u16, body: &[u8]) -> Arc<Self> {
        Self::replying_after(Duration::ZERO, status_code, body)
    }

    /// Replies only after `delay` has passed.
    pub fn replying_after(delay: Duration, status_code: u16, body: &[u8]) -> Arc<Self> {
        Self::build(
            Ok(HttpResponse {
                status_code,
                body: body.to_vec(),
            }),
            delay,
        )
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::build(Err(message.to_string()), Duration::ZERO)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most dispatches that were in progress at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Recorded `(actor_id, operation, request)` triples.
    pub fn requests(&self) -> Vec<(String, String, HttpRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dispatcher for MockDispatcher {
    async fn dispatch(
        &self,
        actor_id: &str,
        payload: Vec<u8>,
        operation: &str,
    ) -> Result<Vec<u8>, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let request = decode_request(&payload).map_err(|e| DispatchError::Transport(e.to_string()))?;
        self.requests
            .lock()
            .unwrap()
            .push((actor_id.to_string(), operation.to_string(), request));

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        match &self.reply {
            Ok(reply) => Ok(encode_response(reply).unwrap()),
            Err(message) => Err(DispatchError::Transport(message.clone())),
        }
    }
}

pub const OPERATION: &str = "HttpServer.HandleRequest";

pub fn settings() -> LinkSettings {
    LinkSettings {
        operation: Arc::from(OPERATION),
        request_timeout: Duration::from_secs(5),
        max_body_bytes: 1024 * 1024,
        max_in_flight: 16,
        shutdown_grace: Duration::from_secs(1),
    }
}

pub fn manager(overlay: Arc<MockOverlay>, dispatcher: Arc<MockDispatcher>) -> LinkManager {
    LinkManager::new(overlay, dispatcher, settings())
}

pub fn manager_with(
    overlay: Arc<MockOverlay>,
    dispatcher: Arc<MockDispatcher>,
    settings: LinkSettings,
) -> LinkManager {
    LinkManager::new(overlay, dispatcher, settings)
}

/// Link values for a direct link on an ephemeral port.
pub fn direct_values(hostname: &str) -> HashMap<String, String> {
    HashMap::from([
        ("port".to_string(), "0".to_string()),
        ("hostname".to_string(), hostname.to_string()),
        ("ts_authkey".to_string(), "tskey-test".to_string()),
    ])
}

pub fn identity(user: &str) -> IdentityRecord {
    IdentityRecord {
        user_id: user.to_string(),
        display_name: format!("User {user}"),
        login_name: format!("{user}@example.com"),
        network_name: "laptop".to_string(),
        profile_picture_url: format!("https://example.com/{user}.png"),
    }
}

pub const FIXTURE_CERT: &str = include_str!("../fixtures/localhost.crt");
pub const FIXTURE_KEY: &str = include_str!("../fixtures/localhost.key");

pub fn fixture_path(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Client that trusts the self-signed fixture certificate.
pub fn tls_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .danger_accept_invalid_certs(true)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
