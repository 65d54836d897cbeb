//! Link registry and the host-facing lifecycle calls.
//!
//! Every active link owns one overlay session and one [`ListenerHandle`].
//! Links are keyed by [`LinkId`], so any number of links can run side by
//! side and each can be replaced or removed on its own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};

use crate::config::{GatewayConfig, LinkConfig, LinkConfigError};
use crate::dispatch::Dispatcher;
use crate::http::server::{build_router, LinkState};
use crate::net::{ExposureMode, ListenError, ListenerHandle};
use crate::observability::metrics;
use crate::overlay::{OverlayError, OverlayNetwork};

/// Identifies one link: `actor_id/link_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId {
    pub actor_id: String,
    pub link_name: String,
}

impl LinkId {
    pub fn new(actor_id: impl Into<String>, link_name: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            link_name: link_name.into(),
        }
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.actor_id, self.link_name)
    }
}

/// A link as the host hands it over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LinkDefinition {
    pub actor_id: String,
    pub link_name: String,
    pub values: HashMap<String, String>,
}

impl LinkDefinition {
    pub fn id(&self) -> LinkId {
        LinkId::new(self.actor_id.clone(), self.link_name.clone())
    }
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Config(#[from] LinkConfigError),

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Listen(#[from] ListenError),
}

impl LinkError {
    /// True when the host supplied bad values, as opposed to a runtime failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, LinkError::Config(_))
    }
}

/// Calls the host makes as links come and go.
#[async_trait]
pub trait LinkLifecycle: Send + Sync {
    /// Start serving a link, replacing any link with the same id.
    async fn on_link_add(&self, definition: LinkDefinition) -> Result<(), LinkError>;

    /// Stop serving a link. Unknown ids are not an error.
    async fn on_link_remove(&self, id: &LinkId) -> Result<(), LinkError>;

    /// Short human-readable status.
    async fn health_check(&self) -> String;
}

/// Process-wide settings every link is built with.
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub operation: Arc<str>,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    pub max_in_flight: usize,
    pub shutdown_grace: Duration,
}

impl LinkSettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            operation: Arc::from(config.dispatch.operation.as_str()),
            request_timeout: config.timeouts.request(),
            max_body_bytes: config.listener.max_body_bytes,
            max_in_flight: config.listener.max_connections,
            shutdown_grace: config.timeouts.shutdown_grace(),
        }
    }
}

/// One row of the active link listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSummary {
    pub id: String,
    pub actor_id: String,
    pub link_name: String,
    pub hostname: String,
    pub mode: ExposureMode,
    pub local_address: SocketAddr,
}

/// Per-link slot. Holding its lock serializes configure and teardown of one
/// link without blocking any other link.
type LinkSlot = Arc<Mutex<Option<ListenerHandle>>>;

struct LinkEntry {
    slot: LinkSlot,
    /// Set while the link is listening.
    summary: Option<LinkSummary>,
}

/// Owns every running link.
pub struct LinkManager {
    overlay: Arc<dyn OverlayNetwork>,
    dispatcher: Arc<dyn Dispatcher>,
    settings: LinkSettings,
    /// Only held for map updates, never across overlay or listener calls.
    registry: Mutex<HashMap<LinkId, LinkEntry>>,
}

impl LinkManager {
    pub fn new(
        overlay: Arc<dyn OverlayNetwork>,
        dispatcher: Arc<dyn Dispatcher>,
        settings: LinkSettings,
    ) -> Self {
        Self {
            overlay,
            dispatcher,
            settings,
            registry: Mutex::new(HashMap::new()),
        }
    }

    /// Validate, join and bind one link.
    ///
    /// The overlay session is closed again if the listener cannot start.
    async fn start_link(&self, definition: &LinkDefinition) -> Result<ListenerHandle, LinkError> {
        let config = LinkConfig::from_values(&definition.actor_id, &definition.values)?;
        tracing::debug!(link = %definition.id(), config = ?config, "Link values accepted");

        let session = self.overlay.join(&config.hostname, &config.auth_key).await?;

        let state = LinkState {
            actor_id: Arc::from(config.actor_id.as_str()),
            operation: self.settings.operation.clone(),
            overlay: session.clone(),
            dispatcher: self.dispatcher.clone(),
            request_timeout: self.settings.request_timeout,
            max_body_bytes: self.settings.max_body_bytes,
            admission: Arc::new(Semaphore::new(self.settings.max_in_flight)),
        };
        let router = build_router(state);

        match ListenerHandle::start(&config, session.clone(), router, self.settings.shutdown_grace).await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                if let Err(close_err) = session.close().await {
                    tracing::warn!(error = %close_err, "Failed to leave overlay after listen error");
                }
                Err(e.into())
            }
        }
    }

    /// Slot for `id`, created if missing.
    async fn claim_slot(&self, id: &LinkId) -> LinkSlot {
        let mut registry = self.registry.lock().await;
        registry
            .entry(id.clone())
            .or_insert_with(|| LinkEntry {
                slot: Arc::new(Mutex::new(None)),
                summary: None,
            })
            .slot
            .clone()
    }

    /// Record the listing row for `id` and refresh the active gauge.
    async fn publish(&self, id: &LinkId, summary: Option<LinkSummary>) {
        let mut registry = self.registry.lock().await;
        if let Some(entry) = registry.get_mut(id) {
            entry.summary = summary;
        }
        metrics::set_links_active(registry.values().filter(|e| e.summary.is_some()).count());
    }

    /// Drop the entry for `id` when it is idle and nobody else holds its slot.
    ///
    /// Slots are only cloned under the registry lock, so a count of two (the
    /// map and the caller) means no other task is waiting on it.
    async fn release_slot(&self, id: &LinkId, slot: &LinkSlot) {
        let mut registry = self.registry.lock().await;
        let idle = registry.get(id).is_some_and(|entry| {
            Arc::ptr_eq(&entry.slot, slot) && entry.summary.is_none() && Arc::strong_count(slot) == 2
        });
        if idle {
            registry.remove(id);
        }
    }

    /// Active links, ordered by id.
    pub async fn links(&self) -> Vec<LinkSummary> {
        let registry = self.registry.lock().await;
        let mut summaries: Vec<_> = registry
            .values()
            .filter_map(|entry| entry.summary.clone())
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// Local address of a running link.
    pub async fn local_addr(&self, id: &LinkId) -> Option<SocketAddr> {
        let registry = self.registry.lock().await;
        registry
            .get(id)
            .and_then(|entry| entry.summary.as_ref())
            .map(|summary| summary.local_address)
    }

    /// Tear down every link.
    pub async fn shutdown_all(&self) {
        let ids: Vec<LinkId> = self.registry.lock().await.keys().cloned().collect();
        for id in ids {
            if let Err(e) = self.on_link_remove(&id).await {
                tracing::warn!(link = %id, error = %e, "Link teardown failed");
            }
        }
        tracing::info!("All links closed");
    }
}

fn summarize(id: &LinkId, handle: &ListenerHandle) -> LinkSummary {
    LinkSummary {
        id: id.to_string(),
        actor_id: id.actor_id.clone(),
        link_name: id.link_name.clone(),
        hostname: handle.hostname().to_string(),
        mode: handle.mode(),
        local_address: handle.local_addr(),
    }
}

#[async_trait]
impl LinkLifecycle for LinkManager {
    async fn on_link_add(&self, definition: LinkDefinition) -> Result<(), LinkError> {
        let id = definition.id();
        let slot = self.claim_slot(&id).await;
        let mut current = slot.lock().await;

        // The replacement may want the same port, so the old one goes first.
        if let Some(mut previous) = current.take() {
            tracing::info!(link = %id, "Replacing existing link");
            self.publish(&id, None).await;
            if let Err(e) = previous.teardown().await {
                tracing::warn!(link = %id, error = %e, "Previous link did not close cleanly");
            }
        }

        let outcome = match self.start_link(&definition).await {
            Ok(handle) => {
                tracing::info!(
                    link = %id,
                    mode = %handle.mode(),
                    address = %handle.local_addr(),
                    "Link added"
                );
                self.publish(&id, Some(summarize(&id, &handle))).await;
                *current = Some(handle);
                Ok(())
            }
            Err(e) => {
                tracing::error!(link = %id, error = %e, "Failed to add link");
                Err(e)
            }
        };

        if current.is_none() {
            self.release_slot(&id, &slot).await;
        }
        outcome
    }

    async fn on_link_remove(&self, id: &LinkId) -> Result<(), LinkError> {
        let slot = {
            let registry = self.registry.lock().await;
            match registry.get(id) {
                Some(entry) => entry.slot.clone(),
                None => {
                    tracing::debug!(link = %id, "Remove for unknown link");
                    return Ok(());
                }
            }
        };

        // Held through teardown so a concurrent add of this id waits for it.
        let mut current = slot.lock().await;
        let result = match current.take() {
            Some(mut handle) => {
                self.publish(id, None).await;
                let result = handle.teardown().await;
                if result.is_ok() {
                    tracing::info!(link = %id, "Link removed");
                }
                result.map_err(LinkError::from)
            }
            None => {
                tracing::debug!(link = %id, "Remove for link that is not listening");
                Ok(())
            }
        };

        self.release_slot(id, &slot).await;
        result
    }

    async fn health_check(&self) -> String {
        let registry = self.registry.lock().await;
        let count = registry.values().filter(|entry| entry.summary.is_some()).count();
        format!("healthy: {} link(s) active", count)
    }
}
