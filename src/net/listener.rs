//! Link listener construction and teardown.
//!
//! # Responsibilities
//! - Bind the overlay listener for the link's exposure mode
//! - Wrap it in TLS (link certificate or overlay-provided certificate)
//! - Serve the link's router until teardown
//! - Close funnel, listener and overlay session in that order
//!
//! # Design Decisions
//! - Bad link TLS material downgrades to direct mode instead of failing
//! - Funnel setup failures are errors; funnel never serves plain HTTP
//! - Teardown attempts every close and reports the first failure

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::LinkConfig;
use crate::net::mode::ExposureMode;
use crate::net::tls::{local_tls_config, on_demand_tls_config, TlsMaterialError};
use crate::observability::metrics;
use crate::overlay::{FunnelExposure, OverlayError, OverlaySession};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenError {
    /// Overlay refused the listener or funnel.
    #[error(transparent)]
    Overlay(#[from] OverlayError),

    /// Funnel certificate setup failed.
    #[error("failed to configure funnel tls: {0}")]
    FunnelTls(TlsMaterialError),

    /// Listener bound but could not be inspected.
    #[error("failed to bind: {0}")]
    Bind(io::Error),

    /// Server stopped with an error.
    #[error("listener failed: {0}")]
    Serve(io::Error),

    /// Server task panicked or was cancelled.
    #[error("listener task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerState {
    Listening,
    Closed,
}

/// Owns everything a running link holds open.
pub struct ListenerHandle {
    mode: ExposureMode,
    local_addr: SocketAddr,
    server: Handle,
    task: Option<JoinHandle<io::Result<()>>>,
    funnel: Option<Box<dyn FunnelExposure>>,
    session: Arc<dyn OverlaySession>,
    grace: Duration,
    state: ListenerState,
}

impl ListenerHandle {
    /// Bind and start serving `router` for `config` on `session`.
    ///
    /// On error, anything opened here has been closed again; the session
    /// itself stays open and belongs to the caller.
    pub async fn start(
        config: &LinkConfig,
        session: Arc<dyn OverlaySession>,
        router: Router,
        grace: Duration,
    ) -> Result<Self, ListenError> {
        let mut mode = ExposureMode::select(config);
        let mut funnel = None;
        let tls = match (mode, &config.tls) {
            (ExposureMode::PublicFunnel, _) => {
                let (exposure, tls) = open_funnel(session.as_ref()).await?;
                funnel = Some(exposure);
                Some(tls)
            }
            (ExposureMode::LocalTls, Some(material)) => match local_tls_config(material) {
                Ok(tls) => Some(tls),
                Err(e) => {
                    tracing::error!(
                        actor_id = %config.actor_id,
                        error = %e,
                        "Invalid TLS material, serving without TLS"
                    );
                    metrics::record_tls_fallback();
                    mode = ExposureMode::Direct;
                    None
                }
            },
            _ => None,
        };

        let port = mode.port(config);
        let listener = match session.listen(port).await.map_err(ListenError::from).and_then(|l| {
            let addr = l.local_addr().map_err(ListenError::Bind)?;
            Ok((l, addr))
        }) {
            Ok(bound) => bound,
            Err(e) => {
                if let Some(mut exposure) = funnel {
                    if let Err(close_err) = exposure.close().await {
                        tracing::warn!(error = %close_err, "Failed to close funnel after bind error");
                    }
                }
                return Err(e);
            }
        };
        let (listener, local_addr) = listener;

        let server = Handle::new();
        let app = router.into_make_service_with_connect_info::<SocketAddr>();
        let task = match tls {
            Some(tls) => tokio::spawn(
                axum_server::from_tcp_rustls(listener, tls)
                    .handle(server.clone())
                    .serve(app),
            ),
            None => tokio::spawn(axum_server::from_tcp(listener).handle(server.clone()).serve(app)),
        };

        tracing::info!(
            actor_id = %config.actor_id,
            hostname = %session.hostname(),
            mode = %mode,
            address = %local_addr,
            "Link listening"
        );

        Ok(Self {
            mode,
            local_addr,
            server,
            task: Some(task),
            funnel,
            session,
            grace,
            state: ListenerState::Listening,
        })
    }

    /// Mode actually in effect (after any TLS fallback).
    pub fn mode(&self) -> ExposureMode {
        self.mode
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn hostname(&self) -> &str {
        self.session.hostname()
    }

    pub fn is_listening(&self) -> bool {
        self.state == ListenerState::Listening
    }

    /// Open client connections.
    pub fn connection_count(&self) -> usize {
        self.server.connection_count()
    }

    /// Close the funnel, the listener and the overlay session.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub async fn teardown(&mut self) -> Result<(), ListenError> {
        if self.state == ListenerState::Closed {
            tracing::debug!(address = %self.local_addr, "Listener already closed");
            return Ok(());
        }
        self.state = ListenerState::Closed;

        let mut first_error: Option<ListenError> = None;

        if let Some(mut exposure) = self.funnel.take() {
            if let Err(e) = exposure.close().await {
                tracing::warn!(error = %e, "Failed to close funnel");
                first_error.get_or_insert(e.into());
            }
        }

        self.server.graceful_shutdown(Some(self.grace));
        if let Some(task) = self.task.take() {
            let outcome = match task.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ListenError::Serve(e)),
                Err(e) => Err(ListenError::Task(e)),
            };
            if let Err(e) = outcome {
                tracing::warn!(error = %e, "Listener stopped with error");
                first_error.get_or_insert(e);
            }
        }

        if let Err(e) = self.session.close().await {
            tracing::warn!(error = %e, "Failed to leave overlay network");
            first_error.get_or_insert(e.into());
        }

        tracing::info!(address = %self.local_addr, mode = %self.mode, "Link closed");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if self.state == ListenerState::Listening {
            self.server.shutdown();
        }
    }
}

async fn open_funnel(
    session: &dyn OverlaySession,
) -> Result<(Box<dyn FunnelExposure>, RustlsConfig), ListenError> {
    let mut exposure = session.expose_funnel().await?;
    let tls = session
        .certificate_resolver()
        .map_err(ListenError::from)
        .and_then(|resolver| on_demand_tls_config(resolver).map_err(ListenError::FunnelTls));

    match tls {
        Ok(tls) => Ok((exposure, tls)),
        Err(e) => {
            if let Err(close_err) = exposure.close().await {
                tracing::warn!(error = %close_err, "Failed to close funnel after tls error");
            }
            Err(e)
        }
    }
}
