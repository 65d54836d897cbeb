//! Host admin API.
//!
//! The host drives link add/remove and health checks over this API. Every
//! route requires `Authorization: Bearer <admin.api_key>`.
//!
//! | route | effect |
//! |---|---|
//! | `GET /admin/health` | health summary text |
//! | `GET /admin/links` | active links as JSON |
//! | `PUT /admin/links/{actor_id}/{link_name}` | add or replace a link |
//! | `DELETE /admin/links/{actor_id}/{link_name}` | remove a link |

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use std::sync::Arc;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::LinkManager;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub links: Arc<LinkManager>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/health", get(get_health))
        .route("/admin/links", get(list_links))
        .route("/admin/links/{actor_id}/{link_name}", put(put_link).delete(delete_link))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
