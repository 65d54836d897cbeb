use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;

use crate::admin::AdminState;
use crate::lifecycle::{LinkDefinition, LinkError, LinkId, LinkLifecycle, LinkSummary};

impl IntoResponse for LinkError {
    fn into_response(self) -> Response {
        let status = if self.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::BAD_GATEWAY
        };
        (status, self.to_string()).into_response()
    }
}

pub async fn get_health(State(state): State<AdminState>) -> String {
    state.links.health_check().await
}

pub async fn list_links(State(state): State<AdminState>) -> Json<Vec<LinkSummary>> {
    Json(state.links.links().await)
}

pub async fn put_link(
    State(state): State<AdminState>,
    Path((actor_id, link_name)): Path<(String, String)>,
    Json(values): Json<HashMap<String, String>>,
) -> Result<StatusCode, LinkError> {
    state
        .links
        .on_link_add(LinkDefinition {
            actor_id,
            link_name,
            values,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_link(
    State(state): State<AdminState>,
    Path((actor_id, link_name)): Path<(String, String)>,
) -> Result<StatusCode, LinkError> {
    state
        .links
        .on_link_remove(&LinkId::new(actor_id, link_name))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
