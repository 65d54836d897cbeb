//! Host admin API over HTTP.

use axum::http::StatusCode;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use tailnet_gateway::admin::{setup_admin_router, AdminState};
use tailnet_gateway::lifecycle::LinkManager;

mod common;

use common::{MockDispatcher, MockOverlay};

const KEY: &str = "test-admin-key";

async fn start_admin(links: Arc<LinkManager>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = setup_admin_router(AdminState {
        links,
        api_key: Arc::from(KEY),
    });
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn links() -> Arc<LinkManager> {
    Arc::new(common::manager(
        MockOverlay::with_identity(common::identity("u1")),
        MockDispatcher::replying(200, b"ok"),
    ))
}

#[tokio::test]
async fn requests_without_the_key_are_rejected() {
    let addr = start_admin(links()).await;
    let client = common::client();

    let missing = client
        .get(format!("http://{}/admin/health", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = client
        .get(format!("http://{}/admin/links", addr))
        .bearer_auth("not-the-key")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn put_list_and_delete_a_link() {
    let manager = links();
    let addr = start_admin(manager.clone()).await;
    let client = common::client();
    let link_url = format!("http://{}/admin/links/MACTOR/default", addr);

    let put = client
        .put(&link_url)
        .bearer_auth(KEY)
        .json(&common::direct_values("admin-test"))
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), StatusCode::NO_CONTENT);

    let listed: Value = client
        .get(format!("http://{}/admin/links", addr))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed[0]["id"], "MACTOR/default");
    assert_eq!(listed[0]["hostname"], "admin-test");
    assert_eq!(listed[0]["mode"], "direct");

    let health = client
        .get(format!("http://{}/admin/health", addr))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(health.text().await.unwrap(), "healthy: 1 link(s) active");

    let delete = client.delete(&link_url).bearer_auth(KEY).send().await.unwrap();
    assert_eq!(delete.status(), StatusCode::NO_CONTENT);
    assert!(manager.links().await.is_empty());
}

#[tokio::test]
async fn invalid_link_values_are_bad_request() {
    let addr = start_admin(links()).await;

    let res = common::client()
        .put(format!("http://{}/admin/links/MACTOR/default", addr))
        .bearer_auth(KEY)
        .json(&serde_json::json!({ "hostname": "no-port" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.text().await.unwrap();
    assert!(body.starts_with("invalid link settings:"), "{body}");
    assert!(body.contains("'port'"), "{body}");
}
