//! TLS and funnel exposure serving real HTTPS.

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::Arc;

use tailnet_gateway::config::OverlayConfig;
use tailnet_gateway::lifecycle::{LinkDefinition, LinkId, LinkLifecycle, LinkManager};
use tailnet_gateway::net::ExposureMode;
use tailnet_gateway::overlay::LoopbackOverlay;

mod common;

use common::{MockDispatcher, MockOverlay};

#[tokio::test]
async fn local_tls_serves_https_with_link_certificate() {
    let overlay = MockOverlay::with_identity(common::identity("u1"));
    let manager = common::manager(overlay, MockDispatcher::replying(200, b"secure"));

    let mut values = common::direct_values("tls");
    values.insert("tls_cert".to_string(), STANDARD.encode(common::FIXTURE_CERT));
    values.insert("tls_private_key".to_string(), STANDARD.encode(common::FIXTURE_KEY));
    manager
        .on_link_add(LinkDefinition {
            actor_id: "MACTOR".to_string(),
            link_name: "default".to_string(),
            values,
        })
        .await
        .unwrap();

    let links = manager.links().await;
    assert_eq!(links[0].mode, ExposureMode::LocalTls);
    let addr = links[0].local_address;

    let res = common::tls_client()
        .get(format!("https://{}/index.html", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "secure");

    // Plain HTTP is not accepted on a TLS listener.
    assert!(common::client()
        .get(format!("http://{}/index.html", addr))
        .send()
        .await
        .is_err());

    manager.shutdown_all().await;
}

#[tokio::test]
async fn funnel_serves_overlay_certificate_on_mapped_port() {
    let funnel_port = common::free_port();
    let overlay = LoopbackOverlay::from_config(&OverlayConfig {
        funnel_port: Some(funnel_port),
        funnel_cert_path: Some(common::fixture_path("localhost.crt")),
        funnel_key_path: Some(common::fixture_path("localhost.key")),
        default_identity: Some(common::identity("u1")),
        ..OverlayConfig::default()
    })
    .unwrap();
    let dispatcher = MockDispatcher::replying(200, b"public");
    let manager = LinkManager::new(Arc::new(overlay), dispatcher.clone(), common::settings());

    // The link port is ignored in funnel mode.
    let mut values = common::direct_values("public");
    values.insert("port".to_string(), "8080".to_string());
    values.insert("funnel".to_string(), "true".to_string());
    manager
        .on_link_add(LinkDefinition {
            actor_id: "MACTOR".to_string(),
            link_name: "default".to_string(),
            values,
        })
        .await
        .unwrap();

    let links = manager.links().await;
    assert_eq!(links[0].mode, ExposureMode::PublicFunnel);
    assert_eq!(links[0].local_address.port(), funnel_port);

    let res = common::tls_client()
        .get(format!("https://127.0.0.1:{}/", funnel_port))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "public");
    let (_, _, request) = dispatcher.requests().remove(0);
    assert_eq!(request.headers["X-Webauth-User"], vec!["u1"]);

    manager
        .on_link_remove(&LinkId::new("MACTOR", "default"))
        .await
        .unwrap();
    assert!(manager.links().await.is_empty());
    // Funnel listener is gone, so its port can be bound again.
    std::net::TcpListener::bind(("127.0.0.1", funnel_port)).unwrap();
}
