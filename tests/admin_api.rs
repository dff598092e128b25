//! Admin API tests: authentication and the registration lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use edge_router::admin::{setup_admin_router, AdminState};
use edge_router::config::{AppConfig, RouterConfig};
use edge_router::routing::{Registrar, RouteEntry, RouteKind};
use edge_router::store::MemoryStore;
use serde_json::{json, Value};
use tokio::net::TcpListener;

mod common;

const API_KEY: &str = "test-admin-key";

async fn start_admin(router: RouterConfig) -> SocketAddr {
    let store = Arc::new(MemoryStore::new(512, 1024));
    let registrar = Arc::new(Registrar::new(store, AppConfig::default(), router));
    let app = setup_admin_router(AdminState::new(registrar, API_KEY));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn authed(builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    builder.bearer_auth(API_KEY)
}

#[tokio::test]
async fn test_requires_bearer_token() {
    let addr = start_admin(RouterConfig::default()).await;
    let client = common::client();

    let res = client.get(format!("http://{addr}/admin/status")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("http://{addr}/admin/status"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = authed(client.get(format!("http://{addr}/admin/status"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let status: Value = res.json().await.unwrap();
    assert_eq!(status["mode"], "dynamic");
    assert_eq!(status["routes"], 0);
}

#[tokio::test]
async fn test_route_lifecycle() {
    let addr = start_admin(RouterConfig::default()).await;
    let client = common::client();
    let base = format!("http://{addr}/admin");

    let res = authed(client.put(format!("{base}/routes")))
        .json(&json!({
            "component": "Api",
            "pattern": "*.example.com/api",
            "destination": { "type": "url", "url": "https://backend.internal" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let entry: RouteEntry = res.json().await.unwrap();
    assert_eq!(entry.kind, RouteKind::Url);
    assert_eq!(entry.path, "/api");

    let routes: Vec<RouteEntry> = authed(client.get(format!("{base}/routes")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(routes, vec![entry.clone()]);

    let matched: Value = authed(client.get(format!("{base}/match")))
        .query(&[("host", "Docs.Example.com:443"), ("uri", "/api/v1")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(matched["host"], "docs.example.com");
    assert_eq!(matched["route"]["namespace"], entry.namespace.as_str());

    let missed: Value = authed(client.get(format!("{base}/match")))
        .query(&[("host", "a.b.example.com"), ("uri", "/api")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(missed["route"].is_null());

    let res = authed(client.delete(format!("{base}/routes/Api"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = authed(client.delete(format!("{base}/routes/Api"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_route_is_bad_request() {
    let addr = start_admin(RouterConfig::default()).await;
    let client = common::client();

    let res = authed(client.put(format!("http://{addr}/admin/routes")))
        .json(&json!({
            "component": "Api",
            "pattern": "/api/../etc",
            "destination": { "type": "url", "url": "https://backend.internal" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("invalid route pattern"));
}

#[tokio::test]
async fn test_inline_router_rejects_registration() {
    let mut router = RouterConfig::default();
    router.inline_routes.insert("/".into(), "https://site.internal".into());
    let addr = start_admin(router).await;

    let res = authed(common::client().put(format!("http://{addr}/admin/routes")))
        .json(&json!({
            "component": "Api",
            "pattern": "/api",
            "destination": { "type": "url", "url": "https://backend.internal" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}
