// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::post;
use axum::Json;
use parking_lot::Mutex;

use crate::config::proc_loader::parse_config;
use crate::config::service::ServiceConfig;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// GraphQL endpoint that records the headers of every request it receives.
pub fn header_capture_router() -> (Router, Arc<Mutex<Vec<HeaderMap>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    let router = Router::new().route(
        "/graphql",
        post(move |headers: HeaderMap| {
            let sink = sink.clone();
            async move {
                sink.lock().push(headers);
                Json(json!({ "data": { "me": { "id": "1" } } }))
            }
        }),
    );
    (router, captured)
}

/// Minimal valid config pointing at the given endpoints.
pub async fn service_config(auth_url: &str, graphql_url: &str) -> ServiceConfig {
    let content = format!(
        "auth:\n  url: {}\n  timeout_ms: 2000\ngraphql:\n  url: {}\n  timeout_ms: 2000\n",
        auth_url, graphql_url
    );
    parse_config(content).await.expect("test config must be valid")
}
