#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use shelf_app::App;
use shelf_db::{MemoryStore, SharedStore, SqliteStore};
use shelf_kernel::settings::Settings;

pub async fn sqlite_app() -> (Router, SharedStore) {
    let store: SharedStore = Arc::new(SqliteStore::in_memory().await.expect("sqlite"));
    app_with_store(store).await
}

pub async fn memory_app() -> (Router, SharedStore) {
    let store: SharedStore = Arc::new(MemoryStore::new());
    app_with_store(store).await
}

async fn app_with_store(store: SharedStore) -> (Router, SharedStore) {
    let settings = Settings::default();
    let app = App::with_store(&settings, store.clone())
        .await
        .expect("bootstrap");
    (app.router(&settings), store)
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}
