#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use item_events_api::{config::AppConfig, db, jsonapi::MEDIA_TYPE, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Helper harness for spinning up the application backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Construct a test application after adjusting the default test configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A single connection keeps the in-memory database alive and shared.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = item_events_api::app(state.clone());

        Self { router, state }
    }

    /// Send a request with JSON:API headers and an optional document body.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::ACCEPT, MEDIA_TYPE);

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, MEDIA_TYPE);
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Send a request with exactly the given headers and raw body.
    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<String>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = body.map(Body::from).unwrap_or_else(Body::empty);
        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> Response {
        self.request(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> Response {
        self.request(Method::DELETE, uri, None).await
    }

    /// Creates an item and returns its resource object
    pub async fn create_item(&self, name: &str) -> Value {
        let response = self.post("/items", item_document(json!(name))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["data"].clone()
    }

    /// Creates an event for `item_id` and returns its resource object
    pub async fn create_event(&self, item_id: &str) -> Value {
        let response = self.post("/events", event_document(item_id)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["data"].clone()
    }
}

pub fn item_document(name: Value) -> Value {
    json!({
        "data": {
            "type": "items",
            "attributes": { "name": name }
        }
    })
}

pub fn event_document(item_id: &str) -> Value {
    json!({
        "data": {
            "type": "events",
            "relationships": {
                "item": { "data": { "type": "items", "id": item_id } }
            }
        }
    })
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body is not JSON")
}

/// First error object of an error document
pub async fn first_error(response: Response) -> Value {
    body_json(response).await["errors"][0].clone()
}
