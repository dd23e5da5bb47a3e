//! Item Events API Library
//!
//! JSON:API backend for items and the events recorded against them
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod jsonapi;
pub mod middleware_helpers;
pub mod services;
pub mod tracing;

use axum::{extract::DefaultBodyLimit, http::Uri, Router};
use std::sync::Arc;

use crate::{
    db::DbPool,
    errors::ServiceError,
    jsonapi::LinkBuilder,
    services::{events::EventService, items::ItemService},
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub items: ItemService,
    pub events: EventService,
    pub links: LinkBuilder,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: config::AppConfig) -> Self {
        Self {
            items: ItemService::new(db.clone(), config.item_delete_policy),
            events: EventService::new(db.clone()),
            links: LinkBuilder::new(config.link_base()),
            db,
            config,
        }
    }
}

/// JSON:API resource routes, guarded by media type negotiation
pub fn resource_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::items::item_routes())
        .merge(handlers::events::event_routes())
        .route_layer(axum::middleware::from_fn(
            middleware_helpers::jsonapi_negotiation,
        ))
}

async fn route_not_found(uri: Uri) -> ServiceError {
    ServiceError::NotFound(format!("No route matches {}", uri.path()))
}

/// Complete application router with request id, tracing and body limit layers
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_body_size;

    ::tracing::info!(
        delete_policy = %state.config.item_delete_policy,
        body_limit,
        "Building application router"
    );

    Router::new()
        .merge(resource_routes())
        .merge(health::health_routes())
        .fallback(route_not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .layer(crate::tracing::configure_http_tracing())
}
