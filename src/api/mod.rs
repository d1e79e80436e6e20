// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP router and the global middleware stack.
//!
//! Requests pass, outermost first: error normalizer, panic catcher, request
//! id, tracing, CORS, rate limiter, body limit (its 413 rendered as the JSON
//! envelope), sanitizer. Authentication and authorization gates are attached
//! per route with `route_layer` by whoever mounts the routes.

use axum::{
    http::{Method, StatusCode, Uri},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    error::{envelope_payload_too_large, normalize_errors, panic_response, ErrorEnvelope},
    rate_limit::rate_limit,
    sanitize::sanitize_json_body,
    state::AppState,
};

pub mod health;

const MSG_ROUTE_NOT_FOUND: &str = "route not found";

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub success: bool,
    pub message: String,
    pub version: String,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        success: true,
        message: "request gate is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// 404 for any unmatched route.
pub async fn not_found(method: Method, uri: Uri) -> (StatusCode, Json<ErrorEnvelope>) {
    let body = ErrorEnvelope::new(MSG_ROUTE_NOT_FOUND).with_route(uri.path(), method.as_str());
    (StatusCode::NOT_FOUND, Json(body))
}

/// Router with only the built-in routes.
pub fn router(state: AppState) -> Router {
    router_with(state, Router::new())
}

/// Mount `routes` next to the built-in ones and wrap everything in the
/// global middleware stack.
pub fn router_with(state: AppState, routes: Router<AppState>) -> Router {
    let environment = state.environment;
    let limiter = state.rate_limit.clone();
    let body_limit = state.body_limit;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health::health))
        .merge(routes)
        .fallback(not_found)
        .layer(from_fn(sanitize_json_body))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(from_fn(envelope_payload_too_large))
        .layer(from_fn_with_state(limiter, rate_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(environment, normalize_errors))
        .with_state(state)
}
