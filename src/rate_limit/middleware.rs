// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum middleware enforcing a [`SlidingWindowLimiter`].
//!
//! ```rust,ignore
//! let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(60));
//! let state = RateLimitState::new(Arc::new(limiter), true);
//! let app = Router::new()
//!     .route("/login", post(login))
//!     .layer(axum::middleware::from_fn_with_state(state, rate_limit));
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use super::{RateDecision, SlidingWindowLimiter};
use crate::error::ErrorEnvelope;

const FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";

/// Limiter plus the policy for deriving the client identity.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<SlidingWindowLimiter>,
    /// Use the first `X-Forwarded-For` hop when present.
    pub trust_proxy: bool,
}

impl RateLimitState {
    pub fn new(limiter: Arc<SlidingWindowLimiter>, trust_proxy: bool) -> Self {
        Self {
            limiter,
            trust_proxy,
        }
    }
}

/// Derive the rate-limit key for a request.
pub fn client_identity(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy: bool,
) -> String {
    if trust_proxy {
        let forwarded = headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(client) = forwarded {
            return client.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Reject the request with 429 once the caller's quota is spent.
pub async fn rate_limit(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_identity(request.headers(), peer, state.trust_proxy);

    match state.limiter.check(&client) {
        RateDecision::Allowed { .. } => next.run(request).await,
        RateDecision::Limited { retry_after_secs } => {
            warn!(client = %client, retry_after_secs, "Rate limit exceeded");
            too_many_requests(retry_after_secs)
        }
    }
}

fn too_many_requests(retry_after_secs: u64) -> Response {
    let body =
        ErrorEnvelope::new("too many requests, try again later").with_retry_after(retry_after_secs);
    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
    response
}
