// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization middleware for Axum.
//!
//! Gates are selected per route:
//!
//! ```rust,ignore
//! let users = Router::new()
//!     .route("/users/{userId}", get(get_user))
//!     .route_layer(from_fn_with_state(OwnerField::new("userId"), require_owner_or_admin))
//!     .route_layer(from_fn_with_state(auth.clone(), require_auth));
//!
//! let admin = Router::new()
//!     .route("/stats", get(stats))
//!     .route_layer(from_fn(require_admin))
//!     .route_layer(from_fn_with_state(auth.clone(), require_auth));
//! ```
//!
//! Layers run bottom-up, so authentication must be the last `route_layer`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, RawPathParams, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, info};

use super::{
    authorize_admin, authorize_owner_or_admin, resolve_principal, AuthError, BearerToken,
    Principal, TokenVerifier,
};
use crate::error::AppError;

/// Default cap when buffering a body to look up the owner field.
const OWNER_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Verifier shared by the authentication gates.
#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AuthState {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }
}

fn bind(request: &mut Request, principal: Principal, token: String) {
    request.extensions_mut().insert(principal);
    request.extensions_mut().insert(BearerToken(token));
}

/// Required mode: reject with 401 unless the bearer token verifies.
pub async fn require_auth(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolved =
        resolve_principal(auth.verifier.as_ref(), request.headers().get(AUTHORIZATION)).await;
    match resolved {
        Ok((principal, token)) => {
            bind(&mut request, principal, token);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Optional mode: bind a principal when the token verifies, otherwise carry
/// on anonymously. Failures are logged, never returned.
pub async fn optional_auth(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.headers().contains_key(AUTHORIZATION) {
        let resolved =
            resolve_principal(auth.verifier.as_ref(), request.headers().get(AUTHORIZATION)).await;
        match resolved {
            Ok((principal, token)) => bind(&mut request, principal, token),
            Err(e) => info!(error = %e, "Optional authentication failed, continuing anonymously"),
        }
    }
    next.run(request).await
}

/// Allow administrators only. Runs after an authentication gate.
pub async fn require_admin(request: Request, next: Next) -> Response {
    match authorize_admin(request.extensions().get::<Principal>()) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Name of the route parameter or body field holding the owner's user ID.
#[derive(Debug, Clone, Copy)]
pub struct OwnerField {
    pub name: &'static str,
    pub body_limit: usize,
}

impl OwnerField {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            body_limit: OWNER_BODY_LIMIT,
        }
    }
}

impl Default for OwnerField {
    fn default() -> Self {
        Self::new("userId")
    }
}

/// Allow the owner named by [`OwnerField`] or any administrator.
///
/// Route parameters are consulted first, then the JSON body.
pub async fn require_owner_or_admin(
    State(field): State<OwnerField>,
    request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<Principal>().is_none() {
        return AuthError::Unauthenticated.into_response();
    }

    let (mut parts, body) = request.into_parts();

    let from_path = RawPathParams::from_request_parts(&mut parts, &())
        .await
        .ok()
        .and_then(|params| {
            params
                .iter()
                .find(|(key, _)| *key == field.name)
                .map(|(_, value)| value.to_string())
        });

    let (owner_id, body) = match from_path {
        Some(owner_id) => (Some(owner_id), body),
        None => {
            let bytes = match to_bytes(body, field.body_limit).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!(error = %e, "Failed to buffer body for owner lookup");
                    return AppError::payload_too_large().into_response();
                }
            };
            let owner_id = owner_from_body(&bytes, field.name);
            (owner_id, Body::from(bytes))
        }
    };

    let decision = authorize_owner_or_admin(
        parts.extensions.get::<Principal>(),
        field.name,
        owner_id.as_deref(),
    );
    match decision {
        Ok(()) => next.run(Request::from_parts(parts, body)).await,
        Err(e) => e.into_response(),
    }
}

fn owner_from_body(bytes: &[u8], field: &str) -> Option<String> {
    let body: Value = serde_json::from_slice(bytes).ok()?;
    match body.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
