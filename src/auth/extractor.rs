// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the authenticated principal.
//!
//! Handlers behind an authentication gate read the principal the gate bound;
//! handlers without one resolve it from the `Authorization` header:
//!
//! ```rust,ignore
//! async fn profile(Auth(principal): Auth) -> impl IntoResponse {
//!     // principal.user_id is the caller's ID
//! }
//! ```

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::info;

use super::{authorize_admin, resolve_principal, AuthError, AuthState, BearerToken, Principal};

/// Extractor for authenticated callers.
pub struct Auth(pub Principal);

impl<S> FromRequestParts<S> for Auth
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // First check if middleware already bound the principal
        if let Some(principal) = parts.extensions.get::<Principal>().cloned() {
            return Ok(Auth(principal));
        }

        let auth = AuthState::from_ref(state);
        let (principal, token) =
            resolve_principal(auth.verifier.as_ref(), parts.headers.get(AUTHORIZATION)).await?;

        parts.extensions.insert(principal.clone());
        parts.extensions.insert(BearerToken(token));
        Ok(Auth(principal))
    }
}

/// Optional authentication extractor.
///
/// Yields `None` instead of rejecting when the caller cannot be identified.
/// A credential that was presented but failed to resolve is still logged.
pub struct MaybeAuth(pub Option<Principal>);

impl<S> FromRequestParts<S> for MaybeAuth
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if parts.extensions.get::<Principal>().is_none()
            && !parts.headers.contains_key(AUTHORIZATION)
        {
            return Ok(MaybeAuth(None));
        }
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(principal)) => Ok(MaybeAuth(Some(principal))),
            Err(e) => {
                info!(error = %e, path = %parts.uri.path(), "Optional authentication failed");
                Ok(MaybeAuth(None))
            }
        }
    }
}

/// Extractor that requires the admin role.
pub struct AdminOnly(pub Principal);

impl<S> FromRequestParts<S> for AdminOnly
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(principal) = Auth::from_request_parts(parts, state).await?;
        authorize_admin(Some(&principal))?;
        Ok(AdminOnly(principal))
    }
}
