// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.
//!
//! Gates answer these directly; they never reach the error normalizer.
//! Every 401 carries the same generic message so verification details do not
//! leak to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::error::ErrorEnvelope;

pub const MSG_UNAUTHENTICATED: &str = "authentication required";
pub const MSG_ADMIN_REQUIRED: &str = "access denied: administrator privileges required";
pub const MSG_NOT_OWNER: &str = "access denied: you can only access your own data";

/// Failure reported by the token verification collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("token is invalid: {0}")]
    InvalidToken(String),

    #[error("token has expired")]
    ExpiredToken,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("authorization header is required")]
    MissingAuthHeader,

    /// Header is not `Bearer <token>`
    #[error("invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,

    #[error("bearer token is empty")]
    EmptyToken,

    /// The verifier rejected the token
    #[error("token rejected: {0}")]
    Rejected(#[from] VerifyError),

    /// No principal bound to the request
    #[error("no authenticated principal")]
    Unauthenticated,

    #[error("administrator privileges required")]
    AdminRequired,

    #[error("caller does not own the target resource")]
    NotOwner,

    /// The owner identifier field is absent from params and body
    #[error("parameter {0} is required")]
    MissingOwnerField(String),
}

impl AuthError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::EmptyToken
            | AuthError::Rejected(_)
            | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::AdminRequired | AuthError::NotOwner => StatusCode::FORBIDDEN,
            AuthError::MissingOwnerField(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message exposed to the client.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::AdminRequired => MSG_ADMIN_REQUIRED.to_string(),
            AuthError::NotOwner => MSG_NOT_OWNER.to_string(),
            AuthError::MissingOwnerField(field) => format!("parameter {field} is required"),
            _ => MSG_UNAUTHENTICATED.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!(status = %status, error = %self, "Request refused by auth gate");
        (status, Json(ErrorEnvelope::new(self.public_message()))).into_response()
    }
}
