// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error normalization.
//!
//! Every failure that is not answered directly by a gate ends up as an
//! [`AppError`]. [`normalize`] maps it to a status and a client-safe message;
//! the internal cause is only ever logged.
//!
//! | Cause | Status | Public message |
//! |-------|--------|----------------|
//! | malformed JSON body | 400 | `invalid JSON` |
//! | body failed structural checks | 400 | `invalid request data` |
//! | required fields missing | 400 | `required fields missing` |
//! | uniqueness violation | 400 | `duplicate data; check unique fields` |
//! | record not found | 404 | `record not found` |
//! | explicit status | that status | the error's own message |
//! | anything else | 500 | `internal server error` in production, the cause otherwise |
//!
//! `AppError::into_response` renders with the production policy. The
//! [`normalize_errors`] layer re-renders under the configured environment.
//! Responses are fully built before transmission starts, so the normalizer
//! never has to deal with a response that is already on the wire.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request, State},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::config::Environment;
use crate::database::{ConnectionError, PersistenceError, PersistenceFailureKind};

pub const MSG_INVALID_JSON: &str = "invalid JSON";
pub const MSG_INVALID_DATA: &str = "invalid request data";
pub const MSG_MISSING_FIELDS: &str = "required fields missing";
pub const MSG_DUPLICATE: &str = "duplicate data; check unique fields";
pub const MSG_NOT_FOUND: &str = "record not found";
pub const MSG_INTERNAL: &str = "internal server error";
pub const MSG_PAYLOAD_TOO_LARGE: &str = "request body too large";

// =============================================================================
// Response Envelope
// =============================================================================

/// Failure response body shared by every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<String>>,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            missing_fields: None,
            retry_after: None,
            path: None,
            method: None,
        }
    }

    pub fn with_missing_fields(mut self, fields: Vec<String>) -> Self {
        self.missing_fields = Some(fields);
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    pub fn with_route(mut self, path: impl Into<String>, method: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self.method = Some(method.into());
        self
    }
}

// =============================================================================
// Error Type
// =============================================================================

/// Failures propagated from body decoding, persistence and handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("malformed JSON body: {0}")]
    MalformedJson(String),

    #[error("invalid request data: {0}")]
    InvalidBody(String),

    #[error("required fields missing: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Failure that carries its own status and public message.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("{0}")]
    Unclassified(String),
}

impl AppError {
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn unclassified(cause: impl std::fmt::Display) -> Self {
        Self::Unclassified(cause.to_string())
    }

    /// Body exceeded the configured cap while being buffered.
    pub fn payload_too_large() -> Self {
        Self::with_status(StatusCode::PAYLOAD_TOO_LARGE, MSG_PAYLOAD_TOO_LARGE)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonSyntaxError(e) => AppError::MalformedJson(e.body_text()),
            JsonRejection::JsonDataError(e) => AppError::InvalidBody(e.body_text()),
            JsonRejection::MissingJsonContentType(e) => AppError::InvalidBody(e.body_text()),
            other => AppError::with_status(other.status(), other.body_text()),
        }
    }
}

/// JSON body extractor whose rejections flow through [`normalize`].
///
/// ```rust,ignore
/// async fn create(AppJson(body): AppJson<NewUser>) -> Result<Json<User>, AppError> { ... }
/// ```
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;
        Ok(AppJson(value))
    }
}

// =============================================================================
// Normalization
// =============================================================================

/// Client-safe rendering of an [`AppError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedError {
    pub status: StatusCode,
    pub public_message: String,
    pub missing_fields: Option<Vec<String>>,
    pub internal_cause: String,
}

/// Map an error to its status and public message.
pub fn normalize(error: &AppError, environment: Environment) -> NormalizedError {
    let internal_cause = error.to_string();
    let (status, public_message, missing_fields) = match error {
        AppError::MalformedJson(_) => (StatusCode::BAD_REQUEST, MSG_INVALID_JSON.to_string(), None),
        AppError::InvalidBody(_) => (StatusCode::BAD_REQUEST, MSG_INVALID_DATA.to_string(), None),
        AppError::MissingFields(fields) => (
            StatusCode::BAD_REQUEST,
            MSG_MISSING_FIELDS.to_string(),
            Some(fields.clone()),
        ),
        AppError::Persistence(e) if e.kind() == PersistenceFailureKind::UniqueViolation => {
            (StatusCode::BAD_REQUEST, MSG_DUPLICATE.to_string(), None)
        }
        AppError::Persistence(e) if e.kind() == PersistenceFailureKind::RecordNotFound => {
            (StatusCode::NOT_FOUND, MSG_NOT_FOUND.to_string(), None)
        }
        AppError::Status { status, message } => (*status, message.clone(), None),
        AppError::Persistence(_) | AppError::Connection(_) | AppError::Unclassified(_) => {
            let message = if environment.is_production() {
                MSG_INTERNAL.to_string()
            } else {
                internal_cause.clone()
            };
            (StatusCode::INTERNAL_SERVER_ERROR, message, None)
        }
    };

    NormalizedError {
        status,
        public_message,
        missing_fields,
        internal_cause,
    }
}

impl IntoResponse for NormalizedError {
    fn into_response(self) -> Response {
        let mut body = ErrorEnvelope::new(self.public_message);
        if let Some(fields) = self.missing_fields {
            body = body.with_missing_fields(fields);
        }
        (self.status, Json(body)).into_response()
    }
}

/// The error behind a rendered response, kept for [`normalize_errors`].
#[derive(Debug, Clone)]
struct ErrorReport(Arc<AppError>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let normalized = normalize(&self, Environment::Production);
        let (status, cause) = (normalized.status, &normalized.internal_cause);
        if status.is_server_error() {
            error!(status = %status, error = %cause, "Request failed");
        } else {
            warn!(status = %status, error = %cause, "Request rejected");
        }

        let mut response = normalized.into_response();
        response.extensions_mut().insert(ErrorReport(Arc::new(self)));
        response
    }
}

/// Terminal layer: re-render [`AppError`] responses for `environment`.
///
/// Install it outermost so it sees every handler and extractor failure.
pub async fn normalize_errors(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    match response.extensions_mut().remove::<ErrorReport>() {
        Some(ErrorReport(error)) if !environment.is_production() => {
            // Keep headers set by inner layers (CORS, request id), swap the body.
            let (mut parts, _) = response.into_parts();
            let (rendered, body) = normalize(&error, environment).into_response().into_parts();
            parts.status = rendered.status;
            parts.headers.remove(CONTENT_LENGTH);
            parts.headers.extend(rendered.headers);
            Response::from_parts(parts, body)
        }
        _ => response,
    }
}

/// Render rejections produced by the body limit layer as the JSON envelope.
pub async fn envelope_payload_too_large(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE && !is_json {
        return AppError::payload_too_large().into_response();
    }
    response
}

/// Render a caught handler panic as the unclassified 500 envelope.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!(panic = %detail, "Handler panicked");

    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorEnvelope::new(MSG_INTERNAL))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body_bytes).unwrap()
    }

    #[test]
    fn body_decoding_failures_map_to_400() {
        let n = normalize(&AppError::MalformedJson("line 1".into()), Environment::Production);
        assert_eq!(n.status, StatusCode::BAD_REQUEST);
        assert_eq!(n.public_message, MSG_INVALID_JSON);

        let error = AppError::InvalidBody("age: expected u32".into());
        let n = normalize(&error, Environment::Production);
        assert_eq!(n.status, StatusCode::BAD_REQUEST);
        assert_eq!(n.public_message, MSG_INVALID_DATA);
    }

    #[test]
    fn unique_violation_message_ignores_cause_text() {
        for cause in ["email", "Unique constraint failed on the fields: (`cpf`)", ""] {
            for env in [Environment::Production, Environment::Development] {
                let error = AppError::from(PersistenceError::UniqueViolation(cause.into()));
                let n = normalize(&error, env);
                assert_eq!(n.status, StatusCode::BAD_REQUEST);
                assert_eq!(n.public_message, MSG_DUPLICATE);
            }
        }
    }

    #[test]
    fn missing_record_maps_to_404() {
        let error = AppError::from(PersistenceError::NotFound("card 42".into()));
        let n = normalize(&error, Environment::Production);
        assert_eq!(n.status, StatusCode::NOT_FOUND);
        assert_eq!(n.public_message, MSG_NOT_FOUND);
        assert_eq!(n.internal_cause, "record not found: card 42");
    }

    #[test]
    fn explicit_status_keeps_own_message() {
        let error = AppError::with_status(StatusCode::CONFLICT, "card already scratched");
        let n = normalize(&error, Environment::Production);
        assert_eq!(n.status, StatusCode::CONFLICT);
        assert_eq!(n.public_message, "card already scratched");
    }

    #[test]
    fn unclassified_message_depends_on_environment() {
        let error = AppError::unclassified("pool exhausted");

        let prod = normalize(&error, Environment::Production);
        assert_eq!(prod.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(prod.public_message, MSG_INTERNAL);
        assert_eq!(prod.internal_cause, "pool exhausted");

        let dev = normalize(&error, Environment::Development);
        assert_eq!(dev.public_message, "pool exhausted");
    }

    #[test]
    fn unavailable_persistence_is_unclassified() {
        let error = AppError::from(PersistenceError::Disconnected);
        let n = normalize(&error, Environment::Production);
        assert_eq!(n.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(n.public_message, MSG_INTERNAL);
    }

    #[tokio::test]
    async fn into_response_uses_production_policy() {
        let response = AppError::unclassified("secret detail").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({"success": false, "message": MSG_INTERNAL}));
    }

    #[tokio::test]
    async fn missing_fields_are_listed() {
        let response = AppError::MissingFields(vec!["cpf".into(), "name".into()]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["message"], MSG_MISSING_FIELDS);
        assert_eq!(body["missing_fields"], serde_json::json!(["cpf", "name"]));
    }

    fn failing_app(environment: Environment) -> Router {
        Router::new()
            .route(
                "/",
                get(|| async { Err::<(), _>(AppError::unclassified("disk full")) }),
            )
            .layer(middleware::from_fn_with_state(environment, normalize_errors))
    }

    fn get_root() -> axum::http::Request<Body> {
        axum::http::Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn layer_exposes_cause_outside_production() {
        let response = failing_app(Environment::Development).oneshot(get_root()).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], "disk full");
    }

    #[tokio::test]
    async fn layer_hides_cause_in_production() {
        let response = failing_app(Environment::Production).oneshot(get_root()).await.unwrap();
        assert_eq!(body_json(response).await["message"], MSG_INTERNAL);
    }

    #[tokio::test]
    async fn app_json_rejections_are_normalized() {
        #[derive(serde::Deserialize)]
        struct Card {
            #[allow(dead_code)]
            code: u32,
        }

        let app = Router::new().route(
            "/",
            axum::routing::post(|AppJson(_card): AppJson<Card>| async { "ok" }),
        );
        let post = |body: &'static str| {
            axum::http::Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap()
        };

        let response = app.clone().oneshot(post("{broken")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], MSG_INVALID_JSON);

        let response = app.oneshot(post(r#"{"code":"abc"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], MSG_INVALID_DATA);
    }

    #[tokio::test]
    async fn panic_renders_generic_500() {
        let response = panic_response(Box::new("index out of bounds"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], MSG_INTERNAL);
    }
}
