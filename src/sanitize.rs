// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Input sanitization for JSON request bodies.
//!
//! Every top-level string field of a JSON object body is stripped of the
//! characters `<`, `>`, `"` and `'` and then trimmed. Nested values are left
//! to field-specific validation.
//!
//! Sanitization never rejects a request: bodies that are not JSON objects,
//! or that cannot be parsed, are passed on untouched and fail (if at all) in
//! the handler's extractor.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::header::{CONTENT_LENGTH, CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::debug;

use crate::error::AppError;

const STRIPPED: [char; 4] = ['<', '>', '"', '\''];

/// Strip markup and quote characters, then trim surrounding whitespace.
pub fn sanitize_str(input: &str) -> String {
    let stripped: String = input.chars().filter(|c| !STRIPPED.contains(c)).collect();
    stripped.trim().to_string()
}

/// Sanitize the top-level string fields of a JSON object in place.
///
/// Returns whether anything changed. Non-object values are left alone.
pub fn sanitize_value(value: &mut Value) -> bool {
    let Value::Object(fields) = value else {
        return false;
    };

    let mut changed = false;
    for field in fields.values_mut() {
        if let Value::String(s) = field {
            let clean = sanitize_str(s);
            if clean != *s {
                *s = clean;
                changed = true;
            }
        }
    }
    changed
}

/// Check that each of `fields` is present, non-null and not an empty string.
pub fn require_fields(body: &Value, fields: &[&str]) -> Result<(), AppError> {
    let missing: Vec<String> = fields
        .iter()
        .filter(|name| match body.get(**name) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        })
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::MissingFields(missing))
    }
}

fn is_json(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Middleware sanitizing JSON object bodies before they reach handlers.
pub async fn sanitize_json_body(request: Request, next: Next) -> Response {
    if !is_json(&request) {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    // The body limit layer caps how much is buffered here.
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "Failed to buffer request body");
            return AppError::payload_too_large().into_response();
        }
    };

    let mut value: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "Body is not valid JSON, skipping sanitization");
            return next.run(Request::from_parts(parts, Body::from(bytes))).await;
        }
    };

    if !sanitize_value(&mut value) {
        return next.run(Request::from_parts(parts, Body::from(bytes))).await;
    }

    match serde_json::to_vec(&value) {
        Ok(clean) => {
            parts.headers.remove(CONTENT_LENGTH);
            next.run(Request::from_parts(parts, Body::from(clean))).await
        }
        Err(e) => {
            debug!(error = %e, "Failed to re-encode sanitized body, passing original");
            next.run(Request::from_parts(parts, Body::from(bytes))).await
        }
    }
}
