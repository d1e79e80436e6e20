// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    /// RFC 3339 time of the check.
    pub timestamp: String,
    /// Seconds since the server started.
    pub uptime: f64,
    pub environment: String,
    /// `"connected"` or `"disconnected"`.
    pub database: String,
}

/// Health check endpoint handler.
///
/// Probes the database connection. Returns 200 if the probe passes, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_ok = state.database.test_connection().await;

    let response = HealthResponse {
        success: database_ok,
        message: if database_ok {
            "service is healthy"
        } else {
            "service is unhealthy"
        }
        .to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        environment: state.environment.to_string(),
        database: if database_ok { "connected" } else { "disconnected" }.to_string(),
    };

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
