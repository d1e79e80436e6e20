// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;

use crate::auth::{AuthState, JwtVerifier};
use crate::config::{AppConfig, Environment};
use crate::database::Database;
use crate::rate_limit::{RateLimitState, SlidingWindowLimiter};

/// Shared state handed to every route and middleware.
#[derive(Clone)]
pub struct AppState {
    pub environment: Environment,
    pub auth: AuthState,
    pub database: Arc<Database>,
    pub rate_limit: RateLimitState,
    pub body_limit: usize,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: &AppConfig, auth: AuthState, database: Arc<Database>) -> Self {
        let limiter = SlidingWindowLimiter::from_config(&config.rate_limit);
        Self {
            environment: config.environment,
            auth,
            database,
            rate_limit: RateLimitState::new(Arc::new(limiter), config.trust_proxy),
            body_limit: config.body_limit,
            started_at: Instant::now(),
        }
    }

    /// State wired with the bundled HS256 verifier.
    pub fn from_config(config: &AppConfig, database: Arc<Database>) -> Self {
        let verifier = JwtVerifier::hs256(config.jwt_secret.as_bytes());
        Self::new(config, AuthState::new(Arc::new(verifier)), database)
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for Environment {
    fn from_ref(state: &AppState) -> Self {
        state.environment
    }
}

impl FromRef<AppState> for RateLimitState {
    fn from_ref(state: &AppState) -> Self {
        state.rate_limit.clone()
    }
}
