// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request Gate - HTTP gating layer for a multi-tenant API
//!
//! Sits in front of the route handlers and decides whether a request may
//! proceed, who is making it, and how failures are reported.
//!
//! ## Modules
//!
//! - `api` - Router, global middleware stack, health and root endpoints
//! - `auth` - Bearer-token authentication and admin/ownership authorization
//! - `rate_limit` - Per-client sliding-window rate limiting
//! - `sanitize` - JSON body sanitization and required-field checks
//! - `error` - Error normalization into the public failure envelope
//! - `database` - Lifecycle of the shared persistence connection (redb)
//! - `config`, `telemetry`, `shutdown` - Process plumbing

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod rate_limit;
pub mod sanitize;
pub mod shutdown;
pub mod state;
pub mod telemetry;
