// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup into [`AppConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind IP (IPv4 or IPv6) | `0.0.0.0` |
//! | `PORT` | Server bind port | `7778` |
//! | `APP_ENV` | `production`, `development` or `test` | `development` |
//! | `DATABASE_PATH` | Embedded database file | `./data/gate.redb` |
//! | `JWT_SECRET` | HS256 secret used to verify bearer tokens | Required |
//! | `RATE_LIMIT_MAX_REQUESTS` | Global limiter quota per window | `1000` |
//! | `RATE_LIMIT_WINDOW_SECS` | Global limiter window length | `900` |
//! | `RATE_LIMIT_MAX_CLIENTS` | Max client identities tracked by a limiter | `100000` |
//! | `TRUST_PROXY` | Use the first `X-Forwarded-For` hop as client identity | `true` |
//! | `BODY_LIMIT_BYTES` | Request body cap | `10485760` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{
    fmt,
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const APP_ENV_ENV: &str = "APP_ENV";
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const RATE_LIMIT_MAX_REQUESTS_ENV: &str = "RATE_LIMIT_MAX_REQUESTS";
pub const RATE_LIMIT_WINDOW_SECS_ENV: &str = "RATE_LIMIT_WINDOW_SECS";
pub const RATE_LIMIT_MAX_CLIENTS_ENV: &str = "RATE_LIMIT_MAX_CLIENTS";
pub const TRUST_PROXY_ENV: &str = "TRUST_PROXY";
pub const BODY_LIMIT_BYTES_ENV: &str = "BODY_LIMIT_BYTES";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 7778;
const DEFAULT_DATABASE_PATH: &str = "./data/gate.redb";
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 1000;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;
const DEFAULT_RATE_LIMIT_MAX_CLIENTS: usize = 100_000;
const DEFAULT_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Deployment environment.
///
/// Production builds hide the internal message of unclassified failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    Production,
    #[default]
    Development,
    Test,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
        }
    }
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Sliding-window limiter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    pub max_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            max_clients: DEFAULT_RATE_LIMIT_MAX_CLIENTS,
        }
    }
}

/// Application configuration loaded at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub database_path: PathBuf,
    pub jwt_secret: String,
    pub rate_limit: RateLimitConfig,
    pub trust_proxy: bool,
    pub body_limit: usize,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ip: IpAddr = host
            .trim_matches(['[', ']'])
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: HOST_ENV,
                value: host.clone(),
            })?;
        let port: u16 = parse_or(&lookup, PORT_ENV, DEFAULT_PORT)?;
        let bind_addr = SocketAddr::new(ip, port);

        let environment = match lookup(APP_ENV_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: APP_ENV_ENV,
                value,
            })?,
            None => Environment::default(),
        };

        let jwt_secret = lookup(JWT_SECRET_ENV)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;

        let max_requests: u32 = parse_positive(
            &lookup,
            RATE_LIMIT_MAX_REQUESTS_ENV,
            DEFAULT_RATE_LIMIT_MAX_REQUESTS,
        )?;
        let window_secs: u64 = parse_positive(
            &lookup,
            RATE_LIMIT_WINDOW_SECS_ENV,
            DEFAULT_RATE_LIMIT_WINDOW_SECS,
        )?;
        let max_clients: usize = parse_positive(
            &lookup,
            RATE_LIMIT_MAX_CLIENTS_ENV,
            DEFAULT_RATE_LIMIT_MAX_CLIENTS,
        )?;
        let rate_limit = RateLimitConfig {
            max_requests,
            window: Duration::from_secs(window_secs),
            max_clients,
        };

        let log_format = match lookup(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            bind_addr,
            environment,
            database_path: lookup(DATABASE_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            jwt_secret,
            rate_limit,
            trust_proxy: parse_or(&lookup, TRUST_PROXY_ENV, true)?,
            body_limit: parse_or(&lookup, BODY_LIMIT_BYTES_ENV, DEFAULT_BODY_LIMIT_BYTES)?,
            log_format,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

/// Like [`parse_or`], but zero is rejected.
fn parse_positive<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Default + PartialEq,
{
    let value = parse_or(lookup, name, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            name,
            value: lookup(name).unwrap_or_default(),
        });
    }
    Ok(value)
}
