// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sliding-Window Rate Limiting
//!
//! Per-client request counters that reset relative to the first request of
//! the current window. State is in-process only and lost on restart.
//!
//! ## Decision per client identity
//!
//! 1. No entry: start a window with `count = 1`, allow
//! 2. Window expired (`now - window_start > window`): restart it, allow
//! 3. Window active and `count < max_requests`: increment, allow
//! 4. Window active and `count >= max_requests`: deny with the seconds left
//!
//! Every check first evicts all expired windows. That costs one pass over the
//! tracked clients per request. The table is also capped at `max_clients`;
//! when full, the least recently seen client is dropped.

pub mod middleware;

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use tracing::error;

use crate::config::RateLimitConfig;

pub use middleware::{client_identity, rate_limit, RateLimitState};

/// Per-client window record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindowEntry {
    pub count: u32,
    pub window_start: Instant,
}

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// In-memory sliding-window limiter.
///
/// The table sits behind a mutex that is only held for the synchronous
/// decision, so checks for one client are applied in arrival order.
pub struct SlidingWindowLimiter {
    max_requests: u32,
    window: Duration,
    entries: Mutex<LruCache<String, RateWindowEntry>>,
}

impl SlidingWindowLimiter {
    /// Default cap on tracked client identities.
    pub const DEFAULT_MAX_CLIENTS: usize = 100_000;

    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_max_clients(max_requests, window, Self::DEFAULT_MAX_CLIENTS)
    }

    pub fn with_max_clients(max_requests: u32, window: Duration, max_clients: usize) -> Self {
        let capacity = NonZeroUsize::new(max_clients).unwrap_or(NonZeroUsize::MIN);
        Self {
            max_requests,
            window,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::with_max_clients(config.max_requests, config.window, config.max_clients)
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a request from `client` now.
    pub fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    /// Record a request from `client` at `now`.
    pub fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => {
                error!("Rate limiter mutex poisoned, recovering state");
                poisoned.into_inner()
            }
        };

        self.evict_expired(&mut entries, now);

        if let Some(entry) = entries.get_mut(client) {
            // expired entries were evicted above
            if entry.count >= self.max_requests {
                let elapsed = now.saturating_duration_since(entry.window_start);
                return RateDecision::Limited {
                    retry_after_secs: self.retry_after_secs(elapsed),
                };
            }
            entry.count += 1;
            return RateDecision::Allowed {
                remaining: self.max_requests - entry.count,
            };
        }

        entries.put(
            client.to_string(),
            RateWindowEntry {
                count: 1,
                window_start: now,
            },
        );
        RateDecision::Allowed {
            remaining: self.max_requests.saturating_sub(1),
        }
    }

    /// Current entry for `client`, if any.
    pub fn entry(&self, client: &str) -> Option<RateWindowEntry> {
        let entries = self.entries.lock().ok()?;
        entries.peek(client).copied()
    }

    /// Number of tracked client identities.
    pub fn tracked_clients(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    fn is_expired(&self, entry: &RateWindowEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.window_start) > self.window
    }

    fn evict_expired(&self, entries: &mut LruCache<String, RateWindowEntry>, now: Instant) {
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(client, _)| client.clone())
            .collect();
        for client in expired {
            entries.pop(&client);
        }
    }

    fn retry_after_secs(&self, elapsed: Duration) -> u64 {
        let remaining = self.window.saturating_sub(elapsed);
        let millis = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
        millis.div_ceil(1000)
    }
}
