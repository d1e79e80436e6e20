// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The authenticated caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::roles::Role;

/// Authenticated caller bound to the request context.
///
/// Created by the principal resolver from a verified token and dropped when
/// the request completes. Never persisted by the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Canonical user ID (token `sub` claim)
    pub user_id: String,

    pub role: Role,

    /// Remaining token claims, untouched.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub claims: Map<String, Value>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            claims: Map::new(),
        }
    }

    pub fn with_claims(mut self, claims: Map<String, Value>) -> Self {
        self.claims = claims;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this caller owns a resource belonging to `owner_id`.
    pub fn owns(&self, owner_id: &str) -> bool {
        self.user_id == owner_id
    }
}

/// Raw bearer token of the current request, bound next to the [`Principal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_flag_follows_role() {
        assert!(Principal::new("u1", Role::Admin).is_admin());
        assert!(!Principal::new("u1", Role::User).is_admin());
    }

    #[test]
    fn ownership_compares_user_id() {
        let principal = Principal::new("u1", Role::User);
        assert!(principal.owns("u1"));
        assert!(!principal.owns("u2"));
    }

    #[test]
    fn claims_are_not_serialized_when_empty() {
        let json = serde_json::to_value(Principal::new("u1", Role::User)).unwrap();
        assert_eq!(json, serde_json::json!({"user_id": "u1", "role": "user"}));
    }
}
