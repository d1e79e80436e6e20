// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};

/// Caller role carried by a verified token.
///
/// - `Admin` - full access, overrides ownership checks
/// - `User` - regular caller, limited to resources it owns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    /// Default role is User (least privilege for authenticated callers).
    #[default]
    User,
}

impl Role {
    /// Parse role from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "admin" | "administrator" => Some(Role::Admin),
            "user" | "client" => Some(Role::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_claim_values() {
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(Role::parse(&Role::User.to_string()), Some(Role::User));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("Client"), Some(Role::User));
        assert_eq!(Role::parse("auditor"), None);
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }
}
