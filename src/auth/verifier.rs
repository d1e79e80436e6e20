// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token verification.
//!
//! The gate treats verification as an opaque collaborator behind
//! [`TokenVerifier`]. [`JwtVerifier`] is the HS256 implementation used by the
//! server binary.

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

use super::{Principal, Role, VerifyError};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Turns a raw bearer token into a [`Principal`].
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, VerifyError>;
}

/// HS256 JWT verifier.
///
/// Recognized claims:
/// - `sub` (or `id`) - user ID, required
/// - `is_admin` - boolean admin flag
/// - `role` - `"admin"` also grants admin
///
/// All other claims are kept on the principal.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn hs256(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    fn principal_from_claims(mut claims: Map<String, Value>) -> Result<Principal, VerifyError> {
        let user_id = match claims.remove("sub").or_else(|| claims.remove("id")) {
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err(VerifyError::InvalidToken("missing subject claim".into())),
        };

        let admin_flag = claims
            .get("is_admin")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let role_claim = claims
            .get("role")
            .and_then(Value::as_str)
            .and_then(Role::parse);
        let role = if admin_flag || role_claim == Some(Role::Admin) {
            Role::Admin
        } else {
            Role::User
        };

        Ok(Principal::new(user_id, role).with_claims(claims))
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, VerifyError> {
        let token_data = decode::<Map<String, Value>>(token, &self.key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => VerifyError::ExpiredToken,
                _ => VerifyError::InvalidToken(e.to_string()),
            })?;

        Self::principal_from_claims(token_data.claims)
    }
}
