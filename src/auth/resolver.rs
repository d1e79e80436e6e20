// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Principal resolution from the `Authorization` header.

use axum::http::HeaderValue;

use super::{AuthError, Principal, TokenVerifier};

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token from a `Bearer <token>` header value.
pub fn bearer_token(header: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let header = header
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::InvalidAuthHeader)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    Ok(token)
}

/// Resolve the caller behind an `Authorization` header.
///
/// Verifier failures (invalid or expired) are kept as the error's source for
/// logging; callers only ever see a 401.
pub async fn resolve_principal(
    verifier: &dyn TokenVerifier,
    header: Option<&HeaderValue>,
) -> Result<(Principal, String), AuthError> {
    let token = bearer_token(header)?;
    let principal = verifier.verify(token).await?;
    Ok((principal, token.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::{Role, VerifyError};
    use async_trait::async_trait;

    /// Verifier accepting `admin-token` and `user-<id>` tokens.
    pub(crate) struct StaticVerifier;

    #[async_trait]
    impl TokenVerifier for StaticVerifier {
        async fn verify(&self, token: &str) -> Result<Principal, VerifyError> {
            match token {
                "admin-token" => Ok(Principal::new("admin", Role::Admin)),
                "expired-token" => Err(VerifyError::ExpiredToken),
                _ => token
                    .strip_prefix("user-")
                    .map(|id| Principal::new(id, Role::User))
                    .ok_or_else(|| VerifyError::InvalidToken("unknown token".into())),
            }
        }
    }

    async fn resolve(header: Option<&'static str>) -> Result<(Principal, String), AuthError> {
        let value = header.map(HeaderValue::from_static);
        resolve_principal(&StaticVerifier, value.as_ref()).await
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        assert!(matches!(resolve(None).await, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn malformed_headers_are_rejected() {
        assert!(matches!(
            resolve(Some("Basic dXNlcjpwYXNz")).await,
            Err(AuthError::InvalidAuthHeader)
        ));
        assert!(matches!(resolve(Some("Bearer")).await, Err(AuthError::InvalidAuthHeader)));
        assert!(matches!(resolve(Some("Bearer    ")).await, Err(AuthError::EmptyToken)));
    }

    #[tokio::test]
    async fn verifier_failures_become_rejected() {
        assert!(matches!(
            resolve(Some("Bearer expired-token")).await,
            Err(AuthError::Rejected(VerifyError::ExpiredToken))
        ));
        assert!(matches!(
            resolve(Some("Bearer garbage")).await,
            Err(AuthError::Rejected(VerifyError::InvalidToken(_)))
        ));
    }

    #[tokio::test]
    async fn accepted_token_yields_verifier_principal() {
        let (principal, token) = resolve(Some("Bearer user-u1")).await.unwrap();
        assert_eq!(principal, Principal::new("u1", Role::User));
        assert_eq!(token, "user-u1");
    }
}
