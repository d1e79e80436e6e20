// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication and role/ownership authorization.
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. The resolver hands the token to a [`TokenVerifier`]
//! 3. On success the [`Principal`] and raw [`BearerToken`] are bound to the
//!    request extensions for downstream handlers
//! 4. Authorization gates check the bound principal:
//!    - [`require_admin`] - administrators only
//!    - [`require_owner_or_admin`] - the resource owner, or any administrator
//!
//! ## Security
//!
//! - Every authentication failure answers 401 with the same message
//! - Verifier details are logged, never returned
//! - Clock skew tolerance is 60 seconds

pub mod authorization;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod principal;
pub mod resolver;
pub mod roles;
pub mod verifier;

pub use authorization::{authorize_admin, authorize_owner_or_admin};
pub use error::{AuthError, VerifyError, MSG_ADMIN_REQUIRED, MSG_NOT_OWNER, MSG_UNAUTHENTICATED};
pub use extractor::{AdminOnly, Auth, MaybeAuth};
pub use middleware::{
    optional_auth, require_admin, require_auth, require_owner_or_admin, AuthState, OwnerField,
};
pub use principal::{BearerToken, Principal};
pub use resolver::{bearer_token, resolve_principal};
pub use roles::Role;
pub use verifier::{JwtVerifier, TokenVerifier};
