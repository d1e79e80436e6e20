// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization decisions over the bound [`Principal`].

use super::{AuthError, Principal};

/// Allow administrators only.
pub fn authorize_admin(principal: Option<&Principal>) -> Result<(), AuthError> {
    let principal = principal.ok_or(AuthError::Unauthenticated)?;
    if principal.is_admin() {
        Ok(())
    } else {
        Err(AuthError::AdminRequired)
    }
}

/// Allow the resource owner or any administrator.
///
/// `owner_id` is the value resolved for `field`; administrators pass even
/// when it names somebody else.
pub fn authorize_owner_or_admin(
    principal: Option<&Principal>,
    field: &str,
    owner_id: Option<&str>,
) -> Result<(), AuthError> {
    let principal = principal.ok_or(AuthError::Unauthenticated)?;
    let owner_id = owner_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AuthError::MissingOwnerField(field.to_string()))?;

    if principal.is_admin() || principal.owns(owner_id) {
        Ok(())
    } else {
        Err(AuthError::NotOwner)
    }
}
