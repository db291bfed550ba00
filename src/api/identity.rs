//! Identity boundary: the upstream session provider forwards the caller as
//! `x-user-id` and `x-user-roles` headers. This is the only place they are read.

use axum::{extract::FromRequestParts, http::request::Parts};
use curricula_core::models::{Role, User};
use uuid::Uuid;

use super::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Parses a comma separated role list. Unknown names are skipped.
pub fn parse_roles(raw: &str) -> Vec<Role> {
    raw.split(',')
        .map(|part| part.trim().to_ascii_lowercase())
        .filter_map(|name| Role::from_str(&name))
        .collect()
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthenticated("missing user identity".into()))?;
        let id = Uuid::parse_str(raw_id.trim())
            .map_err(|_| ApiError::Unauthenticated("malformed user identity".into()))?;
        let roles = parts
            .headers
            .get(USER_ROLES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(parse_roles)
            .unwrap_or_default();
        Ok(Self(User::new(id, roles)))
    }
}
