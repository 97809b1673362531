//! Request identity resolution: bearer header -> verified claims -> user row.
//!
//! Both entry points share [`authenticate`], so the required and optional paths
//! apply the same token checks and the same subject-to-id coercion. Nothing here
//! depends on the HTTP framework; the axum extractors in `extractors.rs` only pass
//! the raw `Authorization` header value in.

use thiserror::Error;
use tracing::{debug, warn};

use super::token::{Claims, TokenService};
use crate::users::repo::{User, UserRepository};

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Missing, malformed, forged or expired token, or a subject that names no user.
    #[error("could not validate credentials")]
    Unauthenticated,
    /// The user store itself failed.
    #[error("user lookup failed")]
    Lookup(#[source] anyhow::Error),
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
/// The scheme is matched case-insensitively.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let (scheme, token) = header?.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Parses the string subject claim back into a numeric user id.
pub fn subject_user_id(claims: &Claims) -> Option<i64> {
    claims.sub.as_deref()?.parse::<i64>().ok()
}

pub async fn authenticate(
    tokens: &TokenService,
    users: &dyn UserRepository,
    authorization: Option<&str>,
) -> Result<User, ResolveError> {
    let Some(token) = bearer_token(authorization) else {
        debug!("no bearer token");
        return Err(ResolveError::Unauthenticated);
    };
    let claims = tokens
        .verify(token)
        .map_err(|_| ResolveError::Unauthenticated)?;
    let Some(user_id) = subject_user_id(&claims) else {
        debug!("token subject missing or not numeric");
        return Err(ResolveError::Unauthenticated);
    };
    match users.find_by_id(user_id).await {
        Ok(Some(user)) => {
            debug!(user_id, "request authenticated");
            Ok(user)
        }
        Ok(None) => {
            debug!(user_id, "token subject has no user");
            Err(ResolveError::Unauthenticated)
        }
        Err(e) => Err(ResolveError::Lookup(e)),
    }
}

/// Resolves the caller or fails with [`ResolveError::Unauthenticated`].
pub async fn resolve_required(
    tokens: &TokenService,
    users: &dyn UserRepository,
    authorization: Option<&str>,
) -> Result<User, ResolveError> {
    authenticate(tokens, users, authorization).await
}

/// Resolves the caller if possible; every failure degrades to anonymous.
pub async fn resolve_optional(
    tokens: &TokenService,
    users: &dyn UserRepository,
    authorization: Option<&str>,
) -> Option<User> {
    match authenticate(tokens, users, authorization).await {
        Ok(user) => Some(user),
        Err(ResolveError::Unauthenticated) => None,
        Err(ResolveError::Lookup(e)) => {
            warn!(error = %e, "user lookup failed; treating request as anonymous");
            None
        }
    }
}
