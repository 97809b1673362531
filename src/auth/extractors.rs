use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use super::identity::{resolve_optional, resolve_required};
use super::token::TokenService;
use crate::error::AppError;
use crate::users::repo::{User, UserRepository};

/// The authenticated caller; rejects with 401 otherwise.
pub struct CurrentUser(pub User);

/// The caller if a valid token is present, `None` for anonymous requests.
pub struct MaybeUser(pub Option<User>);

fn authorization(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
    Arc<dyn UserRepository>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = TokenService::from_ref(state);
        let users = <Arc<dyn UserRepository>>::from_ref(state);
        let user = resolve_required(&tokens, users.as_ref(), authorization(parts)).await?;
        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
    Arc<dyn UserRepository>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = TokenService::from_ref(state);
        let users = <Arc<dyn UserRepository>>::from_ref(state);
        Ok(MaybeUser(
            resolve_optional(&tokens, users.as_ref(), authorization(parts)).await,
        ))
    }
}
