use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{info, instrument, warn};

use super::dto::{LoginRequest, RegisterRequest, TokenResponse};
use super::password::{hash_password_blocking, verify_password_blocking};
use super::validate;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::users::{dto::UserResponse, repo::NewUser};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<TokenResponse>)> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    validate::username(&payload.username)?;
    validate::email(&payload.email)?;
    validate::password(&payload.password)?;
    if let Some(info) = &payload.profile_info {
        validate::profile_info(info)?;
    }

    if state.users.find_by_username(&payload.username).await?.is_some() {
        warn!(username = %payload.username, "username already registered");
        return Err(AppError::BadRequest("Username already registered".into()));
    }
    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    let hashed_password = hash_password_blocking(payload.password).await??;
    let user = state
        .users
        .create(NewUser {
            username: payload.username,
            email: payload.email,
            hashed_password,
            profile_info: payload.profile_info,
            profile_picture: payload.profile_picture,
        })
        .await?;

    let access_token = state.tokens.issue_default(&user.user_id.to_string())?;

    info!(user_id = user.user_id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(TokenResponse::bearer(access_token, UserResponse::from(user))),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let ident = payload.username.trim();
    let found = if ident.contains('@') {
        state.users.find_by_email(&ident.to_lowercase()).await?
    } else {
        state.users.find_by_username(ident).await?
    };

    let Some(user) = found else {
        warn!("login for unknown user");
        return Err(AppError::InvalidCredentials);
    };

    let ok = verify_password_blocking(payload.password, user.hashed_password.clone()).await??;
    if !ok {
        warn!(user_id = user.user_id, "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let access_token = state.tokens.issue_default(&user.user_id.to_string())?;

    info!(user_id = user.user_id, username = %user.username, "user logged in");
    Ok(Json(TokenResponse::bearer(
        access_token,
        UserResponse::from(user),
    )))
}
