use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{SearchParams, UserProfileResponse, UserResponse, UserUpdate};
use super::repo::{User, UserChanges};
use crate::auth::{
    extractors::{CurrentUser, MaybeUser},
    password::hash_password_blocking,
    validate,
};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const MAX_PAGE: i64 = 100;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(search_users))
        .route(
            "/users/me",
            get(get_me).put(update_me).delete(delete_me),
        )
        .route("/users/username/:username", get(get_user_by_username))
        .route("/users/:user_id", get(get_user))
        .route("/users/:user_id/stats", get(get_user_stats))
}

async fn profile_for(
    state: &AppState,
    user: User,
    viewer: Option<&User>,
) -> AppResult<UserProfileResponse> {
    let stats = state.users.stats(user.user_id).await?;
    let is_following = match viewer {
        Some(v) if v.user_id != user.user_id => {
            state.users.is_following(v.user_id, user.user_id).await?
        }
        _ => false,
    };
    Ok(UserProfileResponse {
        user: UserResponse::from(user).with_stats(stats),
        is_following,
    })
}

#[instrument(skip(state, user))]
pub async fn get_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<UserResponse>> {
    let stats = state.users.stats(user.user_id).await?;
    Ok(Json(UserResponse::from(user).with_stats(stats)))
}

#[instrument(skip(state, user, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UserUpdate>,
) -> AppResult<Json<UserResponse>> {
    let mut changes = UserChanges::default();

    // empty username, email or password means "leave unchanged"
    let username = payload.username.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    let email = payload.email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty());
    let password = payload.password.filter(|p| !p.is_empty());

    if let Some(name) = username {
        validate::username(&name)?;
        if let Some(other) = state.users.find_by_username(&name).await? {
            if other.user_id != user.user_id {
                return Err(AppError::BadRequest("Username already taken".into()));
            }
        }
        changes.username = Some(name);
    }
    if let Some(email) = email {
        validate::email(&email)?;
        if let Some(other) = state.users.find_by_email(&email).await? {
            if other.user_id != user.user_id {
                return Err(AppError::BadRequest("Email already registered".into()));
            }
        }
        changes.email = Some(email);
    }
    if let Some(info) = payload.profile_info {
        validate::profile_info(&info)?;
        changes.profile_info = Some(info);
    }
    changes.profile_picture = payload.profile_picture;
    if let Some(password) = password {
        validate::password(&password)?;
        changes.hashed_password = Some(hash_password_blocking(password).await??);
    }

    let updated = state
        .users
        .update(user.user_id, changes)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let stats = state.users.stats(updated.user_id).await?;

    info!(user_id = updated.user_id, "profile updated");
    Ok(Json(UserResponse::from(updated).with_stats(stats)))
}

#[instrument(skip(state, user))]
pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<StatusCode> {
    state.users.delete(user.user_id).await?;
    info!(user_id = user.user_id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, viewer))]
pub async fn get_user(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(user_id): Path<i64>,
) -> AppResult<Json<UserProfileResponse>> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(profile_for(&state, user, viewer.as_ref()).await?))
}

#[instrument(skip(state, viewer))]
pub async fn get_user_by_username(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(username): Path<String>,
) -> AppResult<Json<UserProfileResponse>> {
    let user = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(profile_for(&state, user, viewer.as_ref()).await?))
}

#[instrument(skip(state))]
pub async fn get_user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<super::repo::UserStats>> {
    if state.users.find_by_id(user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }
    Ok(Json(state.users.stats(user_id).await?))
}

#[instrument(skip(state, viewer))]
pub async fn search_users(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<UserProfileResponse>>> {
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, MAX_PAGE);
    let users = state.users.search(&params.query, skip, limit).await?;

    let mut out = Vec::with_capacity(users.len());
    for user in users {
        out.push(profile_for(&state, user, viewer.as_ref()).await?);
    }
    Ok(Json(out))
}
