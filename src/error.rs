use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::{identity::ResolveError, AuthError};
use crate::users::repo::Duplicate;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    /// Uniform rejection for every token problem.
    #[error("Could not validate credentials")]
    Unauthorized,

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<Duplicate>() {
            Ok(dup) => AppError::BadRequest(dup.to_string()),
            Err(e) => AppError::Internal(e),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidInput(msg) => AppError::BadRequest(msg),
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<ResolveError> for AppError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Unauthenticated => AppError::Unauthorized,
            ResolveError::Lookup(e) => AppError::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let detail = match &self {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let mut res = (status, Json(json!({ "detail": detail }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        res
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_carries_bearer_challenge() {
        let res = AppError::Unauthorized.into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    }

    #[test]
    fn invalid_credentials_is_401_with_challenge() {
        let res = AppError::InvalidCredentials.into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            AppError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        let internal = AppError::Internal(anyhow::anyhow!("db down")).into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!internal.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn resolve_errors_map_to_http_errors() {
        assert!(matches!(
            AppError::from(ResolveError::Unauthenticated),
            AppError::Unauthorized
        ));
        assert!(matches!(
            AppError::from(ResolveError::Lookup(anyhow::anyhow!("boom"))),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn unique_violations_are_client_errors() {
        let err = AppError::from(anyhow::Error::from(Duplicate::Email));
        assert!(matches!(&err, AppError::BadRequest(m) if m == "Email already registered"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let other = AppError::from(anyhow::anyhow!("connection reset"));
        assert!(matches!(other, AppError::Internal(_)));
    }

    #[test]
    fn auth_input_errors_are_client_errors() {
        assert!(matches!(
            AppError::from(AuthError::InvalidInput("empty".into())),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(AuthError::Signing("x".into())),
            AppError::Internal(_)
        ));
    }
}
