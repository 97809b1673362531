use crate::state::AppState;
use axum::Router;

mod error;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod identity;
pub mod password;
pub mod token;
pub mod validate;

pub use error::AuthError;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
