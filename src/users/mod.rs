use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod repo;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
