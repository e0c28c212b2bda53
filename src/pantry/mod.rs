mod dto;
pub mod handlers;
pub mod quantity;
pub mod repo;
pub mod repo_types;
pub mod rules;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::pantry_routes())
}
