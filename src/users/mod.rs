use crate::state::AppState;
use axum::Router;

pub mod directory;
mod dto;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod presence;
pub mod repo;
pub mod repo_types;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::presence_routes())
        .merge(handlers::directory_routes())
}
