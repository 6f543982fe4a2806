use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::AuthUser;
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    let body_limit = state.upload_max_bytes as usize + 64 * 1024;
    Router::new()
        .merge(routes::health())
        .merge(routes::auth())
        .merge(routes::users())
        .merge(routes::posts())
        .merge(routes::groups())
        .merge(routes::feed())
        .merge(routes::exercises())
        .merge(routes::search())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
