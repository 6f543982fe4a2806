use axum::{routing::delete, routing::get, routing::patch, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh_token))
        .route("/auth/revoke", post(handlers::revoke_token))
        .route("/profile", get(handlers::get_profile))
        .route("/profile", patch(handlers::update_profile))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users/:id", get(handlers::get_user))
        .route("/users/:id/posts", get(handlers::list_user_posts))
        .route("/users/:id/followers", get(handlers::list_followers))
        .route("/users/:id/following", get(handlers::list_following))
        .route("/users/:id/relationship", get(handlers::relationship))
        .route("/follow/:id", post(handlers::follow_user))
        .route("/unfollow/:id", post(handlers::unfollow_user))
        .route("/follow-requests", get(handlers::list_follow_requests))
        .route(
            "/follow-requests/:id/accept",
            post(handlers::accept_follow_request),
        )
        .route(
            "/follow-requests/:id/decline",
            delete(handlers::decline_follow_request),
        )
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts", post(handlers::create_post))
        .route("/posts/:id", get(handlers::get_post))
        .route("/posts/:id", delete(handlers::delete_post))
        .route("/posts/:id/like", post(handlers::like_post))
        .route("/posts/:id/like", delete(handlers::unlike_post))
        .route("/posts/:id/comments", post(handlers::comment_post))
        .route("/comments/:id", delete(handlers::delete_comment))
}

pub fn groups() -> Router<AppState> {
    Router::new()
        .route("/groups", get(handlers::list_groups))
        .route("/groups", post(handlers::create_group))
        .route("/groups/feed", get(handlers::groups_feed))
        .route("/groups/:id", get(handlers::get_group))
        .route("/groups/:id/join", post(handlers::join_group))
        .route("/groups/:id/leave", post(handlers::leave_group))
}

pub fn feed() -> Router<AppState> {
    Router::new().route("/feed", get(handlers::home_feed))
}

pub fn exercises() -> Router<AppState> {
    Router::new().route("/exercises", get(handlers::list_exercises))
}

pub fn search() -> Router<AppState> {
    Router::new().route("/search", get(handlers::search))
}
