//! API endpoints.

mod auth;
mod channels;
mod comments;
mod search;
mod users;
mod videos;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/videos", videos::router())
        .nest("/comments", comments::router())
        .nest("/channels", channels::router())
        .nest("/users", users::router())
        .nest("/search", search::router())
}
