//! Authentication endpoints.
//!
//! Token issuance lives outside this service; only registration and the
//! current-user lookup are served here.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use vidtube_common::AppResult;
use vidtube_core::{AccountView, RegisterInput};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Register a new account.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<(StatusCode, ApiResponse<AccountView>)> {
    let account = state.user_service.register(input).await?;
    Ok(ApiResponse::created(account))
}

/// Get the current user.
async fn me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<AccountView>> {
    Ok(ApiResponse::ok(state.user_service.account(&user)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/me", get(me))
}
