//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use vidtube_common::AppResult;
use vidtube_core::CommentView;

use crate::{
    extractors::{AuthUser, Pagination},
    middleware::AppState,
    response::ApiResponse,
};

/// Edit comment request.
#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub text: String,
}

/// Delete comment response.
#[derive(Debug, Serialize)]
pub struct DeleteCommentResponse {
    pub deleted: u64,
}

async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCommentRequest>,
) -> AppResult<ApiResponse<CommentView>> {
    let comment = state.comment_service.update(&id, &user, &req.text).await?;
    Ok(ApiResponse::ok(comment))
}

/// Delete a comment and its replies.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<DeleteCommentResponse>> {
    let deleted = state.comment_service.delete(&id, &user).await?;
    Ok(ApiResponse::ok(DeleteCommentResponse { deleted }))
}

async fn replies(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<Pagination>,
) -> AppResult<ApiResponse<Vec<CommentView>>> {
    let replies = state
        .comment_service
        .list_replies(&id, page.limit(), page.offset())
        .await?;
    Ok(ApiResponse::ok(replies))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", put(update).delete(delete))
        .route("/{id}/replies", get(replies))
}
