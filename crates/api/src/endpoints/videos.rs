//! Video endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use vidtube_common::AppResult;
use vidtube_core::{CommentView, CreateVideoInput, ReactionCounts, VideoSort, VideoView};

use crate::{
    extractors::{AuthUser, MaybeAuthUser, Pagination},
    middleware::AppState,
    response::ApiResponse,
};

/// List videos query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVideosQuery {
    pub category: Option<String>,
    pub channel_id: Option<String>,
    #[serde(default)]
    pub sort_by: VideoSort,
}

/// Like/dislike request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRequest {
    pub is_like: bool,
}

/// Add comment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    pub text: String,
    pub parent_id: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListVideosQuery>,
    Query(page): Query<Pagination>,
) -> AppResult<ApiResponse<Vec<VideoView>>> {
    let videos = state
        .video_service
        .list(
            query.category,
            query.channel_id,
            query.sort_by,
            page.limit(),
            page.offset(),
        )
        .await?;
    Ok(ApiResponse::ok(videos))
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateVideoInput>,
) -> AppResult<(StatusCode, ApiResponse<VideoView>)> {
    let video = state.video_service.create(&user, input).await?;
    Ok(ApiResponse::created(video))
}

/// Watch a video. Counts a view unless the owner is watching.
async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<VideoView>> {
    let video = state.video_service.get(&id, viewer.0.as_ref()).await?;
    Ok(ApiResponse::ok(video))
}

async fn related(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<VideoView>>> {
    let videos = state.video_service.related(&id).await?;
    Ok(ApiResponse::ok(videos))
}

/// Like or dislike. Repeating the same reaction removes it.
async fn react(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReactionRequest>,
) -> AppResult<ApiResponse<ReactionCounts>> {
    let counts = state
        .engagement_service
        .set_reaction(&user.id, &id, req.is_like)
        .await?;
    Ok(ApiResponse::ok(counts))
}

async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<Pagination>,
) -> AppResult<ApiResponse<Vec<CommentView>>> {
    let comments = state
        .comment_service
        .list_top_level(&id, page.limit(), page.offset())
        .await?;
    Ok(ApiResponse::ok(comments))
}

async fn add_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AddCommentRequest>,
) -> AppResult<(StatusCode, ApiResponse<CommentView>)> {
    let comment = state
        .comment_service
        .add(&id, &user, &req.text, req.parent_id.as_deref())
        .await?;
    Ok(ApiResponse::created(comment))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show))
        .route("/{id}/related", get(related))
        .route("/{id}/like", post(react))
        .route("/{id}/comments", get(list_comments).post(add_comment))
}
