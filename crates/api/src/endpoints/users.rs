//! User endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;
use vidtube_common::AppResult;
use vidtube_core::{
    AccountView, ProfileView, SubscriptionView, UpdateProfileInput, VideoView, WatchHistoryItem,
    WatchRecord,
};

use crate::{
    extractors::{AuthUser, Pagination},
    middleware::AppState,
    response::ApiResponse,
};

/// My videos query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyVideosQuery {
    #[serde(default)]
    pub include_private: bool,
}

/// Record watch request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordWatchRequest {
    pub video_id: String,
    #[serde(default)]
    pub watch_time: i32,
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ProfileView>> {
    let profile = state.user_service.get_profile(&id).await?;
    Ok(ApiResponse::ok(profile))
}

async fn update_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<AccountView>> {
    let account = state.user_service.update_profile(&user.id, input).await?;
    Ok(ApiResponse::ok(account))
}

async fn subscriptions(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> AppResult<ApiResponse<Vec<SubscriptionView>>> {
    let subscriptions = state
        .channel_service
        .list_subscriptions(&user.id, page.limit(), page.offset())
        .await?;
    Ok(ApiResponse::ok(subscriptions))
}

async fn my_videos(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<MyVideosQuery>,
    Query(page): Query<Pagination>,
) -> AppResult<ApiResponse<Vec<VideoView>>> {
    let videos = state
        .video_service
        .my_videos(&user, query.include_private, page.limit(), page.offset())
        .await?;
    Ok(ApiResponse::ok(videos))
}

async fn watch_history(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> AppResult<ApiResponse<Vec<WatchHistoryItem>>> {
    let items = state
        .history_service
        .list(&user.id, page.limit(), page.offset())
        .await?;
    Ok(ApiResponse::ok(items))
}

async fn record_watch(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RecordWatchRequest>,
) -> AppResult<(StatusCode, ApiResponse<WatchRecord>)> {
    let record = state
        .history_service
        .record_watch(&user.id, &req.video_id, req.watch_time)
        .await?;
    Ok(ApiResponse::created(record))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", put(update_profile))
        .route("/me/subscriptions", get(subscriptions))
        .route("/me/videos", get(my_videos))
        .route("/me/watch-history", get(watch_history).post(record_watch))
        .route("/{id}", get(show))
}
