//! Channel endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use vidtube_common::AppResult;
use vidtube_core::{ChannelView, SubscriptionState, VideoSort, VideoView};

use crate::{
    extractors::{AuthUser, MaybeAuthUser, Pagination},
    middleware::AppState,
    response::ApiResponse,
};

/// `?ids=a,b,c`
#[derive(Debug, Deserialize)]
pub struct ChannelIdsQuery {
    #[serde(default)]
    pub ids: String,
}

impl ChannelIdsQuery {
    fn ids(&self) -> Vec<String> {
        self.ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

/// Subscribe/unsubscribe request.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default = "default_subscribe")]
    pub subscribe: bool,
}

const fn default_subscribe() -> bool {
    true
}

/// Channel videos query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelVideosQuery {
    #[serde(default)]
    pub sort_by: VideoSort,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ChannelIdsQuery>,
) -> AppResult<ApiResponse<Vec<ChannelView>>> {
    let channels = state.channel_service.get_channels(&query.ids()).await?;
    Ok(ApiResponse::ok(channels))
}

async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ChannelView>> {
    let channel = state.channel_service.get_channel(&id, viewer.id()).await?;
    Ok(ApiResponse::ok(channel))
}

async fn subscribe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SubscribeRequest>,
) -> AppResult<ApiResponse<SubscriptionState>> {
    let result = state
        .engagement_service
        .set_subscription(&user.id, &id, req.subscribe)
        .await?;
    Ok(ApiResponse::ok(result))
}

async fn videos(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ChannelVideosQuery>,
    Query(page): Query<Pagination>,
) -> AppResult<ApiResponse<Vec<VideoView>>> {
    let videos = state
        .video_service
        .channel_videos(&id, query.sort_by, page.limit(), page.offset())
        .await?;
    Ok(ApiResponse::ok(videos))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(show))
        .route("/{id}/subscribe", post(subscribe))
        .route("/{id}/videos", get(videos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_ids_are_split_and_trimmed() {
        let query = ChannelIdsQuery {
            ids: "a, b,,c ".to_string(),
        };
        assert_eq!(query.ids(), vec!["a", "b", "c"]);

        let empty = ChannelIdsQuery { ids: String::new() };
        assert!(empty.ids().is_empty());
    }
}
