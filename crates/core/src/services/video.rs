//! Video service.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;
use vidtube_common::{absolutize_url, AppError, AppResult, Config, IdGenerator};
use vidtube_db::{
    entities::{user, video},
    repositories::{CommentRepository, UserRepository, VideoFilter, VideoOrder, VideoRepository},
};

use crate::services::engagement::EngagementService;

/// Number of videos returned by [`VideoService::related`].
pub const RELATED_LIMIT: u64 = 10;

/// Category value meaning "no category filter".
const ALL_CATEGORIES: &str = "All";

/// Sort keys accepted by video listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum VideoSort {
    #[default]
    #[serde(rename = "createdAt")]
    CreatedAt,
    #[serde(rename = "views")]
    Views,
    #[serde(rename = "likes")]
    Likes,
}

impl From<VideoSort> for VideoOrder {
    fn from(sort: VideoSort) -> Self {
        match sort {
            VideoSort::CreatedAt => Self::Newest,
            VideoSort::Views => Self::Views,
            VideoSort::Likes => Self::Likes,
        }
    }
}

/// Input for publishing a video.
///
/// Media files are uploaded beforehand; this only carries their stored paths.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoInput {
    #[validate(length(min = 1, max = 100))]
    pub title: String,

    #[validate(length(min = 1))]
    pub description: String,

    #[validate(length(min = 1, max = 64))]
    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[validate(length(min = 1, max = 1024))]
    pub video_url: String,

    #[validate(length(max = 1024))]
    pub thumbnail_url: Option<String>,

    #[validate(length(max = 16))]
    pub duration: Option<String>,

    #[serde(default = "default_is_public")]
    pub is_public: bool,
}

const fn default_is_public() -> bool {
    true
}

impl CreateVideoInput {
    /// Trim text fields and clean up tags: blanks dropped, duplicates removed
    /// keeping the first occurrence.
    fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.category = self.category.trim().to_string();
        self.tags = normalize_tags(&self.tags);
        self
    }
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Compact channel info embedded in video responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub id: String,
    pub name: String,
    pub username: String,
    pub profile_picture: Option<String>,
    pub verified: bool,
    pub subscribers: i32,
}

impl ChannelSummary {
    #[must_use]
    pub fn new(user: &user::Model, server_url: &str) -> Self {
        Self {
            id: user.id.clone(),
            name: user.display_name().to_string(),
            username: user.username.clone(),
            profile_picture: user
                .profile_picture
                .as_deref()
                .map(|p| absolutize_url(server_url, p)),
            verified: user.verified,
            subscribers: user.subscribers,
        }
    }
}

/// A video as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub video_url: String,
    pub duration: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub views: i64,
    pub likes: i32,
    pub dislikes: i32,
    pub is_public: bool,
    pub comment_count: u64,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub channel: ChannelSummary,
}

impl VideoView {
    #[must_use]
    pub fn new(
        video: &video::Model,
        uploader: &user::Model,
        comment_count: u64,
        server_url: &str,
    ) -> Self {
        Self {
            id: video.id.clone(),
            title: video.title.clone(),
            description: video.description.clone(),
            thumbnail_url: video
                .thumbnail_url
                .as_deref()
                .map(|p| absolutize_url(server_url, p)),
            video_url: absolutize_url(server_url, &video.video_url),
            duration: video.duration.clone(),
            category: video.category.clone(),
            tags: video.tag_list(),
            views: video.views,
            likes: video.likes,
            dislikes: video.dislikes,
            is_public: video.is_public,
            comment_count,
            created_at: video.created_at.to_rfc3339(),
            updated_at: video.updated_at.map(|t| t.to_rfc3339()),
            channel: ChannelSummary::new(uploader, server_url),
        }
    }
}

/// Video service for business logic.
#[derive(Clone)]
pub struct VideoService {
    video_repo: VideoRepository,
    user_repo: UserRepository,
    comment_repo: CommentRepository,
    engagement: EngagementService,
    id_gen: IdGenerator,
    server_url: String,
}

impl VideoService {
    /// Create a new video service.
    #[must_use]
    pub fn new(
        video_repo: VideoRepository,
        user_repo: UserRepository,
        comment_repo: CommentRepository,
        engagement: EngagementService,
        config: &Config,
    ) -> Self {
        Self {
            video_repo,
            user_repo,
            comment_repo,
            engagement,
            id_gen: IdGenerator::new(),
            server_url: config.server.url.clone(),
        }
    }

    /// Publish a video. Only creators may upload.
    pub async fn create(
        &self,
        uploader: &user::Model,
        input: CreateVideoInput,
    ) -> AppResult<VideoView> {
        if !uploader.is_creator {
            return Err(AppError::Forbidden(
                "Only creators can upload videos".to_string(),
            ));
        }

        let input = input.normalized();
        input.validate()?;

        let model = video::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(uploader.id.clone()),
            title: Set(input.title),
            description: Set(input.description),
            thumbnail_url: Set(input.thumbnail_url.filter(|t| !t.trim().is_empty())),
            video_url: Set(input.video_url),
            duration: Set(input.duration.filter(|d| !d.trim().is_empty())),
            category: Set(input.category),
            tags: Set(serde_json::json!(input.tags)),
            views: Set(0),
            likes: Set(0),
            dislikes: Set(0),
            is_public: Set(input.is_public),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let video = self.video_repo.create(model).await?;
        tracing::info!(video_id = %video.id, user_id = %uploader.id, "Video published");

        Ok(VideoView::new(&video, uploader, 0, &self.server_url))
    }

    /// List public videos, optionally filtered by category or uploader.
    pub async fn list(
        &self,
        category: Option<String>,
        channel_id: Option<String>,
        sort: VideoSort,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<VideoView>> {
        let filter = VideoFilter {
            category: category.filter(|c| !c.is_empty() && c != ALL_CATEGORIES),
            user_id: channel_id,
            order: sort.into(),
        };

        let videos = self.video_repo.find_public(&filter, limit, offset).await?;
        self.present(videos).await
    }

    /// Fetch a video for watching and count the view.
    ///
    /// Private videos are only visible to their owner.
    pub async fn get(&self, video_id: &str, viewer: Option<&user::Model>) -> AppResult<VideoView> {
        let video = self.video_repo.get_by_id(video_id).await?;
        let viewer_id = viewer.map(|v| v.id.as_str());

        if !video.is_public && viewer_id != Some(video.user_id.as_str()) {
            return Err(AppError::Forbidden("This video is private".to_string()));
        }

        let video = self.engagement.record_view(video_id, viewer_id).await?;

        self.present(vec![video])
            .await?
            .pop()
            .ok_or_else(|| AppError::VideoNotFound(video_id.to_string()))
    }

    /// Public videos sharing the category or uploader of the given video.
    pub async fn related(&self, video_id: &str) -> AppResult<Vec<VideoView>> {
        let source = self.video_repo.get_by_id(video_id).await?;
        let videos = self.video_repo.find_related(&source, RELATED_LIMIT).await?;
        self.present(videos).await
    }

    /// Public videos of a channel.
    pub async fn channel_videos(
        &self,
        channel_id: &str,
        sort: VideoSort,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<VideoView>> {
        let channel = self.user_repo.get_by_id(channel_id).await?;
        let videos = self
            .video_repo
            .find_by_user(&channel.id, false, sort.into(), limit, offset)
            .await?;
        self.present(videos).await
    }

    /// The caller's own uploads. Creators may include their private videos.
    pub async fn my_videos(
        &self,
        user: &user::Model,
        include_private: bool,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<VideoView>> {
        let videos = self
            .video_repo
            .find_by_user(
                &user.id,
                include_private && user.is_creator,
                VideoOrder::Newest,
                limit,
                offset,
            )
            .await?;
        self.present(videos).await
    }

    /// Attach uploader info and comment counts, preserving input order.
    ///
    /// Videos whose uploader no longer exists are skipped.
    pub async fn present(&self, videos: Vec<video::Model>) -> AppResult<Vec<VideoView>> {
        if videos.is_empty() {
            return Ok(Vec::new());
        }

        let mut uploader_ids: Vec<String> = videos.iter().map(|v| v.user_id.clone()).collect();
        uploader_ids.sort();
        uploader_ids.dedup();
        let video_ids: Vec<String> = videos.iter().map(|v| v.id.clone()).collect();

        let uploaders: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&uploader_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        let comment_counts = self.comment_repo.count_by_videos(&video_ids).await?;

        Ok(videos
            .iter()
            .filter_map(|video| {
                let Some(uploader) = uploaders.get(&video.user_id) else {
                    tracing::warn!(video_id = %video.id, "Video uploader missing, skipping");
                    return None;
                };
                let count = comment_counts.get(&video.id).copied().unwrap_or(0);
                Some(VideoView::new(video, uploader, count, &self.server_url))
            })
            .collect())
    }
}
