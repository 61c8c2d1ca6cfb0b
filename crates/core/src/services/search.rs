//! Search service.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use vidtube_common::{AppError, AppResult};
use vidtube_db::repositories::{UserRepository, VideoOrder, VideoRepository, VideoSearch};

use crate::services::{
    channel::{ChannelService, ChannelView},
    video::{VideoService, VideoView},
};

/// Channels shown next to videos when searching everything.
pub const ALL_CHANNELS_LIMIT: u64 = 5;

/// Minimum query length, in characters, for suggestions.
pub const SUGGESTION_MIN_CHARS: usize = 2;

const SUGGESTED_TITLES: u64 = 5;
const SUGGESTED_CHANNELS: u64 = 3;
const MAX_SUGGESTIONS: usize = 8;

/// What to search for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Video,
    Channel,
    #[default]
    All,
}

impl SearchKind {
    const fn includes_videos(self) -> bool {
        matches!(self, Self::Video | Self::All)
    }

    const fn includes_channels(self) -> bool {
        matches!(self, Self::Channel | Self::All)
    }
}

/// Upload date window for video results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadWindow {
    Hour,
    #[serde(alias = "today")]
    Day,
    Week,
    Month,
    Year,
}

impl UploadWindow {
    /// Length of the window ending now.
    #[must_use]
    pub fn duration(self) -> Duration {
        match self {
            Self::Hour => Duration::hours(1),
            Self::Day => Duration::hours(24),
            Self::Week => Duration::days(7),
            Self::Month => Duration::days(30),
            Self::Year => Duration::days(365),
        }
    }
}

/// Sort order for video results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSort {
    #[default]
    Relevance,
    UploadDate,
    ViewCount,
    Rating,
}

impl From<SearchSort> for VideoOrder {
    fn from(sort: SearchSort) -> Self {
        match sort {
            SearchSort::Relevance => Self::Relevance,
            SearchSort::UploadDate => Self::Newest,
            SearchSort::ViewCount => Self::Views,
            SearchSort::Rating => Self::Likes,
        }
    }
}

/// Search parameters.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub q: String,
    pub kind: SearchKind,
    pub category: Option<String>,
    pub upload_date: Option<UploadWindow>,
    pub sort: SearchSort,
}

/// Echo of the request alongside the results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMeta {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: SearchKind,
    pub total_results: usize,
}

/// Search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub videos: Vec<VideoView>,
    pub channels: Vec<ChannelView>,
    pub meta: SearchMeta,
}

/// Search service for business logic.
#[derive(Clone)]
pub struct SearchService {
    video_repo: VideoRepository,
    user_repo: UserRepository,
    videos: VideoService,
    channels: ChannelService,
}

impl SearchService {
    /// Create a new search service.
    #[must_use]
    pub fn new(
        video_repo: VideoRepository,
        user_repo: UserRepository,
        videos: VideoService,
        channels: ChannelService,
    ) -> Self {
        Self {
            video_repo,
            user_repo,
            videos,
            channels,
        }
    }

    /// Search public videos and creator channels.
    pub async fn search(
        &self,
        query: SearchQuery,
        limit: u64,
        offset: u64,
    ) -> AppResult<SearchResults> {
        let term = query.q.trim().to_string();
        if term.is_empty() {
            return Err(AppError::BadRequest("Search query is required".to_string()));
        }

        let videos = if query.kind.includes_videos() {
            let search = VideoSearch {
                term: term.clone(),
                category: query.category.filter(|c| !c.is_empty() && c != "All"),
                uploaded_after: query
                    .upload_date
                    .map(|window| (Utc::now() - window.duration()).into()),
                order: query.sort.into(),
            };
            let found = self.video_repo.search(&search, limit, offset).await?;
            self.videos.present(found).await?
        } else {
            Vec::new()
        };

        let channels = if query.kind.includes_channels() {
            let (channel_limit, channel_offset) = if query.kind == SearchKind::All {
                (limit.min(ALL_CHANNELS_LIMIT), 0)
            } else {
                (limit, offset)
            };
            let found = self
                .user_repo
                .search_channels(&term, channel_limit, channel_offset)
                .await?;
            self.channels.present(&found).await?
        } else {
            Vec::new()
        };

        tracing::debug!(
            query = %term,
            videos = videos.len(),
            channels = channels.len(),
            "Search completed"
        );

        let total_results = videos.len() + channels.len();
        Ok(SearchResults {
            videos,
            channels,
            meta: SearchMeta {
                query: term,
                kind: query.kind,
                total_results,
            },
        })
    }

    /// Autocomplete suggestions: popular video titles, then channel names.
    pub async fn suggestions(&self, q: &str) -> AppResult<Vec<String>> {
        let term = q.trim();
        if term.chars().count() < SUGGESTION_MIN_CHARS {
            return Ok(Vec::new());
        }

        let titles = self
            .video_repo
            .suggest_titles(term, SUGGESTED_TITLES)
            .await?;
        let channels = self
            .user_repo
            .suggest_channels(term, SUGGESTED_CHANNELS)
            .await?;

        let mut suggestions: Vec<String> = Vec::with_capacity(MAX_SUGGESTIONS);
        let names = titles
            .into_iter()
            .map(|v| v.title)
            .chain(channels.iter().map(|c| c.display_name().to_string()));
        for name in names {
            if suggestions.len() == MAX_SUGGESTIONS {
                break;
            }
            if !suggestions.contains(&name) {
                suggestions.push(name);
            }
        }

        Ok(suggestions)
    }
}
