//! Watch history service.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{DatabaseConnection, IntoActiveModel, Set, TransactionTrait};
use serde::Serialize;
use vidtube_common::{AppError, AppResult, IdGenerator};
use vidtube_db::{
    entities::watch_history,
    repositories::{VideoRepository, WatchHistoryRepository},
};

use crate::services::video::{VideoService, VideoView};

/// A stored watch history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchRecord {
    pub id: String,
    pub video_id: String,
    pub watched_at: String,
    pub watch_time: i32,
}

impl From<watch_history::Model> for WatchRecord {
    fn from(entry: watch_history::Model) -> Self {
        Self {
            id: entry.id,
            video_id: entry.video_id,
            watched_at: entry.watched_at.to_rfc3339(),
            watch_time: entry.watch_time,
        }
    }
}

/// A watch history entry with its video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryItem {
    pub id: String,
    pub watched_at: String,
    pub watch_time: i32,
    pub video: VideoView,
}

/// Watch history service for business logic.
#[derive(Clone)]
pub struct HistoryService {
    db: Arc<DatabaseConnection>,
    history_repo: WatchHistoryRepository,
    video_repo: VideoRepository,
    videos: VideoService,
    id_gen: IdGenerator,
}

impl HistoryService {
    /// Create a new history service.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        history_repo: WatchHistoryRepository,
        video_repo: VideoRepository,
        videos: VideoService,
    ) -> Self {
        Self {
            db,
            history_repo,
            video_repo,
            videos,
            id_gen: IdGenerator::new(),
        }
    }

    /// Record that the user watched a video for `watch_time` seconds.
    ///
    /// Keeps a single entry per (user, video); watching again moves it to the
    /// top and replaces the watch time.
    pub async fn record_watch(
        &self,
        user_id: &str,
        video_id: &str,
        watch_time: i32,
    ) -> AppResult<WatchRecord> {
        if watch_time < 0 {
            return Err(AppError::Validation(
                "watchTime must not be negative".to_string(),
            ));
        }

        self.video_repo.get_by_id(video_id).await?;

        match self.upsert(user_id, video_id, watch_time).await {
            Err(AppError::Conflict(_)) => {
                tracing::debug!(user_id, video_id, "Concurrent history insert, retrying");
                self.upsert(user_id, video_id, watch_time).await
            }
            result => result,
        }
    }

    async fn upsert(
        &self,
        user_id: &str,
        video_id: &str,
        watch_time: i32,
    ) -> AppResult<WatchRecord> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let entry = match WatchHistoryRepository::find_for_update(&txn, user_id, video_id).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.watched_at = Set(Utc::now().into());
                active.watch_time = Set(watch_time);
                WatchHistoryRepository::update(&txn, active).await?
            }
            None => {
                let model = watch_history::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    user_id: Set(user_id.to_string()),
                    video_id: Set(video_id.to_string()),
                    watched_at: Set(Utc::now().into()),
                    watch_time: Set(watch_time),
                };
                WatchHistoryRepository::insert(&txn, model).await?
            }
        };

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(entry.into())
    }

    /// The user's watch history, most recent first.
    pub async fn list(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<WatchHistoryItem>> {
        let entries = self.history_repo.find_by_user(user_id, limit, offset).await?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let video_ids: Vec<String> = entries.iter().map(|e| e.video_id.clone()).collect();
        let videos = self.video_repo.find_by_ids(&video_ids).await?;
        let views: HashMap<String, VideoView> = self
            .videos
            .present(videos)
            .await?
            .into_iter()
            .map(|v| (v.id.clone(), v))
            .collect();

        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let video = views.get(&entry.video_id)?.clone();
                Some(WatchHistoryItem {
                    id: entry.id,
                    watched_at: entry.watched_at.to_rfc3339(),
                    watch_time: entry.watch_time,
                    video,
                })
            })
            .collect())
    }
}
