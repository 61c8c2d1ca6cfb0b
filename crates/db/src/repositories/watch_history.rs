//! Watch history repository.

use std::sync::Arc;

use crate::entities::{WatchHistory, watch_history};
use crate::map_insert_err;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use vidtube_common::{AppError, AppResult};

/// Watch history repository for database operations.
#[derive(Clone)]
pub struct WatchHistoryRepository {
    db: Arc<DatabaseConnection>,
}

impl WatchHistoryRepository {
    /// Create a new watch history repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// A user's watch history, most recently watched first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<watch_history::Model>> {
        WatchHistory::find()
            .filter(watch_history::Column::UserId.eq(user_id))
            .order_by_desc(watch_history::Column::WatchedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // === Transactional operations ===

    /// Find and lock the entry for a (user, video) pair.
    pub async fn find_for_update<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
        video_id: &str,
    ) -> AppResult<Option<watch_history::Model>> {
        WatchHistory::find()
            .filter(watch_history::Column::UserId.eq(user_id))
            .filter(watch_history::Column::VideoId.eq(video_id))
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert an entry.
    pub async fn insert<C: ConnectionTrait>(
        conn: &C,
        model: watch_history::ActiveModel,
    ) -> AppResult<watch_history::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| map_insert_err(e, "Watch history entry"))
    }

    /// Update an existing entry.
    pub async fn update<C: ConnectionTrait>(
        conn: &C,
        model: watch_history::ActiveModel,
    ) -> AppResult<watch_history::Model> {
        model
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
