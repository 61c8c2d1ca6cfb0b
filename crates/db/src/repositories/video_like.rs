//! Video like repository.

use std::sync::Arc;

use crate::entities::{VideoLike, video_like};
use crate::map_insert_err;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, sea_query::Expr,
};
use vidtube_common::{AppError, AppResult};

/// Video like repository for database operations.
#[derive(Clone)]
pub struct VideoLikeRepository {
    db: Arc<DatabaseConnection>,
}

impl VideoLikeRepository {
    /// Create a new video like repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the reaction a user left on a video.
    pub async fn find_by_user_and_video(
        &self,
        user_id: &str,
        video_id: &str,
    ) -> AppResult<Option<video_like::Model>> {
        VideoLike::find()
            .filter(video_like::Column::UserId.eq(user_id))
            .filter(video_like::Column::VideoId.eq(video_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // === Transactional operations ===

    /// Find and lock the reaction row for a (user, video) pair.
    pub async fn find_for_update<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
        video_id: &str,
    ) -> AppResult<Option<video_like::Model>> {
        VideoLike::find()
            .filter(video_like::Column::UserId.eq(user_id))
            .filter(video_like::Column::VideoId.eq(video_id))
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a reaction row.
    pub async fn insert<C: ConnectionTrait>(
        conn: &C,
        model: video_like::ActiveModel,
    ) -> AppResult<video_like::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| map_insert_err(e, "Reaction"))
    }

    /// Delete a reaction row.
    pub async fn delete_by_id<C: ConnectionTrait>(conn: &C, id: &str) -> AppResult<()> {
        VideoLike::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Switch a reaction between like and dislike.
    pub async fn set_is_like<C: ConnectionTrait>(
        conn: &C,
        id: &str,
        is_like: bool,
    ) -> AppResult<()> {
        VideoLike::update_many()
            .col_expr(video_like::Column::IsLike, Expr::value(is_like))
            .filter(video_like::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
