//! Video repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Video, video};
use crate::repositories::{counter_step, like_pattern};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
    prelude::DateTimeWithTimeZone, sea_query::Expr,
};
use vidtube_common::{AppError, AppResult};

/// Ordering for video listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VideoOrder {
    /// Newest first.
    #[default]
    Newest,
    /// Most viewed first.
    Views,
    /// Most liked first.
    Likes,
    /// Views, then likes, then recency.
    Relevance,
}

impl VideoOrder {
    fn apply(self, query: Select<Video>) -> Select<Video> {
        match self {
            Self::Newest => query.order_by_desc(video::Column::CreatedAt),
            Self::Views => query
                .order_by_desc(video::Column::Views)
                .order_by_desc(video::Column::CreatedAt),
            Self::Likes => query
                .order_by_desc(video::Column::Likes)
                .order_by_desc(video::Column::CreatedAt),
            Self::Relevance => query
                .order_by_desc(video::Column::Views)
                .order_by_desc(video::Column::Likes)
                .order_by_desc(video::Column::CreatedAt),
        }
    }
}

/// Filter for listing public videos.
#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    /// Only videos in this category.
    pub category: Option<String>,
    /// Only videos uploaded by this user.
    pub user_id: Option<String>,
    /// Result ordering.
    pub order: VideoOrder,
}

/// Parameters for a video search.
#[derive(Debug, Clone, Default)]
pub struct VideoSearch {
    /// Free-text term, matched against title, description and tags.
    pub term: String,
    /// Only videos in this category.
    pub category: Option<String>,
    /// Only videos uploaded at or after this instant.
    pub uploaded_after: Option<DateTimeWithTimeZone>,
    /// Result ordering.
    pub order: VideoOrder,
}

#[derive(Debug, FromQueryResult)]
struct UserVideoCount {
    user_id: String,
    count: i64,
}

/// Video repository for database operations.
#[derive(Clone)]
pub struct VideoRepository {
    db: Arc<DatabaseConnection>,
}

impl VideoRepository {
    /// Create a new video repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a video by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<video::Model>> {
        Self::fetch(self.db.as_ref(), id).await
    }

    /// Find a video by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<video::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::VideoNotFound(id.to_string()))
    }

    /// Find videos by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<video::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Video::find()
            .filter(video::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new video.
    pub async fn create(&self, model: video::ActiveModel) -> AppResult<video::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List public videos.
    pub async fn find_public(
        &self,
        filter: &VideoFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<video::Model>> {
        let mut query = Video::find().filter(video::Column::IsPublic.eq(true));

        if let Some(category) = &filter.category {
            query = query.filter(video::Column::Category.eq(category.as_str()));
        }
        if let Some(user_id) = &filter.user_id {
            query = query.filter(video::Column::UserId.eq(user_id.as_str()));
        }

        filter
            .order
            .apply(query)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Public videos sharing the category or the uploader of `source`.
    pub async fn find_related(
        &self,
        source: &video::Model,
        limit: u64,
    ) -> AppResult<Vec<video::Model>> {
        Video::find()
            .filter(video::Column::IsPublic.eq(true))
            .filter(video::Column::Id.ne(source.id.as_str()))
            .filter(
                Condition::any()
                    .add(video::Column::Category.eq(source.category.as_str()))
                    .add(video::Column::UserId.eq(source.user_id.as_str())),
            )
            .order_by_desc(video::Column::Views)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Videos uploaded by a user, optionally including private ones.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        include_private: bool,
        order: VideoOrder,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<video::Model>> {
        let mut query = Video::find().filter(video::Column::UserId.eq(user_id));

        if !include_private {
            query = query.filter(video::Column::IsPublic.eq(true));
        }

        order
            .apply(query)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count a user's public videos.
    pub async fn count_public_by_user(&self, user_id: &str) -> AppResult<u64> {
        Video::find()
            .filter(video::Column::UserId.eq(user_id))
            .filter(video::Column::IsPublic.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count public videos per uploader. Users without videos are absent from the map.
    pub async fn count_public_by_users(
        &self,
        user_ids: &[String],
    ) -> AppResult<HashMap<String, u64>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Video::find()
            .select_only()
            .column(video::Column::UserId)
            .column_as(Expr::col(video::Column::Id).count(), "count")
            .filter(video::Column::UserId.is_in(user_ids.to_vec()))
            .filter(video::Column::IsPublic.eq(true))
            .group_by(video::Column::UserId)
            .into_model::<UserVideoCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| (r.user_id, r.count.max(0) as u64))
            .collect())
    }

    /// Search public videos.
    ///
    /// The term matches case-insensitively as a substring of the title or
    /// description, or exactly as one of the tags.
    pub async fn search(
        &self,
        search: &VideoSearch,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<video::Model>> {
        use sea_orm::sea_query::extension::postgres::PgExpr;

        let pattern = like_pattern(&search.term);
        let tag = serde_json::json!([search.term]);

        let mut query = Video::find().filter(video::Column::IsPublic.eq(true)).filter(
            Condition::any()
                .add(Expr::col(video::Column::Title).ilike(&pattern))
                .add(Expr::col(video::Column::Description).ilike(&pattern))
                .add(PgExpr::contains(Expr::col(video::Column::Tags), Expr::val(tag))),
        );

        if let Some(category) = &search.category {
            query = query.filter(video::Column::Category.eq(category.as_str()));
        }
        if let Some(after) = search.uploaded_after {
            query = query.filter(video::Column::CreatedAt.gte(after));
        }

        search
            .order
            .apply(query)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most viewed public videos whose title contains the term.
    pub async fn suggest_titles(&self, term: &str, limit: u64) -> AppResult<Vec<video::Model>> {
        use sea_orm::sea_query::extension::postgres::PgExpr;

        Video::find()
            .filter(video::Column::IsPublic.eq(true))
            .filter(Expr::col(video::Column::Title).ilike(like_pattern(term)))
            .order_by_desc(video::Column::Views)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // === Transactional operations ===

    /// Find a video by ID on the given connection.
    pub async fn fetch<C: ConnectionTrait>(conn: &C, id: &str) -> AppResult<Option<video::Model>> {
        Video::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Move the like and dislike counters in a single UPDATE, clamped at zero.
    pub async fn adjust_reactions<C: ConnectionTrait>(
        conn: &C,
        video_id: &str,
        likes_delta: i32,
        dislikes_delta: i32,
    ) -> AppResult<()> {
        let mut update = Video::update_many();
        if likes_delta != 0 {
            update = update.col_expr(
                video::Column::Likes,
                counter_step(video::Column::Likes, likes_delta),
            );
        }
        if dislikes_delta != 0 {
            update = update.col_expr(
                video::Column::Dislikes,
                counter_step(video::Column::Dislikes, dislikes_delta),
            );
        }

        update
            .filter(video::Column::Id.eq(video_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment the view counter.
    pub async fn increment_views<C: ConnectionTrait>(conn: &C, video_id: &str) -> AppResult<()> {
        Video::update_many()
            .col_expr(video::Column::Views, Expr::col(video::Column::Views).add(1))
            .filter(video::Column::Id.eq(video_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::transaction_log;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_video(id: &str, user_id: &str, category: &str) -> video::Model {
        video::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            title: format!("Video {id}"),
            description: "A test video".to_string(),
            thumbnail_url: None,
            video_url: format!("/uploads/videos/{id}.mp4"),
            duration: Some("3:14".to_string()),
            category: category.to_string(),
            tags: serde_json::json!(["rust", "tutorial"]),
            views: 0,
            likes: 0,
            dislikes: 0,
            is_public: true,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn exec_ok() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found_returns_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<video::Model>::new()])
                .into_connection(),
        );

        let repo = VideoRepository::new(db);
        let result = repo.get_by_id("missing").await;

        match result {
            Err(AppError::VideoNotFound(id)) => assert_eq!(id, "missing"),
            _ => panic!("Expected VideoNotFound error"),
        }
    }

    #[tokio::test]
    async fn test_find_public_with_category() {
        let v1 = create_test_video("v1", "user1", "Music");
        let v2 = create_test_video("v2", "user2", "Music");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[v1, v2]])
                .into_connection(),
        );

        let repo = VideoRepository::new(db);
        let filter = VideoFilter {
            category: Some("Music".to_string()),
            order: VideoOrder::Views,
            ..Default::default()
        };
        let result = repo.find_public(&filter, 20, 0).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "v1");
    }

    #[tokio::test]
    async fn test_search_uses_ilike_and_tag_containment() {
        let v1 = create_test_video("v1", "user1", "Education");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[v1]])
                .into_connection(),
        );

        let repo = VideoRepository::new(db.clone());
        let search = VideoSearch {
            term: "rust".to_string(),
            order: VideoOrder::Relevance,
            ..Default::default()
        };
        let result = repo.search(&search, 20, 0).await.unwrap();
        assert_eq!(result.len(), 1);

        drop(repo);
        let sql = transaction_log(db);
        assert!(sql.contains("ILIKE"), "{sql}");
        assert!(sql.contains("@>"), "{sql}");
    }

    #[test]
    fn test_tag_list_skips_non_strings() {
        let mut video = create_test_video("v1", "user1", "Music");
        video.tags = serde_json::json!(["a", 1, "b", null]);

        assert_eq!(video.tag_list(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_adjust_reactions_flip_updates_both_counters() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok()])
            .into_connection();

        VideoRepository::adjust_reactions(&db, "v1", -1, 1)
            .await
            .unwrap();

        let sql = format!("{:?}", db.into_transaction_log());
        assert!(sql.contains("GREATEST(likes - 1, 0)"), "{sql}");
        assert!(sql.contains("dislikes"), "{sql}");
    }

    #[tokio::test]
    async fn test_increment_views() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok()])
            .into_connection();

        let result = VideoRepository::increment_views(&db, "v1").await;

        assert!(result.is_ok());
    }
}
