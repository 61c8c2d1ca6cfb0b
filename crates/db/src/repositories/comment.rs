//! Comment repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Comment, comment};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Statement, Value, sea_query::Expr,
};
use vidtube_common::{AppError, AppResult};

#[derive(Debug, FromQueryResult)]
struct GroupCount {
    key: String,
    count: i64,
}

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a comment by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<comment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::CommentNotFound(id.to_string()))
    }

    /// Create a new comment.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a comment.
    pub async fn update(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Top-level comments on a video, newest first.
    pub async fn find_top_level(
        &self,
        video_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::VideoId.eq(video_id))
            .filter(comment::Column::ParentId.is_null())
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replies to a comment, oldest first.
    pub async fn find_replies(
        &self,
        parent_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::ParentId.eq(parent_id))
            .order_by_asc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// The oldest `per_parent` replies of each parent in a single query, grouped
    /// by parent id. Parents without replies are absent from the map.
    pub async fn find_first_replies(
        &self,
        parent_ids: &[String],
        per_parent: u64,
    ) -> AppResult<HashMap<String, Vec<comment::Model>>> {
        if parent_ids.is_empty() || per_parent == 0 {
            return Ok(HashMap::new());
        }

        let placeholders = (1..=parent_ids.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"SELECT "id", "video_id", "user_id", "parent_id", "text", "likes", "dislikes", "created_at", "updated_at"
FROM (
    SELECT *, ROW_NUMBER() OVER (PARTITION BY "parent_id" ORDER BY "created_at" ASC, "id" ASC) AS "position"
    FROM "comment"
    WHERE "parent_id" IN ({placeholders})
) AS "ranked"
WHERE "position" <= ${limit}
ORDER BY "created_at" ASC, "id" ASC"#,
            limit = parent_ids.len() + 1,
        );

        let mut values: Vec<Value> = parent_ids.iter().map(|id| id.clone().into()).collect();
        values.push(i64::try_from(per_parent).unwrap_or(i64::MAX).into());

        let rows = Comment::find()
            .from_raw_sql(Statement::from_sql_and_values(
                self.db.get_database_backend(),
                sql,
                values,
            ))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut grouped: HashMap<String, Vec<comment::Model>> = HashMap::new();
        for reply in rows {
            if let Some(parent_id) = reply.parent_id.clone() {
                grouped.entry(parent_id).or_default().push(reply);
            }
        }
        Ok(grouped)
    }

    /// Count replies per parent. Parents without replies are absent from the map.
    pub async fn count_replies(&self, parent_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        if parent_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Comment::find()
            .select_only()
            .column_as(comment::Column::ParentId, "key")
            .column_as(Expr::col(comment::Column::Id).count(), "count")
            .filter(comment::Column::ParentId.is_in(parent_ids.to_vec()))
            .group_by(comment::Column::ParentId)
            .into_model::<GroupCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(into_count_map(rows))
    }

    /// Count all comments (replies included) per video.
    pub async fn count_by_videos(&self, video_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        if video_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Comment::find()
            .select_only()
            .column_as(comment::Column::VideoId, "key")
            .column_as(Expr::col(comment::Column::Id).count(), "count")
            .filter(comment::Column::VideoId.is_in(video_ids.to_vec()))
            .group_by(comment::Column::VideoId)
            .into_model::<GroupCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(into_count_map(rows))
    }

    // === Transactional operations ===

    /// Delete a comment together with its replies. Returns the number of rows removed.
    pub async fn delete_with_replies<C: ConnectionTrait>(conn: &C, id: &str) -> AppResult<u64> {
        let replies = Comment::delete_many()
            .filter(comment::Column::ParentId.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let own = Comment::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(replies.rows_affected + own.rows_affected)
    }
}

fn into_count_map(rows: Vec<GroupCount>) -> HashMap<String, u64> {
    rows.into_iter()
        .map(|r| (r.key, r.count.max(0) as u64))
        .collect()
}
