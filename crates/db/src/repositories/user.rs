//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use crate::map_insert_err;
use crate::repositories::{counter_step, like_pattern};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};
use vidtube_common::{AppError, AppResult};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        Self::fetch(self.db.as_ref(), id).await
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find users by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the creators (channels) among the given IDs.
    pub async fn find_creators_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .filter(user::Column::IsCreator.eq(true))
            .order_by_desc(user::Column::Subscribers)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by email.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| map_insert_err(e, "User"))
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| map_insert_err(e, "Username"))
    }

    /// Search channels by username, channel name or description.
    pub async fn search_channels(
        &self,
        query: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user::Model>> {
        use sea_orm::sea_query::extension::postgres::PgExpr;

        let pattern = like_pattern(query);

        User::find()
            .filter(user::Column::IsCreator.eq(true))
            .filter(
                Condition::any()
                    .add(Expr::col(user::Column::Username).ilike(&pattern))
                    .add(Expr::col(user::Column::ChannelName).ilike(&pattern))
                    .add(Expr::col(user::Column::Description).ilike(&pattern)),
            )
            .order_by_desc(user::Column::Subscribers)
            .order_by_desc(user::Column::TotalViews)
            .order_by_desc(user::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most subscribed channels whose username or channel name contains the term.
    pub async fn suggest_channels(&self, term: &str, limit: u64) -> AppResult<Vec<user::Model>> {
        use sea_orm::sea_query::extension::postgres::PgExpr;

        let pattern = like_pattern(term);

        User::find()
            .filter(user::Column::IsCreator.eq(true))
            .filter(
                Condition::any()
                    .add(Expr::col(user::Column::Username).ilike(&pattern))
                    .add(Expr::col(user::Column::ChannelName).ilike(&pattern)),
            )
            .order_by_desc(user::Column::Subscribers)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // === Transactional operations ===

    /// Find a user by ID on the given connection.
    pub async fn fetch<C: ConnectionTrait>(conn: &C, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Move the subscriber counter by `delta`, clamped at zero.
    pub async fn adjust_subscribers<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
        delta: i32,
    ) -> AppResult<()> {
        User::update_many()
            .col_expr(
                user::Column::Subscribers,
                counter_step(user::Column::Subscribers, delta),
            )
            .filter(user::Column::Id.eq(user_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment the total views counter.
    pub async fn increment_total_views<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
    ) -> AppResult<()> {
        User::update_many()
            .col_expr(
                user::Column::TotalViews,
                Expr::col(user::Column::TotalViews).add(1),
            )
            .filter(user::Column::Id.eq(user_id))
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

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            email: format!("{username}@example.com"),
            username: username.to_string(),
            password: "hash".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            profile_picture: None,
            banner_image: None,
            description: None,
            is_creator: true,
            verified: false,
            channel_name: Some("Test User".to_string()),
            subscribers: 0,
            total_views: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let user = create_test_user("user1", "testuser");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_id("user1").await.unwrap();

        assert!(result.is_some());
        let found_user = result.unwrap();
        assert_eq!(found_user.id, "user1");
        assert_eq!(found_user.username, "testuser");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found_returns_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.get_by_id("nonexistent").await;

        match result {
            Err(AppError::UserNotFound(id)) => assert_eq!(id, "nonexistent"),
            _ => panic!("Expected UserNotFound error"),
        }
    }

    #[tokio::test]
    async fn test_find_by_ids_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = UserRepository::new(db);
        let result = repo.find_by_ids(&[]).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_email() {
        let user = create_test_user("user1", "alice");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_email("alice@example.com").await.unwrap();

        assert_eq!(result.unwrap().email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_search_channels_filters_creators() {
        let user = create_test_user("user1", "cooking");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let repo = UserRepository::new(db.clone());
        let result = repo.search_channels("cook", 5, 0).await.unwrap();
        assert_eq!(result.len(), 1);

        drop(repo);
        let sql = transaction_log(db);
        assert!(sql.contains("ILIKE"), "{sql}");
        assert!(sql.contains("%cook%"), "{sql}");
    }

    #[tokio::test]
    async fn test_adjust_subscribers() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let result = UserRepository::adjust_subscribers(&db, "user1", -1).await;

        assert!(result.is_ok());
        let sql = format!("{:?}", db.into_transaction_log());
        assert!(sql.contains("GREATEST(subscribers - 1, 0)"), "{sql}");
    }

    #[tokio::test]
    async fn test_increment_total_views() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let result = UserRepository::increment_total_views(&db, "user1").await;

        assert!(result.is_ok());
    }
}
