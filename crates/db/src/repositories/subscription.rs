//! Subscription repository.

use std::sync::Arc;

use crate::entities::{Subscription, subscription};
use crate::map_insert_err;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use vidtube_common::{AppError, AppResult};

/// Subscription repository for database operations.
#[derive(Clone)]
pub struct SubscriptionRepository {
    db: Arc<DatabaseConnection>,
}

impl SubscriptionRepository {
    /// Create a new subscription repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a subscription by subscriber and channel.
    pub async fn find_by_user_and_channel(
        &self,
        user_id: &str,
        channel_id: &str,
    ) -> AppResult<Option<subscription::Model>> {
        Subscription::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::ChannelId.eq(channel_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user is subscribed to a channel.
    pub async fn is_subscribed(&self, user_id: &str, channel_id: &str) -> AppResult<bool> {
        Ok(self
            .find_by_user_and_channel(user_id, channel_id)
            .await?
            .is_some())
    }

    /// Subscriptions of a user, newest first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<subscription::Model>> {
        Subscription::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .order_by_desc(subscription::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // === Transactional operations ===

    /// Find and lock the subscription row for a (subscriber, channel) pair.
    pub async fn find_for_update<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
        channel_id: &str,
    ) -> AppResult<Option<subscription::Model>> {
        Subscription::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::ChannelId.eq(channel_id))
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a subscription row.
    pub async fn insert<C: ConnectionTrait>(
        conn: &C,
        model: subscription::ActiveModel,
    ) -> AppResult<subscription::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| map_insert_err(e, "Subscription"))
    }

    /// Delete a subscription row.
    pub async fn delete_by_id<C: ConnectionTrait>(conn: &C, id: &str) -> AppResult<()> {
        Subscription::delete_by_id(id)
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
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_subscription(id: &str, user_id: &str, channel_id: &str) -> subscription::Model {
        subscription::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            channel_id: channel_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_is_subscribed_true() {
        let sub = create_test_subscription("s1", "user1", "chan1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[sub]])
                .into_connection(),
        );

        let repo = SubscriptionRepository::new(db);
        assert!(repo.is_subscribed("user1", "chan1").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_subscribed_false() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<subscription::Model>::new()])
                .into_connection(),
        );

        let repo = SubscriptionRepository::new(db);
        assert!(!repo.is_subscribed("user1", "chan1").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_by_user() {
        let s1 = create_test_subscription("s1", "user1", "chan1");
        let s2 = create_test_subscription("s2", "user1", "chan2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[s2, s1]])
                .into_connection(),
        );

        let repo = SubscriptionRepository::new(db);
        let result = repo.find_by_user("user1", 20, 0).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].channel_id, "chan2");
    }
}
