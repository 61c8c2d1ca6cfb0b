//! Refresh token repository.

use std::sync::Arc;

use crate::entities::{RefreshToken, refresh_token};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, prelude::DateTimeWithTimeZone,
};
use vidtube_common::{AppError, AppResult};

/// Refresh token repository for database operations.
#[derive(Clone)]
pub struct RefreshTokenRepository {
    db: Arc<DatabaseConnection>,
}

impl RefreshTokenRepository {
    /// Create a new refresh token repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a token that has not expired yet.
    pub async fn find_valid(&self, token: &str) -> AppResult<Option<refresh_token::Model>> {
        let now: DateTimeWithTimeZone = Utc::now().into();

        RefreshToken::find()
            .filter(refresh_token::Column::Token.eq(token))
            .filter(refresh_token::Column::ExpiresAt.gt(now))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::transaction_log;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_valid_filters_expired() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<refresh_token::Model>::new()])
                .into_connection(),
        );

        let repo = RefreshTokenRepository::new(db.clone());
        let result = repo.find_valid("stale").await.unwrap();
        assert!(result.is_none());

        drop(repo);
        let sql = transaction_log(db);
        assert!(sql.contains("expires_at"), "{sql}");
    }
}
