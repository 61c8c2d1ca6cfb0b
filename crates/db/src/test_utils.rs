//! Test utilities for database operations.
//!
//! Provides helpers for setting up, seeding and tearing down test databases.

use crate::entities::{user, video};
use crate::migrations::Migrator;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Set,
    Statement,
};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tracing::info;

/// Tables truncated by [`TestDatabase::cleanup`], children first.
const TABLES: &[&str] = &[
    "watch_history",
    "video_like",
    "comment",
    "subscription",
    "refresh_token",
    "video",
    "user",
];

/// Test database configuration.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database username.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: std::env::var("TEST_DB_USER").unwrap_or_else(|_| "vidtube_test".to_string()),
            password: std::env::var("TEST_DB_PASSWORD")
                .unwrap_or_else(|_| "vidtube_test".to_string()),
            database: std::env::var("TEST_DB_NAME").unwrap_or_else(|_| "vidtube_test".to_string()),
        }
    }
}

impl TestDbConfig {
    /// Get the database URL.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    /// Get URL for connecting to postgres database (for creating test DB).
    #[must_use]
    pub fn postgres_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/postgres",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Drain the statements recorded by a mock connection, formatted for `contains` checks.
///
/// Every repository or service holding a clone of `db` must be dropped first.
#[cfg(any(test, feature = "test-utils"))]
#[allow(clippy::expect_used)]
#[must_use]
pub fn transaction_log(db: Arc<DatabaseConnection>) -> String {
    let conn = Arc::try_unwrap(db)
        .map_err(|_| ())
        .expect("mock connection is still shared");
    format!("{:?}", conn.into_transaction_log())
}

/// A migrated test database.
pub struct TestDatabase {
    /// Database connection.
    pub conn: Arc<DatabaseConnection>,
    /// Database configuration.
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Connect to the configured test database and apply all migrations.
    pub async fn new() -> Result<Self, DbErr> {
        Self::with_config(TestDbConfig::default()).await
    }

    /// Connect with custom configuration and apply all migrations.
    pub async fn with_config(config: TestDbConfig) -> Result<Self, DbErr> {
        let conn = Database::connect(&config.database_url()).await?;
        Migrator::up(&conn, None).await?;

        info!(database = %config.database, "Connected to migrated test database");

        Ok(Self {
            conn: Arc::new(conn),
            config,
        })
    }

    /// Create a fresh, uniquely named database (for parallel tests).
    pub async fn create_unique() -> Result<Self, DbErr> {
        let mut config = TestDbConfig::default();
        let unique_suffix = uuid::Uuid::new_v4().simple().to_string();
        config.database = format!("vidtube_test_{}", &unique_suffix[..8]);

        let postgres_conn = Database::connect(&config.postgres_url()).await?;
        postgres_conn
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("CREATE DATABASE \"{}\"", config.database),
            ))
            .await?;
        postgres_conn.close().await?;

        info!(database = %config.database, "Created unique test database");

        Self::with_config(config).await
    }

    /// Get the database connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Get a shared handle to the connection, for building repositories and services.
    #[must_use]
    pub fn shared(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }

    /// Remove all rows from every application table.
    pub async fn cleanup(&self) -> Result<(), DbErr> {
        for table in TABLES {
            self.conn
                .execute(Statement::from_string(
                    DatabaseBackend::Postgres,
                    format!("TRUNCATE TABLE \"{table}\" CASCADE"),
                ))
                .await?;
        }

        info!("Cleaned up test database");
        Ok(())
    }

    /// Drop the database. Only meaningful for [`TestDatabase::create_unique`].
    ///
    /// Repositories built from [`TestDatabase::shared`] must be dropped first.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        if let Ok(conn) = Arc::try_unwrap(self.conn) {
            conn.close().await?;
        }

        let postgres_conn = Database::connect(&self.config.postgres_url()).await?;

        let terminate = format!(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}'",
            self.config.database
        );
        postgres_conn
            .execute(Statement::from_string(DatabaseBackend::Postgres, terminate))
            .await
            .ok();

        let drop_db = format!("DROP DATABASE IF EXISTS \"{}\"", self.config.database);
        postgres_conn
            .execute(Statement::from_string(DatabaseBackend::Postgres, drop_db))
            .await?;

        postgres_conn.close().await?;

        info!(database = %self.config.database, "Dropped test database");
        Ok(())
    }

    /// Insert a user. Creators get a channel name.
    pub async fn insert_user(
        &self,
        id: &str,
        username: &str,
        is_creator: bool,
    ) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            id: Set(id.to_string()),
            email: Set(format!("{username}@example.com")),
            username: Set(username.to_string()),
            password: Set("not-a-real-hash".to_string()),
            first_name: Set("Test".to_string()),
            last_name: Set(username.to_string()),
            profile_picture: Set(None),
            banner_image: Set(None),
            description: Set(None),
            is_creator: Set(is_creator),
            verified: Set(false),
            channel_name: Set(is_creator.then(|| format!("{username} channel"))),
            subscribers: Set(0),
            total_views: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Insert a public video owned by `user_id`.
    pub async fn insert_video(&self, id: &str, user_id: &str) -> Result<video::Model, DbErr> {
        video::ActiveModel {
            id: Set(id.to_string()),
            user_id: Set(user_id.to_string()),
            title: Set(format!("Video {id}")),
            description: Set("Seeded for tests".to_string()),
            thumbnail_url: Set(None),
            video_url: Set(format!("/uploads/videos/{id}.mp4")),
            duration: Set(None),
            category: Set("Education".to_string()),
            tags: Set(serde_json::json!([])),
            views: Set(0),
            likes: Set(0),
            dislikes: Set(0),
            is_public: Set(true),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        }
        .insert(self.conn.as_ref())
        .await
    }
}
