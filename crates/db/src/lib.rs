//! Database layer for vidtube.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use std::time::Duration;
use tracing::log::LevelFilter;
use vidtube_common::{AppError, Config};

/// Initialize database connection.
///
/// Makes up to `database.connect_retries` attempts, sleeping
/// `database.retry_delay_secs` between them, before giving up.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    let mut opt = ConnectOptions::new(&config.database.url);

    opt.max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    let attempts = config.database.connect_retries.max(1);
    let delay = Duration::from_secs(config.database.retry_delay_secs);
    let mut attempt = 1;

    loop {
        match Database::connect(opt.clone()).await {
            Ok(db) => {
                tracing::info!(attempt, "Connected to database");
                return Ok(db);
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    attempt,
                    remaining = attempts - attempt,
                    error = %e,
                    "Database connection failed, retrying"
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(AppError::Database(e.to_string())),
        }
    }
}

/// Run pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Map an insert error, turning unique-index violations into [`AppError::Conflict`].
pub(crate) fn map_insert_err(err: DbErr, what: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict(format!("{what} already exists"))
        }
        _ => AppError::Database(err.to_string()),
    }
}
