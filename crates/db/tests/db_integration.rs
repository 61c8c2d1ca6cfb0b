//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `vidtube_test`)
//!   `TEST_DB_PASSWORD` (default: `vidtube_test`)
//!   `TEST_DB_NAME` (default: `vidtube_test`)

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use sea_orm::{Set, TransactionTrait};
use vidtube_common::AppError;
use vidtube_db::entities::video_like;
use vidtube_db::repositories::{
    CommentRepository, UserRepository, VideoLikeRepository, VideoRepository,
};
use vidtube_db::test_utils::{TestDatabase, TestDbConfig};

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection_runs_migrations() {
    let result = TestDatabase::with_config(TestDbConfig::default()).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_reaction_counters_never_go_negative() {
    let db = TestDatabase::create_unique().await.unwrap();
    db.insert_user("owner", "owner", true).await.unwrap();
    db.insert_video("v1", "owner").await.unwrap();

    VideoRepository::adjust_reactions(db.connection(), "v1", -1, -1)
        .await
        .unwrap();

    let video = VideoRepository::fetch(db.connection(), "v1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(video.likes, 0);
    assert_eq!(video.dislikes, 0);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_reaction_is_conflict() {
    let db = TestDatabase::create_unique().await.unwrap();
    db.insert_user("owner", "owner", true).await.unwrap();
    db.insert_user("viewer", "viewer", false).await.unwrap();
    db.insert_video("v1", "owner").await.unwrap();

    let like = |id: &str| video_like::ActiveModel {
        id: Set(id.to_string()),
        user_id: Set("viewer".to_string()),
        video_id: Set("v1".to_string()),
        is_like: Set(true),
        created_at: Set(Utc::now().into()),
    };

    VideoLikeRepository::insert(db.connection(), like("l1"))
        .await
        .unwrap();
    let second = VideoLikeRepository::insert(db.connection(), like("l2")).await;

    assert!(matches!(second, Err(AppError::Conflict(_))));

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_counters_roll_back_with_transaction() {
    let db = TestDatabase::create_unique().await.unwrap();
    db.insert_user("owner", "owner", true).await.unwrap();
    db.insert_video("v1", "owner").await.unwrap();

    let txn = db.connection().begin().await.unwrap();
    VideoRepository::increment_views(&txn, "v1").await.unwrap();
    UserRepository::increment_total_views(&txn, "owner")
        .await
        .unwrap();
    txn.rollback().await.unwrap();

    let video = VideoRepository::fetch(db.connection(), "v1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(video.views, 0);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_delete_comment_removes_replies() {
    use vidtube_db::entities::comment;

    let db = TestDatabase::create_unique().await.unwrap();
    db.insert_user("owner", "owner", true).await.unwrap();
    db.insert_video("v1", "owner").await.unwrap();

    let repo = CommentRepository::new(db.shared());
    let make = |id: &str, parent: Option<&str>| comment::ActiveModel {
        id: Set(id.to_string()),
        video_id: Set("v1".to_string()),
        user_id: Set("owner".to_string()),
        parent_id: Set(parent.map(ToString::to_string)),
        text: Set(format!("comment {id}")),
        likes: Set(0),
        dislikes: Set(0),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    };

    repo.create(make("c1", None)).await.unwrap();
    for id in ["r1", "r2", "r3"] {
        repo.create(make(id, Some("c1"))).await.unwrap();
    }

    let removed = CommentRepository::delete_with_replies(db.connection(), "c1")
        .await
        .unwrap();
    assert_eq!(removed, 4);

    drop(repo);
    db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}

#[test]
fn test_database_url_format() {
    let config = TestDbConfig {
        host: "testhost".to_string(),
        port: 5432,
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        database: "testdb".to_string(),
    };

    let url = config.database_url();
    assert!(url.starts_with("postgres://"));
    assert!(url.contains("testhost"));
    assert!(url.contains("5432"));
    assert!(url.contains("testuser"));
    assert!(url.contains("testdb"));
}
