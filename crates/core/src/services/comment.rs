//! Comment service.
//!
//! Comments nest one level deep: a top-level comment may have replies, a
//! reply may not.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{DatabaseConnection, IntoActiveModel, Set, TransactionTrait};
use serde::Serialize;
use vidtube_common::{absolutize_url, AppError, AppResult, Config, IdGenerator};
use vidtube_db::{
    entities::{comment, user},
    repositories::{CommentRepository, UserRepository, VideoRepository},
};

/// Maximum comment length, in characters.
pub const MAX_COMMENT_LENGTH: usize = 1000;

/// Number of replies embedded under each top-level comment in a listing.
pub const EMBEDDED_REPLIES: u64 = 3;

/// Comment author as shown next to a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: String,
    pub username: String,
    pub profile_picture: Option<String>,
    pub verified: bool,
}

impl AuthorSummary {
    fn new(user: &user::Model, server_url: &str) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            profile_picture: user
                .profile_picture
                .as_deref()
                .map(|p| absolutize_url(server_url, p)),
            verified: user.verified,
        }
    }
}

/// A comment as returned by the API.
///
/// `replies` and `replyCount` are only present on top-level comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub video_id: String,
    pub parent_id: Option<String>,
    pub text: String,
    pub likes: i32,
    pub dislikes: i32,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub author: AuthorSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<CommentView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<u64>,
}

impl CommentView {
    fn new(comment: &comment::Model, author: &user::Model, server_url: &str) -> Self {
        Self {
            id: comment.id.clone(),
            video_id: comment.video_id.clone(),
            parent_id: comment.parent_id.clone(),
            text: comment.text.clone(),
            likes: comment.likes,
            dislikes: comment.dislikes,
            created_at: comment.created_at.to_rfc3339(),
            updated_at: comment.updated_at.map(|t| t.to_rfc3339()),
            author: AuthorSummary::new(author, server_url),
            replies: None,
            reply_count: None,
        }
    }

    fn with_replies(mut self, replies: Vec<Self>, reply_count: u64) -> Self {
        self.replies = Some(replies);
        self.reply_count = Some(reply_count);
        self
    }
}

/// Trim comment text and check its length in characters.
fn validate_text(text: &str) -> AppResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Comment text is required".to_string()));
    }
    if text.chars().count() > MAX_COMMENT_LENGTH {
        return Err(AppError::Validation(format!(
            "Comment text must be at most {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(text.to_string())
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    db: Arc<DatabaseConnection>,
    comment_repo: CommentRepository,
    video_repo: VideoRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
    server_url: String,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        comment_repo: CommentRepository,
        video_repo: VideoRepository,
        user_repo: UserRepository,
        config: &Config,
    ) -> Self {
        Self {
            db,
            comment_repo,
            video_repo,
            user_repo,
            id_gen: IdGenerator::new(),
            server_url: config.server.url.clone(),
        }
    }

    /// Post a comment, or a reply when `parent_id` is given.
    pub async fn add(
        &self,
        video_id: &str,
        author: &user::Model,
        text: &str,
        parent_id: Option<&str>,
    ) -> AppResult<CommentView> {
        let text = validate_text(text)?;
        self.video_repo.get_by_id(video_id).await?;

        if let Some(parent_id) = parent_id {
            let parent = self.comment_repo.get_by_id(parent_id).await?;
            if parent.video_id != video_id {
                return Err(AppError::CommentNotFound(parent_id.to_string()));
            }
            if parent.parent_id.is_some() {
                return Err(AppError::BadRequest(
                    "Cannot reply to a reply".to_string(),
                ));
            }
        }

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            video_id: Set(video_id.to_string()),
            user_id: Set(author.id.clone()),
            parent_id: Set(parent_id.map(ToString::to_string)),
            text: Set(text),
            likes: Set(0),
            dislikes: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let comment = self.comment_repo.create(model).await?;
        let view = CommentView::new(&comment, author, &self.server_url);

        Ok(if comment.parent_id.is_none() {
            view.with_replies(Vec::new(), 0)
        } else {
            view
        })
    }

    /// Top-level comments of a video, newest first, each with its oldest
    /// replies embedded.
    pub async fn list_top_level(
        &self,
        video_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<CommentView>> {
        self.video_repo.get_by_id(video_id).await?;

        let comments = self
            .comment_repo
            .find_top_level(video_id, limit, offset)
            .await?;
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = comments.iter().map(|c| c.id.clone()).collect();
        let reply_counts = self.comment_repo.count_replies(&ids).await?;

        let with_replies: Vec<String> = ids
            .into_iter()
            .filter(|id| reply_counts.contains_key(id))
            .collect();
        let replies = self
            .comment_repo
            .find_first_replies(&with_replies, EMBEDDED_REPLIES)
            .await?;

        let authors = self
            .load_authors(comments.iter().chain(replies.values().flatten()))
            .await?;

        Ok(comments
            .iter()
            .filter_map(|comment| {
                let view = self.view(comment, &authors)?;
                let embedded = replies
                    .get(&comment.id)
                    .map(|page| page.iter().filter_map(|r| self.view(r, &authors)).collect())
                    .unwrap_or_default();
                let count = reply_counts.get(&comment.id).copied().unwrap_or(0);
                Some(view.with_replies(embedded, count))
            })
            .collect())
    }

    /// Replies to a comment, oldest first.
    pub async fn list_replies(
        &self,
        comment_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<CommentView>> {
        let parent = self.comment_repo.get_by_id(comment_id).await?;
        let replies = self
            .comment_repo
            .find_replies(&parent.id, limit, offset)
            .await?;

        let authors = self.load_authors(replies.iter()).await?;

        Ok(replies
            .iter()
            .filter_map(|r| self.view(r, &authors))
            .collect())
    }

    /// Edit a comment's text. Only the author may edit.
    pub async fn update(
        &self,
        comment_id: &str,
        editor: &user::Model,
        text: &str,
    ) -> AppResult<CommentView> {
        let text = validate_text(text)?;
        let comment = self.comment_repo.get_by_id(comment_id).await?;

        if comment.user_id != editor.id {
            return Err(AppError::Forbidden(
                "You can only edit your own comments".to_string(),
            ));
        }

        let mut active = comment.into_active_model();
        active.text = Set(text);
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.comment_repo.update(active).await?;
        Ok(CommentView::new(&updated, editor, &self.server_url))
    }

    /// Delete a comment and all of its replies. Only the author may delete.
    ///
    /// Returns the number of comments removed.
    pub async fn delete(&self, comment_id: &str, requester: &user::Model) -> AppResult<u64> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;

        if comment.user_id != requester.id {
            return Err(AppError::Forbidden(
                "You can only delete your own comments".to_string(),
            ));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let removed = CommentRepository::delete_with_replies(&txn, &comment.id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(comment_id = %comment.id, removed, "Comment deleted");
        Ok(removed)
    }

    async fn load_authors<'a>(
        &self,
        comments: impl Iterator<Item = &'a comment::Model>,
    ) -> AppResult<HashMap<String, user::Model>> {
        let mut ids: Vec<String> = comments.map(|c| c.user_id.clone()).collect();
        ids.sort();
        ids.dedup();

        Ok(self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect())
    }

    fn view(
        &self,
        comment: &comment::Model,
        authors: &HashMap<String, user::Model>,
    ) -> Option<CommentView> {
        authors
            .get(&comment.user_id)
            .map(|author| CommentView::new(comment, author, &self.server_url))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vidtube_db::test_utils::transaction_log;
    use crate::services::video::tests::{
        count_row, create_test_user, create_test_video, empty_db, test_config,
    };
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use vidtube_db::entities::video;

    fn create_test_comment(id: &str, parent_id: Option<&str>) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            video_id: "video1".to_string(),
            user_id: "author".to_string(),
            parent_id: parent_id.map(ToString::to_string),
            text: format!("comment {id}"),
            likes: 0,
            dislikes: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn build_service(
        db: Arc<DatabaseConnection>,
        comment_db: Arc<DatabaseConnection>,
        video_db: Arc<DatabaseConnection>,
        user_db: Arc<DatabaseConnection>,
    ) -> CommentService {
        CommentService::new(
            db,
            CommentRepository::new(comment_db),
            VideoRepository::new(video_db),
            UserRepository::new(user_db),
            &test_config(),
        )
    }

    fn video_db() -> Arc<DatabaseConnection> {
        Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_video("video1", "owner")]])
                .into_connection(),
        )
    }

    #[test]
    fn test_validate_text_length_boundary() {
        assert!(validate_text(&"a".repeat(MAX_COMMENT_LENGTH)).is_ok());
        assert!(matches!(
            validate_text(&"a".repeat(MAX_COMMENT_LENGTH + 1)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_text_counts_characters_not_bytes() {
        assert!(validate_text(&"é".repeat(MAX_COMMENT_LENGTH)).is_ok());
    }

    #[test]
    fn test_validate_text_trims_and_rejects_blank() {
        assert_eq!(validate_text("  hello ").unwrap(), "hello");
        assert!(matches!(validate_text(" \n\t "), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_add_top_level_comment() {
        let comment_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", None)]])
                .into_connection(),
        );

        let service = build_service(empty_db(), comment_db, video_db(), empty_db());
        let author = create_test_user("author", false);

        let view = service.add("video1", &author, "Nice!", None).await.unwrap();

        assert_eq!(view.id, "c1");
        assert_eq!(view.reply_count, Some(0));
        assert_eq!(view.replies, Some(Vec::new()));
        assert_eq!(
            view.author.profile_picture.as_deref(),
            Some("http://localhost:5001/uploads/avatars/default-avatar.png")
        );
    }

    #[tokio::test]
    async fn test_add_to_missing_video() {
        let missing_video = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<video::Model>::new()])
                .into_connection(),
        );

        let service = build_service(empty_db(), empty_db(), missing_video, empty_db());
        let author = create_test_user("author", false);

        let result = service.add("ghost", &author, "Hello", None).await;

        assert!(matches!(result, Err(AppError::VideoNotFound(_))));
    }

    #[tokio::test]
    async fn test_add_reply_to_comment_on_other_video() {
        let mut parent = create_test_comment("c1", None);
        parent.video_id = "video2".to_string();
        let comment_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[parent]])
                .into_connection(),
        );

        let service = build_service(empty_db(), comment_db, video_db(), empty_db());
        let author = create_test_user("author", false);

        let result = service.add("video1", &author, "Reply", Some("c1")).await;

        match result {
            Err(AppError::CommentNotFound(id)) => assert_eq!(id, "c1"),
            _ => panic!("Expected CommentNotFound error"),
        }
    }

    #[tokio::test]
    async fn test_add_reply_to_reply_is_rejected() {
        let comment_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("r1", Some("c1"))]])
                .into_connection(),
        );

        let service = build_service(empty_db(), comment_db, video_db(), empty_db());
        let author = create_test_user("author", false);

        let result = service.add("video1", &author, "Deeper", Some("r1")).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_add_rejects_overlong_text_before_queries() {
        let service = build_service(empty_db(), empty_db(), empty_db(), empty_db());
        let author = create_test_user("author", false);

        let result = service
            .add("video1", &author, &"x".repeat(MAX_COMMENT_LENGTH + 1), None)
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_top_level_embeds_replies() {
        let comment_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_comment("c2", None),
                    create_test_comment("c1", None),
                ]])
                .append_query_results([[count_row("c1", 5), count_row("c2", 1)]])
                .append_query_results([[
                    create_test_comment("r1", Some("c1")),
                    create_test_comment("r9", Some("c2")),
                    create_test_comment("r2", Some("c1")),
                    create_test_comment("r3", Some("c1")),
                ]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("author", false)]])
                .into_connection(),
        );

        let service = build_service(empty_db(), comment_db.clone(), video_db(), user_db);
        let views = service.list_top_level("video1", 20, 0).await.unwrap();

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, "c2");
        assert_eq!(views[0].reply_count, Some(1));
        assert_eq!(views[0].replies.as_ref().map(Vec::len), Some(1));
        assert_eq!(views[1].reply_count, Some(5));
        assert_eq!(views[1].replies.as_ref().map(Vec::len), Some(3));

        drop(service);
        let log = transaction_log(comment_db);
        assert_eq!(log.matches("PARTITION BY").count(), 1, "{log}");
        assert!(log.contains("ORDER BY"), "{log}");
    }

    #[tokio::test]
    async fn test_list_replies_unknown_parent() {
        let comment_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<comment::Model>::new()])
                .into_connection(),
        );

        let service = build_service(empty_db(), comment_db, empty_db(), empty_db());
        let result = service.list_replies("ghost", 20, 0).await;

        assert!(matches!(result, Err(AppError::CommentNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_by_other_user_forbidden() {
        let comment_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", None)]])
                .into_connection(),
        );

        let service = build_service(empty_db(), comment_db, empty_db(), empty_db());
        let other = create_test_user("intruder", false);

        let result = service.update("c1", &other, "edited").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_update_own_comment() {
        let mut edited = create_test_comment("c1", None);
        edited.text = "edited".to_string();
        edited.updated_at = Some(Utc::now().into());

        let comment_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", None)]])
                .append_query_results([[edited]])
                .into_connection(),
        );

        let service = build_service(empty_db(), comment_db, empty_db(), empty_db());
        let author = create_test_user("author", false);

        let view = service.update("c1", &author, " edited ").await.unwrap();

        assert_eq!(view.text, "edited");
        assert!(view.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_comment_and_replies() {
        let comment_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", None)]])
                .into_connection(),
        );
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 3,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let service = build_service(db, comment_db, empty_db(), empty_db());
        let author = create_test_user("author", false);

        let removed = service.delete("c1", &author).await.unwrap();

        assert_eq!(removed, 4);
    }

    #[tokio::test]
    async fn test_delete_by_other_user_forbidden() {
        let comment_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", None)]])
                .into_connection(),
        );

        let service = build_service(empty_db(), comment_db, empty_db(), empty_db());
        let other = create_test_user("intruder", false);

        let result = service.delete("c1", &other).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
