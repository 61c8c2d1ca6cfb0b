//! Channel service.
//!
//! A channel is a user with `is_creator` set.

use serde::Serialize;
use vidtube_common::{absolutize_url, AppError, AppResult, Config};
use vidtube_db::{
    entities::user,
    repositories::{SubscriptionRepository, UserRepository, VideoRepository},
};

use crate::services::video::ChannelSummary;

/// A channel page as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelView {
    pub id: String,
    pub name: String,
    pub username: String,
    pub description: Option<String>,
    pub profile_picture: Option<String>,
    pub banner_image: Option<String>,
    pub verified: bool,
    pub subscribers: i32,
    pub total_views: i64,
    pub video_count: u64,
    /// Present only when the request was about a single channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_subscribed: Option<bool>,
    pub created_at: String,
}

impl ChannelView {
    #[must_use]
    pub fn new(
        user: &user::Model,
        video_count: u64,
        is_subscribed: Option<bool>,
        server_url: &str,
    ) -> Self {
        let media = |path: Option<&str>| path.map(|p| absolutize_url(server_url, p));

        Self {
            id: user.id.clone(),
            name: user.display_name().to_string(),
            username: user.username.clone(),
            description: user.description.clone(),
            profile_picture: media(user.profile_picture.as_deref()),
            banner_image: media(user.banner_image.as_deref()),
            verified: user.verified,
            subscribers: user.subscribers,
            total_views: user.total_views,
            video_count,
            is_subscribed,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// One of the caller's subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    pub id: String,
    pub subscribed_at: String,
    pub channel: ChannelSummary,
}

/// Channel service for business logic.
#[derive(Clone)]
pub struct ChannelService {
    user_repo: UserRepository,
    video_repo: VideoRepository,
    subscription_repo: SubscriptionRepository,
    server_url: String,
}

impl ChannelService {
    /// Create a new channel service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        video_repo: VideoRepository,
        subscription_repo: SubscriptionRepository,
        config: &Config,
    ) -> Self {
        Self {
            user_repo,
            video_repo,
            subscription_repo,
            server_url: config.server.url.clone(),
        }
    }

    /// Creator channels among the given IDs. Unknown IDs and non-creators are
    /// left out.
    pub async fn get_channels(&self, ids: &[String]) -> AppResult<Vec<ChannelView>> {
        if ids.is_empty() {
            return Err(AppError::BadRequest(
                "At least one channel id is required".to_string(),
            ));
        }

        let channels = self.user_repo.find_creators_by_ids(ids).await?;
        self.present(&channels).await
    }

    /// A single channel with the viewer's subscription state.
    pub async fn get_channel(
        &self,
        channel_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<ChannelView> {
        let channel = self.user_repo.get_by_id(channel_id).await?;
        let video_count = self.video_repo.count_public_by_user(&channel.id).await?;

        let is_subscribed = match viewer_id {
            Some(viewer_id) => {
                self.subscription_repo
                    .is_subscribed(viewer_id, &channel.id)
                    .await?
            }
            None => false,
        };

        Ok(ChannelView::new(
            &channel,
            video_count,
            Some(is_subscribed),
            &self.server_url,
        ))
    }

    /// Channels the user subscribes to, newest subscription first.
    pub async fn list_subscriptions(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<SubscriptionView>> {
        let subscriptions = self
            .subscription_repo
            .find_by_user(user_id, limit, offset)
            .await?;
        if subscriptions.is_empty() {
            return Ok(Vec::new());
        }

        let channel_ids: Vec<String> = subscriptions
            .iter()
            .map(|s| s.channel_id.clone())
            .collect();
        let channels = self.user_repo.find_by_ids(&channel_ids).await?;

        Ok(subscriptions
            .into_iter()
            .filter_map(|subscription| {
                let channel = channels.iter().find(|c| c.id == subscription.channel_id)?;
                Some(SubscriptionView {
                    id: subscription.id,
                    subscribed_at: subscription.created_at.to_rfc3339(),
                    channel: ChannelSummary::new(channel, &self.server_url),
                })
            })
            .collect())
    }

    /// Build list views with public video counts, without subscription state.
    pub async fn present(&self, channels: &[user::Model]) -> AppResult<Vec<ChannelView>> {
        if channels.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = channels.iter().map(|c| c.id.clone()).collect();
        let counts = self.video_repo.count_public_by_users(&ids).await?;

        Ok(channels
            .iter()
            .map(|channel| {
                let count = counts.get(&channel.id).copied().unwrap_or(0);
                ChannelView::new(channel, count, None, &self.server_url)
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::video::tests::{
        create_test_user, empty_db, num_items_row, test_config, user_count_row,
    };
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;
    use vidtube_db::entities::subscription;

    fn build_service(
        user_db: Arc<DatabaseConnection>,
        video_db: Arc<DatabaseConnection>,
        subscription_db: Arc<DatabaseConnection>,
    ) -> ChannelService {
        ChannelService::new(
            UserRepository::new(user_db),
            VideoRepository::new(video_db),
            SubscriptionRepository::new(subscription_db),
            &test_config(),
        )
    }

    fn create_test_subscription(id: &str, channel_id: &str) -> subscription::Model {
        subscription::Model {
            id: id.to_string(),
            user_id: "viewer".to_string(),
            channel_id: channel_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_channels_empty_ids() {
        let service = build_service(empty_db(), empty_db(), empty_db());

        let result = service.get_channels(&[]).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_get_channels_with_video_counts() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_user("alpha", true),
                    create_test_user("beta", true),
                ]])
                .into_connection(),
        );
        let video_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user_count_row("alpha", 4)]])
                .into_connection(),
        );

        let service = build_service(user_db, video_db, empty_db());
        let channels = service
            .get_channels(&["alpha".to_string(), "beta".to_string(), "ghost".to_string()])
            .await
            .unwrap();

        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].video_count, 4);
        assert_eq!(channels[1].video_count, 0);
        assert_eq!(channels[0].is_subscribed, None);
    }

    #[tokio::test]
    async fn test_get_channel_for_subscribed_viewer() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("alpha", true)]])
                .into_connection(),
        );
        let video_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[num_items_row(2)]])
                .into_connection(),
        );
        let subscription_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_subscription("s1", "alpha")]])
                .into_connection(),
        );

        let service = build_service(user_db, video_db, subscription_db);
        let channel = service.get_channel("alpha", Some("viewer")).await.unwrap();

        assert_eq!(channel.is_subscribed, Some(true));
        assert_eq!(channel.video_count, 2);
        assert_eq!(channel.name, "alpha channel");
    }

    #[tokio::test]
    async fn test_get_channel_anonymous_is_not_subscribed() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("alpha", true)]])
                .into_connection(),
        );
        let video_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[num_items_row(0)]])
                .into_connection(),
        );

        let service = build_service(user_db, video_db, empty_db());
        let channel = service.get_channel("alpha", None).await.unwrap();

        assert_eq!(channel.is_subscribed, Some(false));
    }

    #[tokio::test]
    async fn test_get_channel_not_found() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let service = build_service(user_db, empty_db(), empty_db());
        let result = service.get_channel("ghost", None).await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_subscriptions_keeps_order() {
        let subscription_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_subscription("s2", "beta"),
                    create_test_subscription("s1", "alpha"),
                ]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_user("alpha", true),
                    create_test_user("beta", true),
                ]])
                .into_connection(),
        );

        let service = build_service(user_db, empty_db(), subscription_db);
        let subscriptions = service.list_subscriptions("viewer", 20, 0).await.unwrap();

        assert_eq!(subscriptions.len(), 2);
        assert_eq!(subscriptions[0].channel.id, "beta");
        assert_eq!(subscriptions[1].channel.id, "alpha");
    }
}
