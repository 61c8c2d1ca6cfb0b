//! Engagement service: reactions, subscriptions and view counting.
//!
//! Every operation here mutates a join row and a denormalized counter, so
//! each runs in its own transaction with the join row locked `FOR UPDATE`.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{DatabaseConnection, DatabaseTransaction, Set, TransactionTrait};
use serde::Serialize;
use vidtube_common::{AppError, AppResult, IdGenerator};
use vidtube_db::{
    entities::{subscription, video, video_like},
    repositories::{SubscriptionRepository, UserRepository, VideoLikeRepository, VideoRepository},
};

/// Video reaction counters after a reaction change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionCounts {
    pub likes: i32,
    pub dislikes: i32,
}

/// Subscription state after a subscribe/unsubscribe request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    pub is_subscribed: bool,
    pub subscribers: i32,
    pub message: &'static str,
}

/// Counter deltas `(likes, dislikes)` for a reaction request.
///
/// `previous` is the stored reaction, if any. Repeating the stored reaction
/// removes it; the opposite reaction flips it.
#[must_use]
pub const fn reaction_deltas(previous: Option<bool>, is_like: bool) -> (i32, i32) {
    match (previous, is_like) {
        (None, true) => (1, 0),
        (None, false) => (0, 1),
        (Some(true), true) => (-1, 0),
        (Some(false), false) => (0, -1),
        (Some(false), true) => (1, -1),
        (Some(true), false) => (-1, 1),
    }
}

/// Engagement service for business logic.
#[derive(Clone)]
pub struct EngagementService {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl EngagementService {
    /// Create a new engagement service.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Like or dislike a video with toggle semantics.
    ///
    /// A concurrent first reaction by the same user loses the unique-index
    /// race; the request is then retried once, finding the winner's row.
    pub async fn set_reaction(
        &self,
        user_id: &str,
        video_id: &str,
        is_like: bool,
    ) -> AppResult<ReactionCounts> {
        match self.apply_reaction(user_id, video_id, is_like).await {
            Err(AppError::Conflict(_)) => {
                tracing::debug!(user_id, video_id, "Concurrent reaction insert, retrying");
                self.apply_reaction(user_id, video_id, is_like).await
            }
            result => result,
        }
    }

    async fn apply_reaction(
        &self,
        user_id: &str,
        video_id: &str,
        is_like: bool,
    ) -> AppResult<ReactionCounts> {
        let txn = self.begin().await?;

        if VideoRepository::fetch(&txn, video_id).await?.is_none() {
            return Err(AppError::VideoNotFound(video_id.to_string()));
        }

        let existing = VideoLikeRepository::find_for_update(&txn, user_id, video_id).await?;
        let (likes_delta, dislikes_delta) =
            reaction_deltas(existing.as_ref().map(|l| l.is_like), is_like);

        match existing {
            None => {
                let model = video_like::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    user_id: Set(user_id.to_string()),
                    video_id: Set(video_id.to_string()),
                    is_like: Set(is_like),
                    created_at: Set(Utc::now().into()),
                };
                VideoLikeRepository::insert(&txn, model).await?;
            }
            Some(row) if row.is_like == is_like => {
                VideoLikeRepository::delete_by_id(&txn, &row.id).await?;
            }
            Some(row) => {
                VideoLikeRepository::set_is_like(&txn, &row.id, is_like).await?;
            }
        }

        VideoRepository::adjust_reactions(&txn, video_id, likes_delta, dislikes_delta).await?;

        let video = VideoRepository::fetch(&txn, video_id)
            .await?
            .ok_or_else(|| AppError::VideoNotFound(video_id.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ReactionCounts {
            likes: video.likes,
            dislikes: video.dislikes,
        })
    }

    /// Subscribe to or unsubscribe from a channel. Idempotent.
    pub async fn set_subscription(
        &self,
        subscriber_id: &str,
        channel_id: &str,
        subscribe: bool,
    ) -> AppResult<SubscriptionState> {
        if subscriber_id == channel_id {
            return Err(AppError::BadRequest(
                "Cannot subscribe to your own channel".to_string(),
            ));
        }

        match self
            .apply_subscription(subscriber_id, channel_id, subscribe)
            .await
        {
            Err(AppError::Conflict(_)) => {
                tracing::debug!(subscriber_id, channel_id, "Concurrent subscribe, retrying");
                self.apply_subscription(subscriber_id, channel_id, subscribe)
                    .await
            }
            result => result,
        }
    }

    async fn apply_subscription(
        &self,
        subscriber_id: &str,
        channel_id: &str,
        subscribe: bool,
    ) -> AppResult<SubscriptionState> {
        let txn = self.begin().await?;

        if UserRepository::fetch(&txn, channel_id).await?.is_none() {
            return Err(AppError::UserNotFound(channel_id.to_string()));
        }

        let existing = SubscriptionRepository::find_for_update(&txn, subscriber_id, channel_id).await?;

        let message = match (subscribe, existing) {
            (true, None) => {
                let model = subscription::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    user_id: Set(subscriber_id.to_string()),
                    channel_id: Set(channel_id.to_string()),
                    created_at: Set(Utc::now().into()),
                };
                SubscriptionRepository::insert(&txn, model).await?;
                UserRepository::adjust_subscribers(&txn, channel_id, 1).await?;
                "Subscribed"
            }
            (true, Some(_)) => "Already subscribed",
            (false, Some(row)) => {
                SubscriptionRepository::delete_by_id(&txn, &row.id).await?;
                UserRepository::adjust_subscribers(&txn, channel_id, -1).await?;
                "Unsubscribed"
            }
            (false, None) => "Not subscribed",
        };

        let is_subscribed = SubscriptionRepository::find_for_update(&txn, subscriber_id, channel_id)
            .await?
            .is_some();
        let channel = UserRepository::fetch(&txn, channel_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(channel_id.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(SubscriptionState {
            is_subscribed,
            subscribers: channel.subscribers,
            message,
        })
    }

    /// Count a view of a video and return the video with updated counters.
    ///
    /// Views by the owner are not counted. Anonymous views are.
    pub async fn record_view(
        &self,
        video_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<video::Model> {
        let txn = self.begin().await?;

        let video = VideoRepository::fetch(&txn, video_id)
            .await?
            .ok_or_else(|| AppError::VideoNotFound(video_id.to_string()))?;

        if viewer_id == Some(video.user_id.as_str()) {
            return Ok(video);
        }

        VideoRepository::increment_views(&txn, video_id).await?;
        UserRepository::increment_total_views(&txn, &video.user_id).await?;

        let updated = VideoRepository::fetch(&txn, video_id)
            .await?
            .ok_or_else(|| AppError::VideoNotFound(video_id.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(updated)
    }
}
