//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use sea_orm::DatabaseConnection;
use vidtube_common::Config;
use vidtube_core::{
    ChannelService, CommentService, EngagementService, HistoryService, SearchService,
    UserService, VideoService,
};
use vidtube_db::repositories::{
    CommentRepository, RefreshTokenRepository, SubscriptionRepository, UserRepository,
    VideoRepository, WatchHistoryRepository,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub video_service: VideoService,
    pub comment_service: CommentService,
    pub engagement_service: EngagementService,
    pub channel_service: ChannelService,
    pub history_service: HistoryService,
    pub search_service: SearchService,
}

impl AppState {
    /// Wire every service onto one shared connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, config: &Config) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let video_repo = VideoRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let subscription_repo = SubscriptionRepository::new(Arc::clone(&db));
        let history_repo = WatchHistoryRepository::new(Arc::clone(&db));
        let token_repo = RefreshTokenRepository::new(Arc::clone(&db));

        let engagement_service = EngagementService::new(Arc::clone(&db));
        let user_service =
            UserService::new(user_repo.clone(), token_repo, video_repo.clone(), config);
        let video_service = VideoService::new(
            video_repo.clone(),
            user_repo.clone(),
            comment_repo.clone(),
            engagement_service.clone(),
            config,
        );
        let comment_service = CommentService::new(
            Arc::clone(&db),
            comment_repo,
            video_repo.clone(),
            user_repo.clone(),
            config,
        );
        let channel_service = ChannelService::new(
            user_repo.clone(),
            video_repo.clone(),
            subscription_repo,
            config,
        );
        let history_service = HistoryService::new(
            Arc::clone(&db),
            history_repo,
            video_repo.clone(),
            video_service.clone(),
        );
        let search_service = SearchService::new(
            video_repo,
            user_repo,
            video_service.clone(),
            channel_service.clone(),
        );

        Self {
            user_service,
            video_service,
            comment_service,
            engagement_service,
            channel_service,
            history_service,
            search_service,
        }
    }
}

/// Authentication middleware.
///
/// Resolves a `Bearer` token into the user and stores it in the request
/// extensions. Requests without a valid token continue anonymously.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.user_service.authenticate_by_token(token.trim()).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!(error = %e, "Bearer token rejected"),
        }
    }

    next.run(req).await
}
