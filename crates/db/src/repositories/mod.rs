//! Database repositories.
//!
//! Each repository wraps a shared connection for plain reads and writes.
//! Operations that must run inside a caller-owned transaction are exposed
//! as associated functions taking any [`ConnectionTrait`](sea_orm::ConnectionTrait).

mod comment;
mod refresh_token;
mod subscription;
mod user;
mod video;
mod video_like;
mod watch_history;

pub use comment::CommentRepository;
pub use refresh_token::RefreshTokenRepository;
pub use subscription::SubscriptionRepository;
pub use user::UserRepository;
pub use video::{VideoFilter, VideoOrder, VideoRepository, VideoSearch};
pub use video_like::VideoLikeRepository;
pub use watch_history::WatchHistoryRepository;

use sea_orm::{
    ColumnTrait,
    sea_query::{Expr, SimpleExpr},
};

/// Expression moving a counter column by `delta`, never below zero.
pub(crate) fn counter_step<C: ColumnTrait>(column: C, delta: i32) -> SimpleExpr {
    if delta >= 0 {
        Expr::col(column).add(delta)
    } else {
        Expr::cust(format!(
            "GREATEST({} - {}, 0)",
            column.as_str(),
            delta.unsigned_abs()
        ))
    }
}

/// Escape `%` and `_` and wrap the term for a substring `LIKE` match.
pub(crate) fn like_pattern(term: &str) -> String {
    format!(
        "%{}%",
        term.replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_")
    )
}
