//! Business logic services.

#![allow(missing_docs)]

pub mod channel;
pub mod comment;
pub mod engagement;
pub mod history;
pub mod search;
pub mod user;
pub mod video;

pub use channel::{ChannelService, ChannelView, SubscriptionView};
pub use comment::{AuthorSummary, CommentService, CommentView, MAX_COMMENT_LENGTH};
pub use engagement::{reaction_deltas, EngagementService, ReactionCounts, SubscriptionState};
pub use history::{HistoryService, WatchHistoryItem, WatchRecord};
pub use search::{
    SearchKind, SearchMeta, SearchQuery, SearchResults, SearchService, SearchSort, UploadWindow,
};
pub use user::{AccountView, ProfileView, RegisterInput, UpdateProfileInput, UserService};
pub use video::{ChannelSummary, CreateVideoInput, VideoService, VideoSort, VideoView};
