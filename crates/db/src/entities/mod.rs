//! Database entities.

pub mod comment;
pub mod refresh_token;
pub mod subscription;
pub mod user;
pub mod video;
pub mod video_like;
pub mod watch_history;

pub use comment::Entity as Comment;
pub use refresh_token::Entity as RefreshToken;
pub use subscription::Entity as Subscription;
pub use user::Entity as User;
pub use video::Entity as Video;
pub use video_like::Entity as VideoLike;
pub use watch_history::Entity as WatchHistory;
