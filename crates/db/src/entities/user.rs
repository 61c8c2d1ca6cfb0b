//! User entity.
//!
//! A user with `is_creator` set doubles as a channel.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub email: String,

    #[sea_orm(unique)]
    pub username: String,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password: String,

    pub first_name: String,

    pub last_name: String,

    /// Avatar path or URL
    #[sea_orm(nullable)]
    pub profile_picture: Option<String>,

    /// Channel banner path or URL
    #[sea_orm(nullable)]
    pub banner_image: Option<String>,

    /// Channel description
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Can this user upload videos?
    #[sea_orm(default_value = false)]
    pub is_creator: bool,

    #[sea_orm(default_value = false)]
    pub verified: bool,

    /// Display name of the channel (creators only)
    #[sea_orm(nullable)]
    pub channel_name: Option<String>,

    /// Subscriber count (denormalized)
    #[sea_orm(default_value = 0)]
    pub subscribers: i32,

    /// Sum of non-owner views across this user's videos (denormalized)
    #[sea_orm(default_value = 0)]
    pub total_views: i64,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Name shown for this user's channel.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.channel_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::video::Entity")]
    Videos,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::refresh_token::Entity")]
    RefreshTokens,
}

impl Related<super::video::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Videos.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::refresh_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RefreshTokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
