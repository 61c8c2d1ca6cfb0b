//! Create user table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(User::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(User::Email).string_len(256).not_null())
                    .col(ColumnDef::new(User::Username).string_len(64).not_null())
                    .col(ColumnDef::new(User::Password).string_len(256).not_null())
                    .col(ColumnDef::new(User::FirstName).string_len(64).not_null())
                    .col(ColumnDef::new(User::LastName).string_len(64).not_null())
                    .col(ColumnDef::new(User::ProfilePicture).string_len(1024))
                    .col(ColumnDef::new(User::BannerImage).string_len(1024))
                    .col(ColumnDef::new(User::Description).text())
                    .col(ColumnDef::new(User::IsCreator).boolean().not_null().default(false))
                    .col(ColumnDef::new(User::Verified).boolean().not_null().default(false))
                    .col(ColumnDef::new(User::ChannelName).string_len(128))
                    .col(ColumnDef::new(User::Subscribers).integer().not_null().default(0))
                    .col(ColumnDef::new(User::TotalViews).big_integer().not_null().default(0))
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(User::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Unique index: email
        manager
            .create_index(
                Index::create()
                    .name("idx_user_email")
                    .table(User::Table)
                    .col(User::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: username
        manager
            .create_index(
                Index::create()
                    .name("idx_user_username")
                    .table(User::Table)
                    .col(User::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (is_creator, subscribers) for channel search
        manager
            .create_index(
                Index::create()
                    .name("idx_user_is_creator_subscribers")
                    .table(User::Table)
                    .col(User::IsCreator)
                    .col(User::Subscribers)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum User {
    Table,
    Id,
    Email,
    Username,
    Password,
    FirstName,
    LastName,
    ProfilePicture,
    BannerImage,
    Description,
    IsCreator,
    Verified,
    ChannelName,
    Subscribers,
    TotalViews,
    CreatedAt,
    UpdatedAt,
}
