//! Create video table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Video::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Video::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Video::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Video::Title).string_len(128).not_null())
                    .col(ColumnDef::new(Video::Description).text().not_null())
                    .col(ColumnDef::new(Video::ThumbnailUrl).string_len(1024))
                    .col(ColumnDef::new(Video::VideoUrl).string_len(1024).not_null())
                    .col(ColumnDef::new(Video::Duration).string_len(16))
                    .col(ColumnDef::new(Video::Category).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Video::Tags)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(ColumnDef::new(Video::Views).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Video::Likes).integer().not_null().default(0))
                    .col(ColumnDef::new(Video::Dislikes).integer().not_null().default(0))
                    .col(ColumnDef::new(Video::IsPublic).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(Video::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Video::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_video_user")
                            .from(Video::Table, Video::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, created_at) for channel listings
        manager
            .create_index(
                Index::create()
                    .name("idx_video_user_id_created_at")
                    .table(Video::Table)
                    .col(Video::UserId)
                    .col(Video::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: category (for related videos and filtering)
        manager
            .create_index(
                Index::create()
                    .name("idx_video_category")
                    .table(Video::Table)
                    .col(Video::Category)
                    .to_owned(),
            )
            .await?;

        // Index: views (for relevance and popularity ordering)
        manager
            .create_index(
                Index::create()
                    .name("idx_video_views")
                    .table(Video::Table)
                    .col(Video::Views)
                    .to_owned(),
            )
            .await?;

        // GIN index on tags for containment queries
        manager
            .get_connection()
            .execute_unprepared("CREATE INDEX IF NOT EXISTS idx_video_tags ON video USING GIN (tags)")
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Video::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Video {
    Table,
    Id,
    UserId,
    Title,
    Description,
    ThumbnailUrl,
    VideoUrl,
    Duration,
    Category,
    Tags,
    Views,
    Likes,
    Dislikes,
    IsPublic,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
