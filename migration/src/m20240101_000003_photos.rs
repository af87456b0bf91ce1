use sea_orm_migration::prelude::*;

use super::m20240101_000002_albums::Albums;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Photos::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Photos::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Photos::AlbumId).uuid().not_null())
                    .col(ColumnDef::new(Photos::Filename).string().not_null())
                    .col(ColumnDef::new(Photos::OriginalKey).string().not_null())
                    .col(ColumnDef::new(Photos::ThumbKey).string())
                    .col(ColumnDef::new(Photos::PreviewKey).string())
                    .col(ColumnDef::new(Photos::VariantKeys).json())
                    .col(ColumnDef::new(Photos::MimeType).string().not_null())
                    .col(ColumnDef::new(Photos::FileSize).big_integer().not_null())
                    .col(ColumnDef::new(Photos::Width).integer())
                    .col(ColumnDef::new(Photos::Height).integer())
                    .col(
                        ColumnDef::new(Photos::Rotation)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Photos::CapturedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Photos::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Photos::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Photos::ErrorMessage).text())
                    .col(
                        ColumnDef::new(Photos::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Photos::ProcessingStartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Photos::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Photos::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Photos::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_photos_album_id")
                            .from(Photos::Table, Photos::AlbumId)
                            .to(Albums::Table, Albums::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_photos_album_status")
                    .table(Photos::Table)
                    .col(Photos::AlbumId)
                    .col(Photos::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_photos_status_processing_started_at")
                    .table(Photos::Table)
                    .col(Photos::Status)
                    .col(Photos::ProcessingStartedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Photos::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Photos {
    Table,
    Id,
    AlbumId,
    Filename,
    OriginalKey,
    ThumbKey,
    PreviewKey,
    VariantKeys,
    MimeType,
    FileSize,
    Width,
    Height,
    Rotation,
    CapturedAt,
    SortOrder,
    Status,
    ErrorMessage,
    Attempts,
    ProcessingStartedAt,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}
