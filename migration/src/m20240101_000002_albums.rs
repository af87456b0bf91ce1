use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Albums::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Albums::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Albums::Slug).string().not_null())
                    .col(ColumnDef::new(Albums::Title).string().not_null())
                    .col(ColumnDef::new(Albums::Description).text())
                    .col(
                        ColumnDef::new(Albums::IsPublic)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Albums::AllowDownload)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Albums::AllowBatchDownload)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Albums::AllowShare)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Albums::ShowExif)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Albums::Layout)
                            .string()
                            .not_null()
                            .default("grid"),
                    )
                    .col(
                        ColumnDef::new(Albums::SortRule)
                            .string()
                            .not_null()
                            .default("captured_at_desc"),
                    )
                    .col(ColumnDef::new(Albums::Password).string())
                    .col(ColumnDef::new(Albums::ExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Albums::WatermarkEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Albums::WatermarkType)
                            .string()
                            .not_null()
                            .default("none"),
                    )
                    .col(ColumnDef::new(Albums::WatermarkConfig).json())
                    .col(ColumnDef::new(Albums::ColorGrading).json())
                    .col(ColumnDef::new(Albums::CoverPhotoId).uuid())
                    .col(
                        ColumnDef::new(Albums::PhotoCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Albums::SelectedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Albums::ViewCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Albums::UploadToken).string().not_null())
                    .col(ColumnDef::new(Albums::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Albums::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Albums::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_albums_slug")
                    .table(Albums::Table)
                    .col(Albums::Slug)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Albums::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Albums {
    Table,
    Id,
    Slug,
    Title,
    Description,
    IsPublic,
    AllowDownload,
    AllowBatchDownload,
    AllowShare,
    ShowExif,
    Layout,
    SortRule,
    Password,
    ExpiresAt,
    WatermarkEnabled,
    WatermarkType,
    WatermarkConfig,
    ColorGrading,
    CoverPhotoId,
    PhotoCount,
    SelectedCount,
    ViewCount,
    UploadToken,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}
