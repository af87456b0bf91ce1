use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditLogs::ActorId).uuid())
                    .col(ColumnDef::new(AuditLogs::Action).string().not_null())
                    .col(ColumnDef::new(AuditLogs::Subject).string().not_null())
                    .col(ColumnDef::new(AuditLogs::Details).json())
                    .col(
                        ColumnDef::new(AuditLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AlbumViews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AlbumViews::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AlbumViews::AlbumId).uuid().not_null())
                    .col(ColumnDef::new(AlbumViews::ViewerIp).string())
                    .col(
                        ColumnDef::new(AlbumViews::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PhotoViews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PhotoViews::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PhotoViews::PhotoId).uuid().not_null())
                    .col(ColumnDef::new(PhotoViews::ViewerIp).string())
                    .col(
                        ColumnDef::new(PhotoViews::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DownloadLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DownloadLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DownloadLogs::PhotoId).uuid())
                    .col(ColumnDef::new(DownloadLogs::AlbumId).uuid())
                    .col(ColumnDef::new(DownloadLogs::Batch).boolean().not_null())
                    .col(
                        ColumnDef::new(DownloadLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Translations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Translations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Translations::Locale).string().not_null())
                    .col(ColumnDef::new(Translations::Key).string().not_null())
                    .col(ColumnDef::new(Translations::Value).text().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Translations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DownloadLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PhotoViews::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AlbumViews::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AuditLogs {
    Table,
    Id,
    ActorId,
    Action,
    Subject,
    Details,
    CreatedAt,
}

#[derive(Iden)]
enum AlbumViews {
    Table,
    Id,
    AlbumId,
    ViewerIp,
    CreatedAt,
}

#[derive(Iden)]
enum PhotoViews {
    Table,
    Id,
    PhotoId,
    ViewerIp,
    CreatedAt,
}

#[derive(Iden)]
enum DownloadLogs {
    Table,
    Id,
    PhotoId,
    AlbumId,
    Batch,
    CreatedAt,
}

#[derive(Iden)]
enum Translations {
    Table,
    Id,
    Locale,
    Key,
    Value,
}
