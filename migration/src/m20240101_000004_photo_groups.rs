use sea_orm_migration::prelude::*;

use super::m20240101_000002_albums::Albums;
use super::m20240101_000003_photos::Photos;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PhotoGroups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PhotoGroups::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PhotoGroups::AlbumId).uuid().not_null())
                    .col(ColumnDef::new(PhotoGroups::Name).string().not_null())
                    .col(ColumnDef::new(PhotoGroups::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(PhotoGroups::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_photo_groups_album_id")
                            .from(PhotoGroups::Table, PhotoGroups::AlbumId)
                            .to(Albums::Table, Albums::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PhotoGroupAssignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PhotoGroupAssignments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PhotoGroupAssignments::PhotoGroupId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PhotoGroupAssignments::PhotoId)
                            .uuid()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pga_photo_group_id")
                            .from(
                                PhotoGroupAssignments::Table,
                                PhotoGroupAssignments::PhotoGroupId,
                            )
                            .to(PhotoGroups::Table, PhotoGroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pga_photo_id")
                            .from(PhotoGroupAssignments::Table, PhotoGroupAssignments::PhotoId)
                            .to(Photos::Table, Photos::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pga_unique")
                    .table(PhotoGroupAssignments::Table)
                    .col(PhotoGroupAssignments::PhotoGroupId)
                    .col(PhotoGroupAssignments::PhotoId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PhotoGroupAssignments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PhotoGroups::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PhotoGroups {
    Table,
    Id,
    AlbumId,
    Name,
    DeletedAt,
    CreatedAt,
}

#[derive(Iden)]
enum PhotoGroupAssignments {
    Table,
    Id,
    PhotoGroupId,
    PhotoId,
}
