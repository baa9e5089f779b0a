use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LibraryEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LibraryEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LibraryEntries::MediaId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LibraryEntries::Episode)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LibraryEntries::Hash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(LibraryEntries::Name).string_len(500).null())
                    .col(
                        ColumnDef::new(LibraryEntries::Size)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LibraryEntries::Files)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(LibraryEntries::Date)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Offline search filters on media id + episode
        manager
            .create_index(
                Index::create()
                    .name("idx_library_entries_media_episode")
                    .table(LibraryEntries::Table)
                    .col(LibraryEntries::MediaId)
                    .col(LibraryEntries::Episode)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LibraryEntries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum LibraryEntries {
    Table,
    Id,
    MediaId,
    Episode,
    Hash,
    Name,
    Size,
    Files,
    Date,
}
