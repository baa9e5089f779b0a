use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Providers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Providers::Id)
                            .string_len(128)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Providers::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Providers::Version)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Providers::Kind).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Providers::Accuracy)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Providers::Icon).string_len(500).not_null())
                    .col(ColumnDef::new(Providers::Hosts).json().not_null())
                    .col(
                        ColumnDef::new(Providers::SourceUrl)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Providers::UpdateUrl)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Providers::SourcePath)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Providers::Status)
                            .string_len(20)
                            .not_null()
                            .default("ok"),
                    )
                    .col(ColumnDef::new(Providers::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(Providers::InstalledAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Providers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Update checks scan by update URL
        manager
            .create_index(
                Index::create()
                    .name("idx_providers_update_url")
                    .table(Providers::Table)
                    .col(Providers::UpdateUrl)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Providers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Providers {
    Table,
    Id,
    Name,
    Version,
    Kind,
    Accuracy,
    Icon,
    Hosts,
    SourceUrl,
    UpdateUrl,
    SourcePath,
    Status,
    ErrorMessage,
    InstalledAt,
    UpdatedAt,
}
