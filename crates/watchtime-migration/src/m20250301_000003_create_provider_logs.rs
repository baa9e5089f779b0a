use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProviderLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProviderLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProviderLogs::ProviderId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderLogs::Action)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProviderLogs::Detail).text().null())
                    .col(
                        ColumnDef::new(ProviderLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // No foreign key: audit rows outlive the provider they
                    // describe (removal itself is the last row written).
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_provider_logs_provider_id")
                    .table(ProviderLogs::Table)
                    .col(ProviderLogs::ProviderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_provider_logs_created_at")
                    .table(ProviderLogs::Table)
                    .col(ProviderLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProviderLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ProviderLogs {
    Table,
    Id,
    ProviderId,
    Action,
    Detail,
    CreatedAt,
}
