use sea_orm_migration::prelude::*;

use crate::m20250301_000001_create_providers::Providers;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProviderOptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProviderOptions::ProviderId)
                            .string_len(128)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProviderOptions::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(ProviderOptions::Options).json().not_null())
                    .col(
                        ColumnDef::new(ProviderOptions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_provider_options_provider")
                            .from(ProviderOptions::Table, ProviderOptions::ProviderId)
                            .to(Providers::Table, Providers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProviderOptions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ProviderOptions {
    Table,
    ProviderId,
    Enabled,
    Options,
    UpdatedAt,
}
