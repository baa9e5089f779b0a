pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_providers;
mod m20250301_000002_create_provider_options;
mod m20250301_000003_create_provider_logs;
mod m20250301_000004_create_library_entries;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_providers::Migration),
            Box::new(m20250301_000002_create_provider_options::Migration),
            Box::new(m20250301_000003_create_provider_logs::Migration),
            Box::new(m20250301_000004_create_library_entries::Migration),
        ]
    }
}
