use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "providers")]
pub struct Model {
    /// Manifest-declared provider id, e.g. "nyaa" or "animetosho-nzb".
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub version: String,
    /// "torrent" or "nzb".
    pub kind: String,
    /// "high", "medium" or "low".
    pub accuracy: String,
    pub icon: String,
    /// JSON array of hostnames the provider's sandbox may reach over HTTP.
    pub hosts: Json,
    /// URL the provider's WASM source is fetched from.
    pub source_url: String,
    /// URL of the update manifest covering this provider.
    pub update_url: String,
    /// Location of the cached source blob on disk.
    pub source_path: String,
    /// Runtime health: "ok" or "error".
    pub status: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
    pub installed_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::provider_option::Entity")]
    ProviderOption,
    #[sea_orm(has_many = "super::provider_log::Entity")]
    ProviderLogs,
}

impl Related<super::provider_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProviderOption.def()
    }
}

impl Related<super::provider_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProviderLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
