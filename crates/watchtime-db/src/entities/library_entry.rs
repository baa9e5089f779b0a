use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A locally cached playable entry, used as the offline search fallback.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "library_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub media_id: i64,
    pub episode: i32,
    pub hash: String,
    pub name: Option<String>,
    pub size: i64,
    /// Number of files in the payload; > 1 implies a batch.
    pub files: i32,
    pub date: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
