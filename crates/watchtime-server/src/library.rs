//! Local library lookups backed by the `library_entries` table.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use watchtime_db::entities::library_entry;
use watchtime_search::{LibraryHit, LocalLibrary};

/// Library adapter the search pipeline consults for offline playback.
pub struct DbLibrary {
    db: DatabaseConnection,
}

impl DbLibrary {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LocalLibrary for DbLibrary {
    /// Most recent completed download for a media/episode pair, if any.
    async fn find_entry(&self, media_id: i64, episode: i32) -> Option<LibraryHit> {
        let row = library_entry::Entity::find()
            .filter(library_entry::Column::MediaId.eq(media_id))
            .filter(library_entry::Column::Episode.eq(episode))
            .order_by_desc(library_entry::Column::Date)
            .one(&self.db)
            .await;

        match row {
            Ok(Some(row)) => Some(LibraryHit {
                hash: row.hash,
                name: row.name,
                size: row.size.max(0) as u64,
                files: row.files,
                date: row.date.with_timezone(&Utc),
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::error!(media_id, episode, "library lookup failed: {e}");
                None
            }
        }
    }
}
