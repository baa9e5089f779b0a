//! Aggregated metadata service held by the application state.

use std::sync::Arc;

use crate::filler::FillerTable;
use crate::index::{EpisodeIndex, IndexCache, IndexEpisodes};
use crate::media::Media;
use crate::reconcile::{make_episode_list, EpisodeRecord};

pub struct MetadataService {
    cache: IndexCache,
    filler: FillerTable,
}

impl MetadataService {
    pub fn new(index: Arc<dyn EpisodeIndex>, filler: FillerTable) -> Self {
        Self {
            cache: IndexCache::new(index),
            filler,
        }
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    pub fn filler(&self) -> &FillerTable {
        &self.filler
    }

    /// Reconciled episode list for a media.
    pub async fn episode_list(&self, media: &Media) -> Vec<EpisodeRecord> {
        let index = self.cache.episodes(media.id).await;
        make_episode_list(media, index.as_deref(), &self.filler)
    }

    /// Episode data carrying an AniDB mapping for this media. Specials
    /// without their own mapping fall back to the parent series.
    pub async fn index_for_media(&self, media: &Media) -> Option<Arc<IndexEpisodes>> {
        let direct = self.cache.episodes(media.id).await;
        if let Some(found) = &direct {
            if found.mappings.as_ref().and_then(|m| m.anidb_id).is_some() {
                return direct;
            }
        }
        let parent = media.parent_for_special()?;
        self.cache.episodes(parent).await
    }

    /// AniDB anime and episode ids used to sharpen provider queries. The
    /// episode id is only resolved once the anime id is known.
    pub async fn anidb_ids(&self, media: &Media, episode: i32) -> (Option<i64>, Option<i64>) {
        let Some(index) = self.index_for_media(media).await else {
            return (None, None);
        };
        let anidb_aid = index.mappings.as_ref().and_then(|m| m.anidb_id);
        if anidb_aid.is_none() {
            return (None, None);
        }
        let slot = usize::try_from(episode - 1).ok();
        let anidb_eid = slot.and_then(|offset| {
            make_episode_list(media, Some(&index), &self.filler)
                .get(offset)
                .and_then(|record| record.anidb_eid)
        });
        (anidb_aid, anidb_eid)
    }
}
