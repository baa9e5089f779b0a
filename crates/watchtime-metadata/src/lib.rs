//! WatchTime Metadata
//!
//! Episode metadata for the search pipeline: an ani.zip compatible episode
//! index client with a bidirectional id-mapping cache, reconciliation of the
//! AniList airing schedule against index episode data, and the community
//! filler table. Index lookups are best effort and never fail a request.

pub mod filler;
pub mod index;
pub mod media;
pub mod reconcile;
pub mod service;

pub use filler::FillerTable;
pub use index::{
    EpisodeIndex, HttpEpisodeIndex, IndexCache, IndexEpisode, IndexEpisodes, IndexMappings,
    MappingKey, Titles,
};
pub use media::{
    AiringEvent, FuzzyDate, Media, MediaEdge, MediaFormat, MediaTitle, RelatedMedia, RelationKind,
};
pub use reconcile::{
    episode_by_air_date, make_episode_list, AirSchedule, EpisodePool, EpisodeRecord, PoolEpisode,
};
pub use service::MetadataService;
