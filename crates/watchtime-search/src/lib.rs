//! WatchTime Search
//!
//! Release search across installed providers. One query fans out to every
//! live provider concurrently, per-release results are merged across
//! providers by infohash, filenames are parsed for episode metadata, and
//! swarm counts are refreshed from tracker scrapes. Provider execution lives
//! in watchtime-provider; this crate owns the query model and the fan-out.

pub mod dedupe;
pub mod error;
pub mod fanout;
pub mod options;
pub mod parse;
pub mod traits;
pub mod types;

pub use dedupe::dedupe;
pub use error::SearchError;
pub use fanout::{SearchOutcome, SearchPipeline};
pub use options::{build_exclusions, PlaybackCapabilities, SearchOptions};
pub use parse::BasicTitleParser;
pub use traits::{
    LocalLibrary, ProviderCaller, ProviderKind, ProviderPool, ProviderSnapshot, Scraper,
    TitleParser,
};
pub use types::{
    Accuracy, LibraryHit, MergedResult, NzbResult, ParsedTitle, ProviderFailure, RawResult,
    ResultKind, ScrapeEntry, PEER_COUNT_CEILING,
};
