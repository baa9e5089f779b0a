//! Search pipeline error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("no providers configured")]
    NoProvidersConfigured,

    #[error("provider error: {0}")]
    Provider(String),

    #[error("scrape error: {0}")]
    Scrape(String),
}
