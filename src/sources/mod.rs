//! Source-specific extractors and the pagination driver.

pub mod careerjet;
pub mod courses;
pub mod occupations;
mod paginate;
pub mod seek;

pub use paginate::{PageCrawl, Paginator};

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::warn;

use crate::config::HarvestConfig;
use crate::models::Record;
use crate::scrapers::{FetchError, HttpClient};
use crate::sink::{SqliteCollection, SqliteStore};

/// A paginated listing endpoint: how to address page N and how to turn its
/// body into records.
///
/// `parse` is total: malformed nodes degrade to skipped records or null
/// fields, and an empty result is the pagination stop signal, not an error.
pub trait PageSource {
    fn source_name(&self) -> &str;
    fn page_url(&self, page: u32) -> String;
    fn parse(&self, body: &str) -> Vec<Record>;
}

/// Fetch seam between the paginator and the HTTP layer.
#[async_trait]
pub trait PageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.fetch(url).await
    }
}

/// Outcome of one harvest run. Partial success is the common case: a run
/// that lost pages or fields still reports what it found and saved.
#[derive(Debug)]
pub struct RunSummary {
    pub source: String,
    pub pages: u32,
    pub found: usize,
    pub saved: usize,
    pub snapshot: Option<PathBuf>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Completed scraping {}. Pages: {}, records found: {}, saved: {}",
            self.source, self.pages, self.found, self.saved
        )?;
        if let Some(ref path) = self.snapshot {
            write!(f, ", snapshot: {}", path.display())?;
        }
        Ok(())
    }
}

/// Open a store collection, degrading to snapshot-only persistence when the
/// store is disabled or unreachable.
pub(crate) fn open_collection(config: &HarvestConfig, name: &str) -> Option<SqliteCollection> {
    let path = config.store_path()?;
    let store = match SqliteStore::open(&path) {
        Ok(store) => store,
        Err(err) => {
            warn!(
                "Document store not available: {}. Will save to JSON files only.",
                err
            );
            return None;
        }
    };
    match store.collection(name) {
        Ok(collection) => Some(collection),
        Err(err) => {
            warn!(
                "Document store not available: {}. Will save to JSON files only.",
                err
            );
            None
        }
    }
}
