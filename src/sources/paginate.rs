//! Bounded pagination over a listing source.

use indicatif::ProgressBar;
use tracing::{info, warn};

use super::{PageFetcher, PageSource};
use crate::models::Record;
use crate::scrapers::Pacing;

/// Records accumulated by a crawl plus the number of pages that yielded a
/// body. Whatever was gathered before a stop condition is always kept.
#[derive(Debug)]
pub struct PageCrawl {
    pub records: Vec<Record>,
    pub pages: u32,
}

/// Drives fetch and parse across a bounded page range.
///
/// Pages run strictly in order, one at a time, so the fetch layer's pacing
/// stays meaningful to the remote site. Three conditions end the loop: the
/// page ceiling, an empty batch (end of results), or a fetch that failed
/// even after its internal retries.
pub struct Paginator<'a, F> {
    fetcher: &'a F,
    pacing: Pacing,
    max_pages: u32,
}

impl<'a, F: PageFetcher + Sync> Paginator<'a, F> {
    pub fn new(fetcher: &'a F, pacing: Pacing, max_pages: u32) -> Self {
        Self {
            fetcher,
            pacing,
            max_pages,
        }
    }

    /// Crawl pages `1..=max_pages`, accumulating records in page order.
    pub async fn run(&self, source: &(dyn PageSource + Sync)) -> PageCrawl {
        let mut records = Vec::new();
        let mut pages = 0;
        let bar = ProgressBar::new(self.max_pages as u64);
        bar.set_message(format!("Scraping {}", source.source_name()));

        for page in 1..=self.max_pages {
            let url = source.page_url(page);
            info!("Scraping page {}: {}", page, url);

            let body = match self.fetcher.fetch_page(&url).await {
                Ok(body) => body,
                Err(err) => {
                    warn!("Failed to fetch page {}, stopping pagination: {}", page, err);
                    break;
                }
            };
            pages += 1;

            let batch = source.parse(&body);
            if batch.is_empty() {
                info!("No more records found on page {}, stopping pagination", page);
                break;
            }

            info!("Found {} records on page {}", batch.len(), page);
            records.extend(batch);
            bar.inc(1);

            if page < self.max_pages {
                self.pacing.wait().await;
            }
        }

        bar.finish_and_clear();
        PageCrawl { records, pages }
    }
}
