//! CareerJet job-board scraper.
//!
//! Plainer target than Seek: standard headers, fixed delays, and a layout
//! addressed by position (`ul li article`) rather than data attributes.
//! Every card yields a record; missing fields stay null.

use scraper::{Html, Selector};
use tracing::{debug, error, info};

use super::{open_collection, PageSource, Paginator, RunSummary};
use crate::config::HarvestConfig;
use crate::extract::{css, first_attr, first_text};
use crate::models::{JobRecord, Record};
use crate::scrapers::{HttpClient, Pacing, ProxyRotator, RetryPolicy};
use crate::sink::{save_records, write_snapshot, SinkMode};

pub const BASE_URL: &str = "https://www.careerjet.com.au/jobs?l=Australia&nw=1&s=";
pub const SOURCE: &str = "CareerJet";
pub const COLLECTION: &str = "careerjet_jobs";

const DEFAULT_MAX_PAGES: u32 = 70;
const RETRY_DELAY_SECS: u64 = 5;
const PAGE_DELAY_SECS: u64 = 2;

/// CareerJet search listing.
pub struct CareerJetSource {
    base_url: String,
}

impl CareerJetSource {
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
        }
    }
}

impl Default for CareerJetSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSource for CareerJetSource {
    fn source_name(&self) -> &str {
        SOURCE
    }

    fn page_url(&self, page: u32) -> String {
        format!("{}&p={}", self.base_url, page)
    }

    fn parse(&self, body: &str) -> Vec<Record> {
        parse_listing(body)
    }
}

struct CardSelectors {
    card: Selector,
    title: Selector,
    location: Selector,
    salary: Selector,
    description: Selector,
    posted: Selector,
    link: Selector,
}

impl CardSelectors {
    fn new() -> Self {
        Self {
            card: css("ul li article"),
            title: css("p"),
            location: css("ul.location li"),
            salary: css("ul.salary li"),
            description: css("div"),
            posted: css("footer ul li span"),
            link: css("a[href]"),
        }
    }
}

/// Extract job records from a CareerJet listing page. No viability rule:
/// a card that yields nothing still produces a tagged, timestamped record.
pub fn parse_listing(body: &str) -> Vec<Record> {
    let document = Html::parse_document(body);
    let selectors = CardSelectors::new();
    let mut jobs = Vec::new();

    for card in document.select(&selectors.card) {
        let mut job = JobRecord::new(SOURCE);
        job.title = first_text(&card, &selectors.title);
        job.location = first_text(&card, &selectors.location);
        job.salary = first_text(&card, &selectors.salary);
        job.description = first_text(&card, &selectors.description);
        job.posted_date = first_text(&card, &selectors.posted);
        job.url = first_attr(&card, &selectors.link, "href");

        debug!("Scraped job: {:?}", job.title);
        jobs.push(Record::from(job));
    }

    jobs
}

/// Run a full CareerJet harvest: paginate, snapshot, bulk-insert.
///
/// The collection load is insert-many without key matching, so repeated
/// runs duplicate postings. That has always been this source's behavior;
/// de-duplication happens downstream of the corpus.
pub async fn harvest(config: &HarvestConfig, max_pages: Option<u32>) -> anyhow::Result<RunSummary> {
    info!("Starting to scrape CareerJet jobs");

    let retry_delay = config
        .fetch
        .retry_delay_secs
        .map(Pacing::from_bounds)
        .unwrap_or_else(|| Pacing::fixed_secs(RETRY_DELAY_SECS));
    let page_delay = config
        .fetch
        .page_delay_secs
        .map(Pacing::from_bounds)
        .unwrap_or_else(|| Pacing::fixed_secs(PAGE_DELAY_SECS));

    let proxies = ProxyRotator::from_config(&config.proxy);
    let client = HttpClient::new(&config.fetch, proxies).with_retry(RetryPolicy {
        max_attempts: config.fetch.max_retries,
        delay: retry_delay,
    });

    let source = CareerJetSource::new();
    let max_pages = max_pages
        .or(config.fetch.max_pages)
        .unwrap_or(DEFAULT_MAX_PAGES);
    let crawl = Paginator::new(&client, page_delay, max_pages)
        .run(&source)
        .await;

    let snapshot = match write_snapshot(&config.output_dir, COLLECTION, &crawl.records) {
        Ok(path) => path,
        Err(err) => {
            error!("Failed to save jobs to JSON: {}", err);
            None
        }
    };

    let saved = match open_collection(config, COLLECTION) {
        Some(collection) => save_records(&collection, &crawl.records, SinkMode::InsertMany),
        None => 0,
    };

    let summary = RunSummary {
        source: SOURCE.to_string(),
        pages: crawl.pages,
        found: crawl.records.len(),
        saved,
        snapshot,
    };
    info!("{}", summary);
    Ok(summary)
}
