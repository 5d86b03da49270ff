//! Seek job-board scraper.
//!
//! Seek fronts its listings with bot-challenge middleware, so requests use
//! the browser header profile and a wider randomized delay. Job cards are
//! `article` nodes tagged with `data-automation` attributes.

use scraper::{Html, Selector};
use tracing::{debug, error, info};

use super::{open_collection, PageSource, Paginator, RunSummary};
use crate::config::HarvestConfig;
use crate::extract::{css, first_attr, first_text, resolve_url};
use crate::models::{JobRecord, Record};
use crate::scrapers::{HttpClient, Pacing, ProxyRotator, RetryPolicy};
use crate::sink::{save_records, write_snapshot, SinkMode};

pub const BASE_URL: &str = "https://www.seek.com.au";
pub const SOURCE: &str = "Seek";
pub const COLLECTION: &str = "seek_jobs";

const DEFAULT_MAX_PAGES: u32 = 10;

/// Seek search listing for a keyword/location pair.
pub struct SeekSource {
    base_url: String,
    keywords: String,
    location: String,
}

impl SeekSource {
    pub fn new(keywords: &str, location: &str) -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            keywords: keywords.to_string(),
            location: location.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }
}

impl PageSource for SeekSource {
    fn source_name(&self) -> &str {
        SOURCE
    }

    fn page_url(&self, page: u32) -> String {
        format!(
            "{}/jobs?keywords={}&location={}&page={}",
            self.base_url,
            urlencoding::encode(&self.keywords),
            urlencoding::encode(&self.location),
            page
        )
    }

    fn parse(&self, body: &str) -> Vec<Record> {
        parse_listing(body, &self.base_url)
    }
}

struct CardSelectors {
    card: Selector,
    title: Selector,
    link: Selector,
    company: Selector,
    location: Selector,
    salary: Selector,
    job_type: Selector,
    posted: Selector,
}

impl CardSelectors {
    fn new() -> Self {
        Self {
            card: css(r#"article[data-automation="normalJob"]"#),
            title: css(r#"h3[data-automation="jobTitle"]"#),
            link: css(r#"a[data-automation="jobTitle"]"#),
            company: css(r#"a[data-automation="jobCompany"]"#),
            location: css(r#"a[data-automation="jobLocation"]"#),
            salary: css(r#"span[data-automation="jobSalary"]"#),
            job_type: css(r#"span[data-automation="jobType"]"#),
            posted: css(r#"span[data-automation="jobListingDate"]"#),
        }
    }
}

/// Extract job records from a Seek listing page.
///
/// Cards missing a title or company are dropped: without either there is
/// nothing to identify the posting by, and Seek renders promo tiles inside
/// the same article structure.
pub fn parse_listing(body: &str, base_url: &str) -> Vec<Record> {
    let document = Html::parse_document(body);
    let selectors = CardSelectors::new();
    let mut jobs = Vec::new();

    for card in document.select(&selectors.card) {
        let mut job = JobRecord::new(SOURCE);
        job.title = first_text(&card, &selectors.title);
        job.company = first_text(&card, &selectors.company);
        job.location = first_text(&card, &selectors.location);
        job.salary = first_text(&card, &selectors.salary);
        job.job_type = first_text(&card, &selectors.job_type);
        job.posted_date = first_text(&card, &selectors.posted);
        job.url = first_attr(&card, &selectors.link, "href")
            .map(|href| resolve_url(base_url, &href));

        if job.title.is_none() || job.company.is_none() {
            debug!("Skipping job card without title or company");
            continue;
        }
        jobs.push(Record::from(job));
    }

    jobs
}

/// Run a full Seek harvest: paginate, snapshot, upsert by URL.
pub async fn harvest(
    config: &HarvestConfig,
    keywords: &str,
    location: &str,
    max_pages: Option<u32>,
) -> anyhow::Result<RunSummary> {
    info!(
        "Starting to scrape Seek jobs for keywords: {}, location: {}",
        keywords, location
    );

    let retry_delay = config
        .fetch
        .retry_delay_secs
        .map(Pacing::from_bounds)
        .unwrap_or_else(|| Pacing::range_secs(2, 5));
    let page_delay = config
        .fetch
        .page_delay_secs
        .map(Pacing::from_bounds)
        .unwrap_or_else(|| Pacing::range_secs(2, 5));

    let proxies = ProxyRotator::from_config(&config.proxy);
    let client = HttpClient::new(&config.fetch, proxies)
        .with_referer(BASE_URL.to_string())
        .with_retry(RetryPolicy {
            max_attempts: config.fetch.max_retries,
            delay: retry_delay,
        });

    let source = SeekSource::new(keywords, location);
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
        Some(collection) => save_records(&collection, &crawl.records, SinkMode::Upsert),
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

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body><div id="results">
          <article data-automation="normalJob">
            <a data-automation="jobTitle" href="/job/101"><h3 data-automation="jobTitle">Rust Developer</h3></a>
            <a data-automation="jobCompany">Acme Pty Ltd</a>
            <a data-automation="jobLocation">Brisbane QLD</a>
            <span data-automation="jobSalary">$140k</span>
            <span data-automation="jobType">Full time</span>
            <span data-automation="jobListingDate">3d ago</span>
          </article>
          <article data-automation="normalJob">
            <a data-automation="jobTitle" href="/job/102"><h3 data-automation="jobTitle">Data Engineer</h3></a>
            <a data-automation="jobCompany">Globex</a>
          </article>
          <article data-automation="normalJob">
            <a data-automation="jobCompany">Promo Tile Co</a>
          </article>
        </div></body></html>
    "#;

    #[test]
    fn test_parse_listing_extracts_well_formed_cards() {
        let jobs = parse_listing(LISTING, BASE_URL);
        assert_eq!(jobs.len(), 2);

        let Record::Job(first) = &jobs[0] else {
            panic!("expected job record");
        };
        assert_eq!(first.title.as_deref(), Some("Rust Developer"));
        assert_eq!(first.company.as_deref(), Some("Acme Pty Ltd"));
        assert_eq!(first.location.as_deref(), Some("Brisbane QLD"));
        assert_eq!(first.salary.as_deref(), Some("$140k"));
        assert_eq!(first.url.as_deref(), Some("https://www.seek.com.au/job/101"));
        assert_eq!(first.source, SOURCE);
    }

    #[test]
    fn test_malformed_card_is_dropped_not_fatal() {
        let jobs = parse_listing(LISTING, BASE_URL);
        // The promo tile has no title, so only two records survive.
        assert_eq!(jobs.len(), 2);
    }

    #[test]
    fn test_partial_card_keeps_null_fields() {
        let jobs = parse_listing(LISTING, BASE_URL);
        let Record::Job(second) = &jobs[1] else {
            panic!("expected job record");
        };
        assert_eq!(second.title.as_deref(), Some("Data Engineer"));
        assert!(second.salary.is_none());
        assert!(second.posted_date.is_none());
    }

    #[test]
    fn test_empty_page_yields_empty_batch() {
        assert!(parse_listing("<html><body></body></html>", BASE_URL).is_empty());
        assert!(parse_listing("", BASE_URL).is_empty());
    }

    #[test]
    fn test_page_url_encodes_query() {
        let source = SeekSource::new("python developer", "Australia").with_base_url("https://s.test");
        assert_eq!(
            source.page_url(3),
            "https://s.test/jobs?keywords=python%20developer&location=Australia&page=3"
        );
    }
}
