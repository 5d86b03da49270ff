//! University course scraper.
//!
//! Two stages: the active-courses list page names every course as an `h3`
//! of "CODE Title", then each course's detail page is addressed by a slug
//! derived from its title. Detail pages missing the identifying fields are
//! collected into a stable reject file instead of being emitted.

use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use regex::Regex;
use scraper::Html;
use serde::Serialize;
use tracing::{error, info, warn};

use super::{open_collection, RunSummary};
use crate::config::HarvestConfig;
use crate::extract::{css, element_text, first_text};
use crate::models::{CourseDuration, CourseRecord, Record};
use crate::scrapers::{HttpClient, Pacing, ProxyRotator, RateGate};
use crate::sink::{append_entries, save_records, SinkMode};

pub const LIST_URL: &str = "https://www.qut.edu.au/about/governance-and-policy/handbooks-course-lists-and-award-abbreviations/active-courses-list";
pub const COURSE_BASE_URL: &str = "https://www.qut.edu.au/courses";
pub const SOURCE: &str = "QUT";
pub const COLLECTION: &str = "courses";

const DETAIL_DELAY_SECS: u64 = 2;

/// One entry from the active-courses list.
#[derive(Debug, Clone, Serialize)]
pub struct CourseListing {
    pub code: String,
    pub title: String,
}

/// A detail page that could not be turned into a record.
#[derive(Debug, Clone, Serialize)]
pub struct CourseReject {
    pub url: String,
    pub error: String,
}

/// Outcome of parsing one course detail page.
#[derive(Debug)]
pub enum CourseDetail {
    Course(CourseRecord),
    Reject(CourseReject),
}

/// Split every `h3` on the list page into a course code and title.
pub fn parse_course_list(body: &str) -> Vec<CourseListing> {
    let document = Html::parse_document(body);
    let heading_sel = css("h3");
    let mut courses = Vec::new();

    for heading in document.select(&heading_sel) {
        let Some(text) = element_text(&heading) else {
            continue;
        };
        let (code, title) = match text.split_once(' ') {
            Some((code, title)) => (code.to_string(), title.trim().to_string()),
            None => (text.clone(), String::new()),
        };
        courses.push(CourseListing { code, title });
    }

    courses
}

/// Detail-page URL for a course title: lowercase, spaces to dashes,
/// dash runs collapsed, parentheses stripped.
pub fn course_detail_url(title: &str) -> String {
    let slug = title.to_lowercase().replace(' ', "-");
    let slug = Regex::new(r"-{2,}")
        .expect("valid regex")
        .replace_all(&slug, "-")
        .replace(['(', ')'], "");
    format!("{}/{}", COURSE_BASE_URL, slug)
}

/// Parse one course detail page.
///
/// The course name and code are mandatory; everything else degrades
/// gracefully. A page missing either becomes a reject carrying the reason.
pub fn parse_course_detail(body: &str, url: &str) -> CourseDetail {
    let document = Html::parse_document(body);
    let root = document.root_element();

    let name = first_text(&root, &css(r#"span[data-course-map-key="courseTitle"]"#));
    let code = first_text(&root, &css(r#"dd[data-course-map-key="reqTabCourseCode"]"#));

    let (name, code) = match (name, code) {
        (Some(name), Some(code)) => (name, code),
        (None, _) => {
            return CourseDetail::Reject(CourseReject {
                url: url.to_string(),
                error: "Course name is missing".to_string(),
            })
        }
        (_, None) => {
            return CourseDetail::Reject(CourseReject {
                url: url.to_string(),
                error: "Course code is missing".to_string(),
            })
        }
    };

    let mut course = CourseRecord::new(code, name, SOURCE);
    course.url = Some(url.to_string());

    let duration_sel = css("div.duration-icon li[data-course-audience]");
    for item in document.select(&duration_sel) {
        if let Some(duration) = element_text(&item) {
            course.durations.push(CourseDuration {
                audience: item.value().attr("data-course-audience").map(String::from),
                duration,
            });
        }
    }

    CourseDetail::Course(course)
}

/// Write the stable course-list snapshot: a wrapper naming the list page
/// and the day it was read.
pub fn write_course_list(
    path: &Path,
    listings: &[CourseListing],
) -> anyhow::Result<()> {
    let wrapper = serde_json::json!({
        "source": LIST_URL,
        "day_obtained": Utc::now().format("%Y-%m-%d").to_string(),
        "list_of_courses": listings,
    });
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {}", parent.display()))?;
        }
    }
    let body = serde_json::to_string_pretty(&wrapper).context("serializing course list")?;
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    info!("Saved {} courses to {}", listings.len(), path.display());
    Ok(())
}

/// Harvest the course corpus: list page, then each detail page in order,
/// upserting records by URL and filing rejects.
///
/// `limit` caps how many detail pages are visited; the list snapshot always
/// covers the whole page.
pub async fn harvest(config: &HarvestConfig, limit: Option<usize>) -> anyhow::Result<RunSummary> {
    let proxies = ProxyRotator::from_config(&config.proxy);
    let client =
        HttpClient::new(&config.fetch, proxies).with_rate_gate(RateGate::per_second(1.0));

    info!("Fetching course list from {}", LIST_URL);
    let body = client
        .fetch(LIST_URL)
        .await
        .context("fetching the course list page")?;
    let listings = parse_course_list(&body);
    info!("Found {} courses on the list page", listings.len());

    let list_path = config.output_dir.join("courses.json");
    if let Err(err) = write_course_list(&list_path, &listings) {
        error!("Failed to save course list: {}", err);
    }

    let pacing = Pacing::fixed_secs(DETAIL_DELAY_SECS);
    let mut records: Vec<Record> = Vec::new();
    let mut rejects: Vec<CourseReject> = Vec::new();
    let mut pages = 1;

    let selected = match limit {
        Some(limit) => &listings[..limit.min(listings.len())],
        None => &listings[..],
    };
    for listing in selected {
        let url = course_detail_url(&listing.title);
        info!("Processing course: {} - {}", listing.code, url);

        match client.fetch(&url).await {
            Ok(body) => {
                pages += 1;
                match parse_course_detail(&body, &url) {
                    CourseDetail::Course(course) => records.push(Record::from(course)),
                    CourseDetail::Reject(reject) => {
                        warn!("Missing or invalid course data for URL: {}", reject.url);
                        rejects.push(reject);
                    }
                }
            }
            Err(err) => {
                warn!("Missing or invalid course data for URL: {}", url);
                rejects.push(CourseReject {
                    url,
                    error: err.to_string(),
                });
            }
        }
        pacing.wait().await;
    }

    if !rejects.is_empty() {
        let reject_path = config.output_dir.join("not_courses.json");
        let entries: Vec<serde_json::Value> = rejects
            .iter()
            .filter_map(|r| serde_json::to_value(r).ok())
            .collect();
        if let Err(err) = append_entries(&reject_path, &entries) {
            error!("Failed to save rejected courses: {}", err);
        }
    }

    let saved = match open_collection(config, COLLECTION) {
        Some(collection) => save_records(&collection, &records, SinkMode::Upsert),
        None => 0,
    };

    let summary = RunSummary {
        source: SOURCE.to_string(),
        pages,
        found: records.len(),
        saved,
        snapshot: Some(list_path),
    };
    info!("{}", summary);
    Ok(summary)
}
