//! Typed records produced by the harvest pipeline.
//!
//! Every record carries a `source` tag and a scrape timestamp. Fields that a
//! page failed to yield are kept as `None` and serialize as JSON null, so
//! downstream consumers can rely on key presence rather than key existence.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A job posting extracted from a job-board listing page.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: Option<String>,
    pub posted_date: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    /// Which board this posting came from.
    pub source: String,
    pub scraped_at: DateTime<Utc>,
}

impl JobRecord {
    /// Empty record for a source, stamped with the current time.
    pub fn new(source: &str) -> Self {
        Self {
            title: None,
            company: None,
            location: None,
            salary: None,
            job_type: None,
            posted_date: None,
            description: None,
            url: None,
            source: source.to_string(),
            scraped_at: Utc::now(),
        }
    }
}

/// Audience-specific course duration (domestic vs international).
#[derive(Debug, Clone, Serialize)]
pub struct CourseDuration {
    pub audience: Option<String>,
    pub duration: String,
}

/// A course listing, optionally enriched from its detail page.
#[derive(Debug, Clone, Serialize)]
pub struct CourseRecord {
    pub code: String,
    pub title: String,
    pub url: Option<String>,
    pub durations: Vec<CourseDuration>,
    pub source: String,
    pub scraped_at: DateTime<Utc>,
}

impl CourseRecord {
    pub fn new(code: String, title: String, source: &str) -> Self {
        Self {
            code,
            title,
            url: None,
            durations: Vec::new(),
            source: source.to_string(),
            scraped_at: Utc::now(),
        }
    }
}

/// An occupation classification entry keyed by its occupation code.
#[derive(Debug, Clone, Serialize)]
pub struct OccupationRecord {
    pub code: String,
    pub title: String,
    pub skill_level: Option<String>,
    pub assessing_authority: Option<String>,
    pub source: String,
    pub date_scraped: DateTime<Utc>,
}

impl OccupationRecord {
    pub fn new(code: String, title: String, source: &str) -> Self {
        Self {
            code,
            title,
            skill_level: None,
            assessing_authority: None,
            source: source.to_string(),
            date_scraped: Utc::now(),
        }
    }
}

/// Any record the pipeline can produce.
///
/// Serializes untagged: a `Record` looks exactly like its inner record, so
/// snapshots and store documents carry plain field maps.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Record {
    Job(JobRecord),
    Course(CourseRecord),
    Occupation(OccupationRecord),
}

impl Record {
    /// The de-duplication key: URL for jobs and courses, code for occupations.
    ///
    /// Jobs scraped without a link have no key and can only be stored in
    /// insert mode.
    pub fn natural_key(&self) -> Option<&str> {
        match self {
            Record::Job(job) => job.url.as_deref(),
            Record::Course(course) => course.url.as_deref(),
            Record::Occupation(occ) => Some(occ.code.as_str()),
        }
    }

    /// Name of the field `natural_key` is drawn from.
    pub fn key_field(&self) -> &'static str {
        match self {
            Record::Job(_) | Record::Course(_) => "url",
            Record::Occupation(_) => "code",
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Record::Job(job) => &job.source,
            Record::Course(course) => &course.source,
            Record::Occupation(occ) => &occ.source,
        }
    }

    /// JSON document form for the document store.
    pub fn to_document(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl From<JobRecord> for Record {
    fn from(job: JobRecord) -> Self {
        Record::Job(job)
    }
}

impl From<CourseRecord> for Record {
    fn from(course: CourseRecord) -> Self {
        Record::Course(course)
    }
}

impl From<OccupationRecord> for Record {
    fn from(occ: OccupationRecord) -> Self {
        Record::Occupation(occ)
    }
}
