//! JSON snapshot files.
//!
//! Snapshots are whole-batch writes: the batch is serialized first and the
//! file written in one shot, so a failure leaves no partial file behind.
//! An empty batch writes nothing.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::models::{OccupationRecord, Record};

/// Write a timestamped snapshot of `records` under `dir`.
///
/// Returns the written path, or `None` when the batch was empty and no
/// file was created.
pub fn write_snapshot(
    dir: &Path,
    slug: &str,
    records: &[Record],
) -> anyhow::Result<Option<PathBuf>> {
    if records.is_empty() {
        return Ok(None);
    }

    let body = serde_json::to_string_pretty(records).context("serializing snapshot")?;
    fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;

    let filename = format!("{}_{}.json", slug, Utc::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(filename);
    fs::write(&path, body).with_context(|| format!("writing snapshot {}", path.display()))?;

    info!("Saved {} records to {}", records.len(), path.display());
    Ok(Some(path))
}

/// Merge occupation records into a stable per-source snapshot file.
///
/// The file holds a `{source, date_scraped, occupations}` wrapper. Existing
/// entries are kept and overridden by new records sharing the same code, so
/// repeated runs accumulate without duplicating. Returns the merged count.
pub fn merge_occupation_snapshot(
    path: &Path,
    source: &str,
    records: &[OccupationRecord],
) -> anyhow::Result<usize> {
    if records.is_empty() {
        warn!("No occupations found for {}", source);
        return Ok(0);
    }

    let mut by_code: BTreeMap<String, Value> = BTreeMap::new();
    for existing in read_existing_occupations(path) {
        if let Some(code) = existing.get("code").and_then(Value::as_str) {
            by_code.insert(code.to_string(), existing);
        }
    }
    for record in records {
        by_code.insert(
            record.code.clone(),
            serde_json::to_value(record).context("serializing occupation")?,
        );
    }

    let merged: Vec<&Value> = by_code.values().collect();
    let wrapper = serde_json::json!({
        "source": source,
        "date_scraped": Utc::now().format("%Y-%m-%d").to_string(),
        "occupations": merged,
    });

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {}", parent.display()))?;
        }
    }
    let body = serde_json::to_string_pretty(&wrapper).context("serializing snapshot")?;
    fs::write(path, body).with_context(|| format!("writing snapshot {}", path.display()))?;

    info!("Saved {} occupations to {}", by_code.len(), path.display());
    Ok(by_code.len())
}

/// Append entries to a stable JSON-array file, e.g. the reject list kept
/// next to course snapshots. A missing or unreadable file starts fresh.
pub fn append_entries(path: &Path, entries: &[Value]) -> anyhow::Result<usize> {
    if entries.is_empty() {
        return Ok(0);
    }

    let mut all: Vec<Value> = match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!("Ignoring unreadable {}: {}", path.display(), err);
            Vec::new()
        }),
        Err(_) => Vec::new(),
    };
    all.extend(entries.iter().cloned());

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let body = serde_json::to_string_pretty(&all)?;
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(all.len())
}

fn read_existing_occupations(path: &Path) -> Vec<Value> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => value
            .get("occupations")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        Err(err) => {
            warn!("Ignoring unreadable snapshot {}: {}", path.display(), err);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobRecord;

    #[test]
    fn test_empty_batch_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("snapshots");
        let written = write_snapshot(&out, "seek_jobs", &[]).unwrap();
        assert!(written.is_none());
        assert!(!out.exists());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = JobRecord::new("Seek");
        job.title = Some("Engineer".to_string());
        let written = write_snapshot(dir.path(), "seek_jobs", &[Record::from(job)])
            .unwrap()
            .unwrap();

        assert!(written
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("seek_jobs_"));
        let raw = fs::read_to_string(&written).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["title"], "Engineer");
        assert!(parsed[0]["salary"].is_null());
    }

    #[test]
    fn test_merge_keeps_latest_per_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("occupations_immi.json");

        let mut first = OccupationRecord::new("261313".to_string(), "Old Title".to_string(), "immi");
        first.skill_level = Some("1".to_string());
        merge_occupation_snapshot(&path, "immi", &[first]).unwrap();

        let second =
            OccupationRecord::new("261313".to_string(), "Software Engineer".to_string(), "immi");
        let other = OccupationRecord::new("261312".to_string(), "Developer".to_string(), "immi");
        let merged = merge_occupation_snapshot(&path, "immi", &[second, other]).unwrap();
        assert_eq!(merged, 2);

        let raw = fs::read_to_string(&path).unwrap();
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        let occupations = parsed["occupations"].as_array().unwrap();
        assert_eq!(occupations.len(), 2);
        let entry = occupations
            .iter()
            .find(|o| o["code"] == "261313")
            .unwrap();
        assert_eq!(entry["title"], "Software Engineer");
    }

    #[test]
    fn test_merge_empty_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("occupations_abs.json");
        assert_eq!(merge_occupation_snapshot(&path, "abs", &[]).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_append_entries_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_courses.json");
        let first = serde_json::json!({"url": "https://example.com/a", "error": "missing name"});
        assert_eq!(append_entries(&path, &[first]).unwrap(), 1);
        let second = serde_json::json!({"url": "https://example.com/b", "error": "missing code"});
        assert_eq!(append_entries(&path, &[second]).unwrap(), 2);

        let raw = fs::read_to_string(&path).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
    }
}
