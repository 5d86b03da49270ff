//! Persistence: JSON snapshots and the keyed document collection.

pub mod snapshot;
pub mod store;

pub use snapshot::{append_entries, merge_occupation_snapshot, write_snapshot};
pub use store::{DocumentStore, SqliteCollection, SqliteStore, StoreError};

use tracing::{error, info};

use crate::models::Record;

/// How records land in the document collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    /// Match on the natural key, replacing the previous document. Running
    /// the same pages twice yields one document per key.
    Upsert,
    /// Plain bulk insert. Permits duplicates; kept for sources that never
    /// enforced key uniqueness.
    InsertMany,
}

/// Persist records into a collection, best effort per record.
///
/// Failures are logged and skipped rather than aborting the batch. In
/// upsert mode, records without a natural key fall back to a keyless
/// insert. Returns the number of records saved.
pub fn save_records(
    collection: &dyn DocumentStore,
    records: &[Record],
    mode: SinkMode,
) -> usize {
    if records.is_empty() {
        return 0;
    }

    let saved = match mode {
        SinkMode::InsertMany => {
            let docs: Vec<serde_json::Value> = records.iter().map(Record::to_document).collect();
            match collection.insert_many(&docs) {
                Ok(count) => count,
                Err(err) => {
                    error!("Failed to save records: {}", err);
                    0
                }
            }
        }
        SinkMode::Upsert => {
            let mut saved = 0;
            for record in records {
                let doc = record.to_document();
                let result = match record.natural_key() {
                    Some(key) => collection.upsert(key, &doc),
                    None => collection.insert_many(std::slice::from_ref(&doc)).map(|_| ()),
                };
                match result {
                    Ok(()) => saved += 1,
                    Err(err) => error!("Failed to save record: {}", err),
                }
            }
            saved
        }
    };

    info!("Saved {} of {} records", saved, records.len());
    saved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobRecord;

    fn job(url: Option<&str>, title: &str) -> Record {
        let mut job = JobRecord::new("Seek");
        job.url = url.map(String::from);
        job.title = Some(title.to_string());
        Record::from(job)
    }

    #[test]
    fn test_upsert_mode_deduplicates_reruns() {
        let jobs = SqliteStore::in_memory().unwrap().collection("jobs").unwrap();
        let batch = vec![
            job(Some("https://example.com/1"), "One"),
            job(Some("https://example.com/2"), "Two"),
        ];

        assert_eq!(save_records(&jobs, &batch, SinkMode::Upsert), 2);
        assert_eq!(save_records(&jobs, &batch, SinkMode::Upsert), 2);
        assert_eq!(jobs.count().unwrap(), 2);
    }

    #[test]
    fn test_upsert_mode_inserts_keyless_records() {
        let jobs = SqliteStore::in_memory().unwrap().collection("jobs").unwrap();
        let batch = vec![job(None, "No Link"), job(None, "No Link")];
        assert_eq!(save_records(&jobs, &batch, SinkMode::Upsert), 2);
        assert_eq!(jobs.count().unwrap(), 2);
    }

    #[test]
    fn test_insert_many_mode_duplicates() {
        let jobs = SqliteStore::in_memory().unwrap().collection("jobs").unwrap();
        let batch = vec![job(Some("https://example.com/1"), "One")];
        save_records(&jobs, &batch, SinkMode::InsertMany);
        save_records(&jobs, &batch, SinkMode::InsertMany);
        assert_eq!(jobs.count().unwrap(), 2);
    }

    #[test]
    fn test_empty_batch_saves_nothing() {
        let jobs = SqliteStore::in_memory().unwrap().collection("jobs").unwrap();
        assert_eq!(save_records(&jobs, &[], SinkMode::Upsert), 0);
        assert_eq!(jobs.count().unwrap(), 0);
    }
}
