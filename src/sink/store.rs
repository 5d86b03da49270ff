//! Document collection over SQLite.
//!
//! Records are stored as JSON documents in a two-column table: an optional
//! unique natural key and the document body. Upserts match on the key;
//! keyless inserts are allowed and permit duplicates, mirroring the
//! insert-many mode some sources use.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

/// Error from the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("document serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// The five operations the pipeline needs from a document collection.
pub trait DocumentStore {
    /// Insert the document, or replace the existing one with the same key.
    fn upsert(&self, key: &str, doc: &Value) -> Result<(), StoreError>;
    /// Insert documents without key matching. Permits duplicates.
    fn insert_many(&self, docs: &[Value]) -> Result<usize, StoreError>;
    fn count(&self) -> Result<u64, StoreError>;
    /// Documents whose top-level fields equal every entry in `filter`,
    /// optionally projected down to the named fields.
    fn find(
        &self,
        filter: &Value,
        projection: Option<&[&str]>,
        limit: usize,
    ) -> Result<Vec<Value>, StoreError>;
    fn create_index(&self, field: &str) -> Result<(), StoreError>;
}

/// SQLite-backed store; one database file, one table per collection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent
    /// directories on demand.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        info!("Opened document store at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store, used by tests and dry runs.
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        })
    }

    /// Open a named collection, creating its table if needed.
    pub fn collection(&self, name: &str) -> Result<SqliteCollection, StoreError> {
        validate_identifier(name)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    key TEXT UNIQUE,
                    doc TEXT NOT NULL
                )",
                name
            ),
            [],
        )?;
        drop(conn);
        Ok(SqliteCollection {
            conn: Arc::clone(&self.conn),
            name: name.to_string(),
        })
    }
}

/// One document collection inside a [`SqliteStore`].
#[derive(Clone)]
pub struct SqliteCollection {
    conn: Arc<Mutex<Connection>>,
    name: String,
}

impl SqliteCollection {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl DocumentStore for SqliteCollection {
    fn upsert(&self, key: &str, doc: &Value) -> Result<(), StoreError> {
        let body = serde_json::to_string(doc)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (key, doc) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET doc = excluded.doc",
                self.name
            ),
            params![key, body],
        )?;
        Ok(())
    }

    fn insert_many(&self, docs: &[Value]) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare(&format!("INSERT INTO {} (key, doc) VALUES (NULL, ?1)", self.name))?;
            for doc in docs {
                stmt.execute(params![serde_json::to_string(doc)?])?;
            }
        }
        tx.commit()?;
        Ok(docs.len())
    }

    fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", self.name), [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }

    fn find(
        &self,
        filter: &Value,
        projection: Option<&[&str]>,
        limit: usize,
    ) -> Result<Vec<Value>, StoreError> {
        let mut sql = format!("SELECT doc FROM {}", self.name);
        let mut bindings: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(fields) = filter.as_object() {
            let mut clauses = Vec::new();
            for (field, value) in fields {
                validate_identifier(field)?;
                match value {
                    Value::Null => clauses.push(format!(
                        "json_extract(doc, '$.{}') IS NULL",
                        field
                    )),
                    other => {
                        clauses.push(format!("json_extract(doc, '$.{}') = ?", field));
                        bindings.push(json_to_sql(other));
                    }
                }
            }
            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
        }
        sql.push_str(" ORDER BY id");
        sql.push_str(&format!(" LIMIT {}", limit));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(bindings.iter()), |row| {
            row.get::<_, String>(0)
        })?;

        let mut docs = Vec::new();
        for row in rows {
            let doc: Value = serde_json::from_str(&row?)?;
            docs.push(project(doc, projection));
        }
        Ok(docs)
    }

    fn create_index(&self, field: &str) -> Result<(), StoreError> {
        validate_identifier(field)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {} (json_extract(doc, '$.{}'))",
                self.name, field, self.name, field
            ),
            [],
        )?;
        Ok(())
    }
}

/// Collection and field names are interpolated into SQL, so restrict them
/// to identifier characters.
fn validate_identifier(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// json_extract yields text for JSON strings, integers for booleans and
/// whole numbers, reals otherwise; bind the filter value with the matching
/// SQLite type so comparisons don't fall into type mismatches.
fn json_to_sql(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Bool(b) => Sql::Integer(*b as i64),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Sql::Integer(i)
            } else {
                Sql::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => Sql::Text(s.clone()),
        other => Sql::Text(other.to_string()),
    }
}

fn project(doc: Value, projection: Option<&[&str]>) -> Value {
    let Some(fields) = projection else {
        return doc;
    };
    match doc {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| fields.contains(&key.as_str()))
                .collect(),
        ),
        other => other,
    }
}
