//! SQLite metadata index for fast listing and search
//!
//! The index sits in `.aidocs/.cache/index.db` and mirrors the metadata of
//! every document in the content store (no bodies). It can always be rebuilt
//! from the content store, so it is never the source of truth.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{DocName, DocSummary};

/// Number of documents reported as recent by [`MetadataIndex::stats`]
pub const RECENT_DOCS: usize = 5;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index row for '{name}' is invalid: {reason}")]
    InvalidRow { name: String, reason: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Aggregate counts over the index
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub total_docs: usize,

    /// Sum of the versions of all documents
    pub total_revisions: u64,

    /// Most recently updated documents, newest first
    pub recent_docs: Vec<DocSummary>,
}

/// SQLite-backed metadata index
pub struct MetadataIndex {
    /// Path to the SQLite database

    /// Database connection
    conn: Connection,
}

type RawRow = (String, String, i64, String, String);

impl MetadataIndex {
    /// Schema version - bump when schema changes to force rebuild
    const SCHEMA_VERSION: i32 = 1;

    /// Creates or opens the index under an `.aidocs` directory
    pub fn open(aidocs_dir: &Path) -> Result<Self> {
        let cache_dir = aidocs_dir.join(".cache");
        let db_path = cache_dir.join("index.db");

        fs::create_dir_all(&cache_dir).with_context(|| {
            format!("Failed to create cache directory: {}", cache_dir.display())
        })?;

        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open index database: {}", db_path.display()))?;

        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let mut index = Self { conn };
        index.ensure_schema()?;

        Ok(index)
    }

    /// Ensures the schema is up to date
    fn ensure_schema(&mut self) -> Result<()> {
        if self.schema_version()? != Self::SCHEMA_VERSION {
            self.create_schema()?;
        }
        Ok(())
    }

    fn schema_version(&self) -> Result<i32> {
        let result: Option<i32> = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .optional()?;

        Ok(result.unwrap_or(0))
    }

    /// Creates the schema from scratch, discarding any previous rows
    fn create_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "
            DROP TABLE IF EXISTS docs;
            DROP TABLE IF EXISTS index_meta;

            CREATE TABLE docs (
                name TEXT PRIMARY KEY,
                description TEXT NOT NULL,
                version INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX idx_docs_updated ON docs(updated_at);
            ",
        )?;

        self.conn.execute(
            &format!("PRAGMA user_version = {}", Self::SCHEMA_VERSION),
            [],
        )?;

        Ok(())
    }

    pub fn exists(&self, name: &DocName) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM docs WHERE name = ?1",
                params![name.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(found.is_some())
    }

    pub fn get(&self, name: &DocName) -> Result<Option<DocSummary>> {
        let row: Option<RawRow> = self
            .conn
            .query_row(
                "SELECT name, description, version, created_at, updated_at
                 FROM docs WHERE name = ?1",
                params![name.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;

        Ok(row.map(summary_from_row).transpose()?)
    }

    /// Inserts or refreshes the row for a document
    pub fn upsert(&self, doc: &DocSummary) -> Result<()> {
        self.conn.execute(
            "INSERT INTO docs (name, description, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(name) DO UPDATE SET
                description = excluded.description,
                version = excluded.version,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at",
            params![
                doc.name.as_str(),
                doc.description,
                doc.version,
                timestamp_text(&doc.created_at),
                timestamp_text(&doc.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Removes the row for a document, returning false if there was none
    pub fn remove(&self, name: &DocName) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM docs WHERE name = ?1", params![name.as_str()])?;
        Ok(removed > 0)
    }

    /// All documents ordered by name ascending
    pub fn list(&self) -> Result<Vec<DocSummary>> {
        self.query_summaries(
            "SELECT name, description, version, created_at, updated_at
             FROM docs ORDER BY name ASC",
        )
    }

    /// All indexed names, ascending
    pub fn names(&self) -> Result<Vec<DocName>> {
        Ok(self.list()?.into_iter().map(|d| d.name).collect())
    }

    pub fn is_empty(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM docs", [], |row| row.get(0))?;
        Ok(count == 0)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let (total_docs, total_revisions): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(version), 0) FROM docs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let recent_docs = self.query_summaries(&format!(
            "SELECT name, description, version, created_at, updated_at
             FROM docs ORDER BY updated_at DESC, name ASC LIMIT {}",
            RECENT_DOCS
        ))?;

        Ok(IndexStats {
            total_docs: total_docs as usize,
            total_revisions: total_revisions as u64,
            recent_docs,
        })
    }

    /// Replaces every row with `docs` and marks the index as synced
    pub fn rebuild(&mut self, docs: &[DocSummary]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM docs", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO docs (name, description, version, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;

            for doc in docs {
                stmt.execute(params![
                    doc.name.as_str(),
                    doc.description,
                    doc.version,
                    timestamp_text(&doc.created_at),
                    timestamp_text(&doc.updated_at),
                ])?;
            }
        }

        tx.commit()?;
        self.mark_synced()
    }

    /// When the index last matched the content store, if ever
    pub fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = 'last_sync'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc)))
    }

    /// Records that the index matches the content store as of now
    pub fn mark_synced(&self) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO index_meta (key, value) VALUES ('last_sync', ?1)",
            params![timestamp_text(&Utc::now())],
        )?;
        Ok(())
    }

    fn query_summaries(&self, sql: &str) -> Result<Vec<DocSummary>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows: Vec<RawRow> = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .map(summary_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering
fn timestamp_text(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn summary_from_row(row: RawRow) -> Result<DocSummary, IndexError> {
    let (name, description, version, created_at, updated_at) = row;
    let invalid = |reason: String| IndexError::InvalidRow {
        name: name.clone(),
        reason,
    };

    let timestamp = |s: &str| {
        DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| invalid(format!("bad timestamp '{}': {}", s, e)))
    };

    Ok(DocSummary {
        name: DocName::parse(&name).map_err(|e| invalid(e.to_string()))?,
        description,
        version: u32::try_from(version).map_err(|_| invalid(format!("bad version {}", version)))?,
        created_at: timestamp(&created_at)?,
        updated_at: timestamp(&updated_at)?,
    })
}
