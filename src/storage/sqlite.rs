//! Inline SQLite content store
//!
//! Content and every revision live in `.aidocs/content.db`. Each write is a
//! single transaction that replaces the current row and appends one revision,
//! so content and history can never disagree.
//!
//! Deleting a document deletes its revisions too; a recreated name starts
//! again at version 1.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::debug;

use super::config::BackendKind;
use super::content::{ContentStore, PutOutcome};
use crate::domain::{DocName, Document, RevisionMeta, RevisionRef};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Store for documents and revisions in one SQLite database
pub struct SqliteStore {
    db_path: PathBuf,
    conn: Connection,
}

impl SqliteStore {
    /// Schema version - bump when schema changes
    const SCHEMA_VERSION: i32 = 1;

    /// Creates or opens the content database under an `.aidocs` directory
    pub fn open(aidocs_dir: &Path) -> Result<Self> {
        let db_path = aidocs_dir.join("content.db");

        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open content database: {}", db_path.display()))?;

        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL; PRAGMA foreign_keys=ON;",
        )?;

        let store = Self { db_path, conn };
        store.ensure_schema()?;

        Ok(store)
    }

    /// Creates the tables if this is a new database
    ///
    /// Unlike the index, content is never dropped on a version mismatch.
    fn ensure_schema(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version == Self::SCHEMA_VERSION {
            return Ok(());
        }
        if version > Self::SCHEMA_VERSION {
            anyhow::bail!(
                "Content database {} has schema version {}, newer than supported {}",
                self.db_path.display(),
                version,
                Self::SCHEMA_VERSION
            );
        }

        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                name TEXT PRIMARY KEY,
                description TEXT NOT NULL,
                content TEXT NOT NULL,
                version INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS revisions (
                name TEXT NOT NULL REFERENCES documents(name) ON DELETE CASCADE,
                version INTEGER NOT NULL,
                id TEXT NOT NULL,
                description TEXT NOT NULL,
                content TEXT NOT NULL,
                message TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                PRIMARY KEY (name, version)
            );
            ",
        )?;

        self.conn.execute(
            &format!("PRAGMA user_version = {}", Self::SCHEMA_VERSION),
            [],
        )?;

        Ok(())
    }

    fn current_version(tx: &Transaction<'_>, name: &DocName) -> Result<u32> {
        let version: Option<u32> = tx
            .query_row(
                "SELECT version FROM documents WHERE name = ?1",
                params![name.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version.unwrap_or(0))
    }
}

impl ContentStore for SqliteStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn put(&self, doc: &Document, message: &str) -> Result<PutOutcome> {
        // IMMEDIATE takes the write lock up front so the version read below
        // cannot race another writer
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .context("Failed to begin content transaction")?;

        let version = Self::current_version(&tx, &doc.name)? + 1;
        let id = revision_id(&doc.name, version, doc.updated_at);

        tx.execute(
            "INSERT INTO documents (name, description, content, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(name) DO UPDATE SET
                description = excluded.description,
                content = excluded.content,
                version = excluded.version,
                updated_at = excluded.updated_at",
            params![
                doc.name.as_str(),
                doc.description,
                doc.content,
                version,
                timestamp_text(&doc.created_at),
                timestamp_text(&doc.updated_at),
            ],
        )?;

        tx.execute(
            "INSERT INTO revisions (name, version, id, description, content, message, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                doc.name.as_str(),
                version,
                id,
                doc.description,
                doc.content,
                message,
                timestamp_text(&doc.updated_at),
            ],
        )?;

        tx.commit().context("Failed to commit content transaction")?;
        debug!(name = %doc.name, version, id = %id, "stored doc row");

        Ok(PutOutcome {
            revision: Some(RevisionRef { id, version }),
            version,
        })
    }

    fn get(&self, name: &DocName) -> Result<Option<Document>> {
        let row: Option<(String, String, u32, String, String)> = self
            .conn
            .query_row(
                "SELECT description, content, version, created_at, updated_at
                 FROM documents WHERE name = ?1",
                params![name.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;

        let Some((description, content, version, created_at, updated_at)) = row else {
            return Ok(None);
        };

        Ok(Some(Document {
            name: name.clone(),
            version,
            description,
            content,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        }))
    }

    fn history(&self, name: &DocName, limit: usize) -> Result<Vec<RevisionMeta>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, version, message, timestamp FROM revisions
             WHERE name = ?1 ORDER BY version DESC LIMIT ?2",
        )?;

        let rows: Vec<(String, u32, String, String)> = stmt
            .query_map(params![name.as_str(), limit as i64], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, version, message, timestamp)| {
                Ok(RevisionMeta {
                    id,
                    version,
                    message,
                    timestamp: parse_timestamp(&timestamp)?,
                })
            })
            .collect()
    }

    fn revision_count(&self, name: &DocName) -> Result<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM revisions WHERE name = ?1",
            params![name.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn delete(&self, name: &DocName) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM documents WHERE name = ?1", params![name.as_str()])?;
        Ok(removed > 0)
    }

    fn names(&self) -> Result<Vec<DocName>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM documents ORDER BY name ASC")?;
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        names
            .iter()
            .map(|n| {
                DocName::parse(n)
                    .with_context(|| format!("Invalid name in content database: {}", n))
            })
            .collect()
    }

    fn scan(&self) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        for name in self.names()? {
            if let Some(doc) = self.get(&name)? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    fn unrecorded(&self) -> Result<Vec<DocName>> {
        // Content and revision rows are written in one transaction
        Ok(Vec::new())
    }

    fn changed_since(&self, since: DateTime<Utc>) -> Result<bool> {
        let latest: Option<String> = self.conn.query_row(
            "SELECT MAX(updated_at) FROM documents",
            [],
            |row| row.get(0),
        )?;

        match latest {
            Some(latest) => Ok(parse_timestamp(&latest)? > since),
            None => Ok(false),
        }
    }

    fn path_for(&self, _name: &DocName) -> Option<PathBuf> {
        None
    }
}

/// Short revision id from name, version and timestamp
fn revision_id(name: &DocName, version: u32, timestamp: DateTime<Utc>) -> String {
    let input = format!(
        "{}{}{}",
        name,
        version,
        timestamp.timestamp_nanos_opt().unwrap_or(0)
    );
    let hash = blake3::hash(input.as_bytes());
    hash.to_hex()[..7].to_string()
}

fn timestamp_text(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp in content database: {}", s))?
        .with_timezone(&Utc))
}
