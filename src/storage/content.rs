//! Content store contract
//!
//! The content store owns document bodies and their history. The metadata
//! index only mirrors what a content store reports, so every backend must be
//! able to enumerate its documents for a rebuild.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::config::BackendKind;
use crate::domain::{DocName, Document, RevisionMeta, RevisionRef};

/// Result of writing a document
#[derive(Debug, Clone, PartialEq)]
pub struct PutOutcome {
    /// The recorded revision, or None if the content was written but the
    /// revision could not be recorded
    pub revision: Option<RevisionRef>,

    /// Version derived from the backend after the write
    pub version: u32,
}

/// Durable, history-preserving storage of documents
pub trait ContentStore {
    /// Which backend this is
    fn kind(&self) -> BackendKind;

    /// Writes `doc` as the current state of its name, then records a revision
    ///
    /// Readers never observe a partially written document. If recording the
    /// revision fails the new content stays visible and the outcome carries
    /// no revision.
    fn put(&self, doc: &Document, message: &str) -> Result<PutOutcome>;

    /// Current state of a document, with its derived version
    fn get(&self, name: &DocName) -> Result<Option<Document>>;

    /// Revisions newest first, at most `limit`
    fn history(&self, name: &DocName, limit: usize) -> Result<Vec<RevisionMeta>>;

    /// Number of recorded revisions of the current document
    fn revision_count(&self, name: &DocName) -> Result<u32>;

    /// Removes the current document, returning false if it did not exist
    fn delete(&self, name: &DocName) -> Result<bool>;

    /// Names of every current document, ascending
    fn names(&self) -> Result<Vec<DocName>>;

    /// Every current document (used to rebuild the index)
    fn scan(&self) -> Result<Vec<Document>>;

    /// Names whose current state has no recorded revision
    fn unrecorded(&self) -> Result<Vec<DocName>>;

    /// Whether documents changed after `since` without going through the store
    fn changed_since(&self, since: DateTime<Utc>) -> Result<bool>;

    /// File backing a document, for backends that keep one file per document
    fn path_for(&self, name: &DocName) -> Option<PathBuf>;
}
