//! Document store
//!
//! Entry point for every document operation. Writes go to the content store
//! first and the metadata index last, so an interrupted write leaves at worst
//! an index that is behind. Reads that use the index check it against the
//! content store and rebuild it when it has fallen behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::config::SearchConfig;
use super::content::ContentStore;
use super::hooks::{HookEvent, Hooks};
use super::index::{IndexStats, MetadataIndex};
use super::lock::NameLock;
use crate::domain::sections::{self, DEFAULT_APPEND_SECTION};
use crate::domain::search::rank;
use crate::domain::{
    DocError, DocName, DocSummary, Document, Query, RevisionMeta, RevisionRef, SearchHit,
};

/// Lines of decisions shown per document by [`DocStore::why`]
const WHY_MAX_LINES: usize = 10;

/// Result of a create or update
#[derive(Debug, Clone, Serialize)]
pub struct WriteOutcome {
    #[serde(flatten)]
    pub doc: Document,

    /// None when the content was written but its revision was not recorded
    pub revision: Option<RevisionRef>,
}

/// Disagreement between the index and the content store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drift {
    pub name: DocName,
    pub kind: DriftKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    /// In the content store but not in the index
    NotIndexed,
    /// In the index but not in the content store
    Orphaned,
    /// Indexed metadata differs from the content store
    Stale,
    /// Current content has no recorded revision
    Unrecorded,
}

impl DriftKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftKind::NotIndexed => "not indexed",
            DriftKind::Orphaned => "orphaned index entry",
            DriftKind::Stale => "stale index entry",
            DriftKind::Unrecorded => "revision not recorded",
        }
    }
}

/// Decisions recorded in a document matching a `why` query
#[derive(Debug, Clone, Serialize)]
pub struct Rationale {
    pub name: DocName,
    pub description: String,
    pub decisions: Vec<String>,
}

/// Documents of one project: content store, index, locks and hooks
pub struct DocStore {
    content: Box<dyn ContentStore>,
    index: MetadataIndex,
    locks_dir: PathBuf,
    hooks: Hooks,
    search: SearchConfig,
}

impl DocStore {
    pub fn new(
        content: Box<dyn ContentStore>,
        index: MetadataIndex,
        locks_dir: &Path,
        hooks: Hooks,
        search: SearchConfig,
    ) -> Self {
        Self {
            content,
            index,
            locks_dir: locks_dir.to_path_buf(),
            hooks,
            search,
        }
    }

    /// The content store behind this document store
    pub fn content(&self) -> &dyn ContentStore {
        self.content.as_ref()
    }

    /// Creates a document at version 1
    pub fn create(&mut self, name: &str, description: &str, content: &str) -> Result<WriteOutcome> {
        let name = DocName::parse(name).map_err(DocError::from)?;
        let mut doc = Document::new(name.clone(), description, content)?;

        self.ensure_fresh()?;
        let lock = NameLock::acquire(&self.locks_dir, &name)?;

        if self.index.exists(&name)? || self.content.get(&name)?.is_some() {
            return Err(DocError::AlreadyExists(name.to_string()).into());
        }

        let message = format!("Create {}: {}", name, doc.description);
        let outcome = self
            .content
            .put(&doc, &message)
            .with_context(|| format!("Failed to store {}", name))?;
        doc.version = outcome.version.max(1);

        self.index_write(&doc)?;
        drop(lock);

        info!(op = "create", name = %name, version = doc.version, "created doc");
        self.hooks.fire(HookEvent::Create, &name);

        Ok(WriteOutcome {
            doc,
            revision: outcome.revision,
        })
    }

    /// Current state of a document
    pub fn read(&self, name: &str) -> Result<Option<Document>> {
        let name = DocName::parse(name).map_err(DocError::from)?;
        self.content
            .get(&name)
            .with_context(|| format!("Failed to read {}", name))
    }

    /// Replaces the content of an existing document
    ///
    /// The description is kept when `description` is None.
    pub fn update(
        &mut self,
        name: &str,
        description: Option<&str>,
        content: &str,
        message: Option<&str>,
    ) -> Result<WriteOutcome> {
        let name = DocName::parse(name).map_err(DocError::from)?;
        self.ensure_fresh()?;
        let lock = NameLock::acquire(&self.locks_dir, &name)?;

        let mut doc = self
            .content
            .get(&name)?
            .ok_or_else(|| DocError::NotFound(name.to_string()))?;

        let description = description.unwrap_or(&doc.description).to_string();
        doc.revise(description, content)?;

        let message = format!("{}: {}", name, message.unwrap_or("Updated"));
        let outcome = self
            .content
            .put(&doc, &message)
            .with_context(|| format!("Failed to store {}", name))?;
        doc.version = outcome.version.max(1);

        self.index_write(&doc)?;
        drop(lock);

        info!(op = "update", name = %name, version = doc.version, "updated doc");
        self.hooks.fire(HookEvent::Update, &name);

        Ok(WriteOutcome {
            doc,
            revision: outcome.revision,
        })
    }

    /// Adds a bullet under a section of an existing document
    pub fn append(&mut self, name: &str, text: &str, section: Option<&str>) -> Result<WriteOutcome> {
        let current = self.require(name)?;
        let section = section.unwrap_or(DEFAULT_APPEND_SECTION);

        let content = sections::append_to_section(&current.content, section, text);
        let message = format!("Appended to {}", section);
        self.update(name, None, &content, Some(&message))
    }

    /// Records a decision with its rationale in an existing document
    pub fn decide(&mut self, name: &str, decision: &str, rationale: &str) -> Result<WriteOutcome> {
        let current = self.require(name)?;

        let content = sections::record_decision(
            &current.content,
            decision,
            rationale,
            Utc::now().date_naive(),
        );
        let message = format!("Decision: {}", decision);
        self.update(name, None, &content, Some(&message))
    }

    /// All documents ordered by name
    pub fn list(&mut self) -> Result<Vec<DocSummary>> {
        self.ensure_fresh()?;
        self.index.list()
    }

    /// Ranked search over names and descriptions (and bodies when enabled)
    pub fn search(&mut self, query: &str, limit: Option<usize>) -> Result<Vec<SearchHit>> {
        let query = Query::parse(query);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        self.ensure_fresh()?;
        let candidates = self.index.list()?;
        let limit = limit.unwrap_or(self.search.default_limit);
        let content = &self.content;

        let hits = rank(&query, candidates, self.search.scope(), limit, |doc| {
            match content.get(&doc.name) {
                Ok(found) => found.map(|d| d.content),
                Err(e) => {
                    warn!(name = %doc.name, error = %format!("{:#}", e), "could not load doc for search");
                    None
                }
            }
        });

        debug!(op = "search", terms = query.terms().len(), hits = hits.len(), "searched docs");
        Ok(hits)
    }

    /// Decisions recorded in the documents matching `query`
    pub fn why(&mut self, query: &str) -> Result<Vec<Rationale>> {
        let mut rationales = Vec::new();

        for hit in self.search(query, None)? {
            let Some(doc) = self.content.get(&hit.doc.name)? else {
                continue;
            };
            let decisions = sections::extract_decisions(&doc.content, WHY_MAX_LINES);
            if !decisions.is_empty() {
                rationales.push(Rationale {
                    name: doc.name,
                    description: doc.description,
                    decisions,
                });
            }
        }

        Ok(rationales)
    }

    /// Revisions of a document, newest first
    pub fn history(&self, name: &str, limit: usize) -> Result<Vec<RevisionMeta>> {
        let name = DocName::parse(name).map_err(DocError::from)?;
        self.content
            .history(&name, limit)
            .with_context(|| format!("Failed to read history of {}", name))
    }

    /// Deletes a document, returning false if it did not exist
    pub fn delete(&mut self, name: &str) -> Result<bool> {
        let name = DocName::parse(name).map_err(DocError::from)?;
        let lock = NameLock::acquire(&self.locks_dir, &name)?;

        let removed_content = self
            .content
            .delete(&name)
            .with_context(|| format!("Failed to delete {}", name))?;
        let removed_row = self.index.remove(&name)?;
        if removed_content {
            self.index.mark_synced()?;
        }
        lock.remove();

        let deleted = removed_content || removed_row;
        if deleted {
            info!(op = "delete", name = %name, "deleted doc");
            self.hooks.fire(HookEvent::Delete, &name);
        }

        Ok(deleted)
    }

    /// Counts and recent documents
    pub fn stats(&mut self) -> Result<IndexStats> {
        self.ensure_fresh()?;
        self.index.stats()
    }

    /// File backing a document, for backends with one file per document
    pub fn path_for(&self, name: &str) -> Result<Option<PathBuf>> {
        let name = DocName::parse(name).map_err(DocError::from)?;
        Ok(self.content.path_for(&name))
    }

    /// Rebuilds the index from the content store
    pub fn reindex(&mut self) -> Result<usize> {
        let docs = self
            .content
            .scan()
            .context("Failed to scan content store")?;
        let summaries: Vec<DocSummary> = docs.iter().map(Document::summary).collect();

        self.index.rebuild(&summaries)?;
        info!(op = "reindex", docs = summaries.len(), "rebuilt index");
        Ok(summaries.len())
    }

    /// Compares the index with the content store without changing either
    pub fn check(&self) -> Result<Vec<Drift>> {
        let docs = self
            .content
            .scan()
            .context("Failed to scan content store")?;
        let indexed = self.index.list()?;
        let mut drift = Vec::new();

        for doc in &docs {
            match indexed.iter().find(|row| row.name == doc.name) {
                None => drift.push(Drift {
                    name: doc.name.clone(),
                    kind: DriftKind::NotIndexed,
                }),
                Some(row) if *row != doc.summary() => drift.push(Drift {
                    name: doc.name.clone(),
                    kind: DriftKind::Stale,
                }),
                Some(_) => {}
            }
        }

        for row in &indexed {
            if !docs.iter().any(|doc| doc.name == row.name) {
                drift.push(Drift {
                    name: row.name.clone(),
                    kind: DriftKind::Orphaned,
                });
            }
        }

        for name in self.content.unrecorded()? {
            drift.push(Drift {
                name,
                kind: DriftKind::Unrecorded,
            });
        }

        drift.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(drift)
    }

    /// Rebuilds the index if the content store changed behind its back
    pub fn ensure_fresh(&mut self) -> Result<()> {
        if self.is_stale()? {
            debug!("index is behind the content store");
            self.reindex()?;
        }
        Ok(())
    }

    fn is_stale(&self) -> Result<bool> {
        let Some(last_sync) = self.index.last_sync()? else {
            return Ok(true);
        };

        if self.content.changed_since(last_sync)? {
            return Ok(true);
        }

        Ok(self.index.names()? != self.content.names()?)
    }

    fn require(&self, name: &str) -> Result<Document> {
        self.read(name)?
            .ok_or_else(|| DocError::NotFound(name.to_string()).into())
    }

    /// Last step of create and update
    fn index_write(&self, doc: &Document) -> Result<()> {
        self.index
            .upsert(&doc.summary())
            .with_context(|| format!("Stored {} but failed to update the index", doc.name))?;
        self.index.mark_synced()
    }
}
