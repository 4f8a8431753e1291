//! Document domain model
//!
//! A document is a named markdown body with a one-line description. Every
//! content-affecting write produces a new revision, so `version` only grows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::name::{DocName, NameError};

#[derive(Debug, Error, PartialEq)]
pub enum DocError {
    #[error(transparent)]
    InvalidName(#[from] NameError),

    #[error("Description cannot be empty")]
    EmptyDescription,

    #[error("Content cannot be empty")]
    EmptyContent,

    #[error("Doc '{0}' not found")]
    NotFound(String),

    #[error("Doc '{0}' already exists. Use update to modify it.")]
    AlreadyExists(String),

    #[error("Doc '{0}' is being written by another process. Try again.")]
    Busy(String),
}

impl DocError {
    /// Returns true for errors the caller fixes by correcting input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DocError::InvalidName(_) | DocError::EmptyDescription | DocError::EmptyContent
        )
    }
}

/// A stored documentation artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: DocName,

    /// Current revision number, starting at 1
    pub version: u32,

    /// Short summary used for listing and search
    pub description: String,

    /// Markdown body
    pub content: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a first-revision document, rejecting empty fields
    pub fn new(
        name: DocName,
        description: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self, DocError> {
        let description = description.into();
        let content = content.into();
        validate_fields(&description, &content)?;

        let now = Utc::now();
        Ok(Self {
            name,
            version: 1,
            description,
            content,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces description and content, bumping the version
    ///
    /// `updated_at` never moves backwards even if the clock does.
    pub fn revise(
        &mut self,
        description: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), DocError> {
        let description = description.into();
        let content = content.into();
        validate_fields(&description, &content)?;

        self.description = description;
        self.content = content;
        self.version += 1;
        self.updated_at = Utc::now().max(self.updated_at);
        Ok(())
    }

    /// Returns the index projection of this document
    pub fn summary(&self) -> DocSummary {
        DocSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn validate_fields(description: &str, content: &str) -> Result<(), DocError> {
    if description.trim().is_empty() {
        return Err(DocError::EmptyDescription);
    }
    if content.trim().is_empty() {
        return Err(DocError::EmptyContent);
    }
    Ok(())
}

/// Metadata row kept by the index (no body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocSummary {
    pub name: DocName,
    pub description: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reference to a recorded revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRef {
    /// Backend-specific identifier (short commit hash or content hash)
    pub id: String,
    pub version: u32,
}

/// One entry of a document's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionMeta {
    pub id: String,
    pub version: u32,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
