//! # Storage Layer
//!
//! Persistence for aidocs: a content store that owns document bodies and
//! history, and a metadata index that mirrors it for listing and search.
//!
//! ## Backends
//!
//! | Backend | Content | History | Location |
//! |---------|---------|---------|----------|
//! | `git` (default) | Markdown + YAML frontmatter | git commits | `.aidocs/docs/a/b/c.md` |
//! | `sqlite` | `documents` table | `revisions` table | `.aidocs/content.db` |
//!
//! The index is always SQLite at `.aidocs/.cache/index.db` and is rebuilt
//! from the content store whenever it falls behind.
//!
//! ## Concurrency Safety
//!
//! - Writers lock the document name (`fs2`) in `.aidocs/locks/`
//! - File writes are atomic (temp file + rename)
//! - git and hook processes run with a timeout
//!
//! ## Project Structure
//!
//! ```text
//! .aidocs/
//! ├── docs/                 # Document files (git backend)
//! │   └── auth/
//! │       └── jwt.md        # auth.jwt
//! ├── content.db            # Documents and revisions (sqlite backend)
//! ├── .git/                 # History (git backend)
//! ├── .cache/index.db       # Metadata index (regenerated)
//! ├── locks/                # Per-document write locks
//! ├── config.toml           # Project configuration
//! └── .gitignore
//! ```
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for accessing an aidocs project
//! - [`DocStore`] - Every document operation
//! - [`ContentStore`] - Backend contract, implemented by [`MarkdownStore`]
//!   and [`SqliteStore`]
//! - [`MetadataIndex`] - SQLite index of document metadata
//! - [`Config`] - Project and global configuration

mod config;
mod content;
mod docs;
mod git;
mod hooks;
mod index;
mod lock;
mod markdown;
mod process;
mod project;
mod sqlite;

pub use config::{
    BackendKind, Config, ConfigError, GitConfig, HooksConfig, OutputFormat, ProjectConfig,
    SearchConfig,
};
pub use content::{ContentStore, PutOutcome};
pub use docs::{DocStore, Drift, DriftKind, Rationale, WriteOutcome};
pub use git::{GitError, GitRepo};
pub use hooks::{HookEvent, Hooks};
pub use index::{IndexError, IndexStats, MetadataIndex};
pub use lock::NameLock;
pub use markdown::MarkdownStore;
pub use process::ProcessError;
pub use project::{Project, ProjectError};
pub use sqlite::SqliteStore;
