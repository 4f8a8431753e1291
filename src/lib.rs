//! aidocs - A local, versioned documentation store for software projects
//!
//! Documents are named markdown bodies with a description, addressed by
//! dot-delimited names (`auth.jwt.middleware`). Every write records a
//! revision, either as a git commit of the document's file or as a row in
//! a SQLite database. A SQLite metadata index answers listing and search.

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{DocError, DocName, DocSummary, Document, RevisionMeta, SearchHit};
pub use storage::{DocStore, Project};
