//! Domain models for aidocs
//!
//! Contains the document model, search ranking and the hierarchy view,
//! without any I/O concerns.

mod name;
mod doc;
pub mod search;
pub mod hierarchy;
pub mod sections;

pub use name::{is_valid_name, parent_name, DocName, NameError};
pub use doc::{DocError, DocSummary, Document, RevisionMeta, RevisionRef};
pub use search::{Query, SearchHit, SearchScope};
