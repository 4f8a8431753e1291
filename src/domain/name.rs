//! Hierarchical document names
//!
//! Name format: lowercase dot-delimited segments, e.g. `auth.jwt.middleware`.
//!
//! - Lowercase letters, digits, dots and hyphens only
//! - Must start with a letter and end with a letter or digit
//! - No consecutive dots
//!
//! The dots only imply a display hierarchy: `auth.jwt` has the virtual parent
//! `auth`, which does not have to exist as a document.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum NameError {
    #[error("Invalid name '{0}'. Use lowercase with dots for hierarchy: 'auth.jwt.middleware'")]
    Invalid(String),
}

/// Returns true if `name` satisfies the document name grammar
pub fn is_valid_name(name: &str) -> bool {
    let bytes = name.as_bytes();

    let Some((&first, rest)) = bytes.split_first() else {
        return false;
    };

    if !first.is_ascii_lowercase() {
        return false;
    }

    if let Some(&last) = rest.last() {
        if !(last.is_ascii_lowercase() || last.is_ascii_digit()) {
            return false;
        }
    }

    let allowed = |c: &u8| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == b'.' || *c == b'-';
    if !rest.iter().all(allowed) {
        return false;
    }

    !name.contains("..")
}

/// Returns the name before the last dot, if any
pub fn parent_name(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(parent, _)| parent)
}

/// A validated document name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocName(String);

impl DocName {
    /// Validates and wraps a name
    pub fn parse(name: &str) -> Result<Self, NameError> {
        if is_valid_name(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(NameError::Invalid(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Dot-delimited segments, root first
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// The virtual parent (`a.b.c` -> `a.b`)
    pub fn parent(&self) -> Option<DocName> {
        parent_name(&self.0).map(|p| Self(p.to_string()))
    }

    /// Deterministic file location relative to the docs directory
    ///
    /// `a.b.c` maps to `a/b/c.md`, `auth` maps to `auth.md`.
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.segments().collect();
        path.set_extension("md");
        path
    }
}

impl fmt::Display for DocName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DocName> for String {
    fn from(name: DocName) -> Self {
        name.0
    }
}

impl AsRef<str> for DocName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
