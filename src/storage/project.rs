//! Project management
//!
//! A project is a directory containing `.aidocs/`. The root is always
//! resolved by the caller and passed in; nothing here reads the current
//! directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::debug;

use super::config::{BackendKind, Config};
use super::content::ContentStore;
use super::docs::DocStore;
use super::hooks::Hooks;
use super::index::MetadataIndex;
use super::markdown::MarkdownStore;
use super::sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in an aidocs project. Run 'aidocs init' first.")]
    NotInProject,

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// An aidocs project
pub struct Project {
    root: PathBuf,
    config: Config,
    backend_override: Option<BackendKind>,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(".aidocs").is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self {
            root,
            config,
            backend_override: None,
        })
    }

    /// Opens the project containing `start`, walking upward
    pub fn discover(start: &Path) -> Result<Self> {
        let root = Config::find_project_root(start).ok_or(ProjectError::NotInProject)?;
        Self::open(root)
    }

    /// Initializes a new project at the given path
    ///
    /// Existing files are left alone, so running init twice is harmless.
    pub fn init(root: impl Into<PathBuf>, backend: BackendKind) -> Result<Self> {
        let root = root.into();
        if root.exists() && !root.is_dir() {
            return Err(ProjectError::NotADirectory(root).into());
        }

        let aidocs_dir = root.join(".aidocs");
        for dir in [
            aidocs_dir.clone(),
            aidocs_dir.join("locks"),
            aidocs_dir.join(".cache"),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }

        let config_path = aidocs_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, default_config(backend))
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        } else {
            debug!(path = %config_path.display(), "keeping existing config");
        }

        let gitignore_path = aidocs_dir.join(".gitignore");
        if !gitignore_path.exists() {
            let gitignore = "# Index is rebuilt from the docs
.cache/

# Per-document write locks
locks/

# Interrupted writes
*.md.tmp
";
            fs::write(&gitignore_path, gitignore).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        let project = Self::open(root)?;
        match project.backend() {
            BackendKind::Git => {
                MarkdownStore::for_project(&project.root, &project.config.project.git).init()?
            }
            BackendKind::Sqlite => {
                SqliteStore::open(&project.aidocs_dir())?;
            }
        }

        Ok(project)
    }

    /// Uses `backend` instead of the configured one, when given
    pub fn with_backend(mut self, backend: Option<BackendKind>) -> Self {
        self.backend_override = backend;
        self
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .aidocs directory path
    pub fn aidocs_dir(&self) -> PathBuf {
        self.root.join(".aidocs")
    }

    /// Returns the directory of document files (git backend)
    pub fn docs_dir(&self) -> PathBuf {
        self.aidocs_dir().join("docs")
    }

    /// Returns the directory of per-document lock files
    pub fn locks_dir(&self) -> PathBuf {
        self.aidocs_dir().join("locks")
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The content backend in effect
    pub fn backend(&self) -> BackendKind {
        self.backend_override.unwrap_or(self.config.project.backend)
    }

    /// Opens the content store for the backend in effect
    pub fn content_store(&self) -> Result<Box<dyn ContentStore>> {
        Ok(match self.backend() {
            BackendKind::Git => Box::new(MarkdownStore::for_project(
                &self.root,
                &self.config.project.git,
            )),
            BackendKind::Sqlite => Box::new(SqliteStore::open(&self.aidocs_dir())?),
        })
    }

    /// Opens the metadata index for this project
    pub fn index(&self) -> Result<MetadataIndex> {
        MetadataIndex::open(&self.aidocs_dir())
    }

    /// Opens the document store
    pub fn docs(&self) -> Result<DocStore> {
        let hooks = Hooks::new(self.config.project.hooks.clone(), &self.root);

        Ok(DocStore::new(
            self.content_store()?,
            self.index()?,
            &self.locks_dir(),
            hooks,
            self.config.project.search.clone(),
        ))
    }
}

fn default_config(backend: BackendKind) -> String {
    format!(
        r#"# aidocs configuration

# Where document content and history live: "git" or "sqlite"
backend = "{}"

[search]
# Also match document bodies (slower)
include_content = false
default_limit = 10

[git]
timeout_secs = 5
# Append the project's commit@branch to each revision message
record_project_ref = true

[hooks]
# Shell commands run after changes, with AIDOCS_EVENT and AIDOCS_DOC set
# post_write = ""
# post_delete = ""
"#,
        backend.as_str()
    )
}
