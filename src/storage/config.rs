//! Configuration handling for aidocs
//!
//! Configuration is stored in `.aidocs/config.toml` (project) and
//! `~/.config/aidocs/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::search::DEFAULT_LIMIT;
use crate::domain::SearchScope;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Where document bodies and history live
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Markdown files under `.aidocs/docs/`, history in a git repository
    #[default]
    Git,
    /// Content and revisions inline in `.aidocs/content.db`
    Sqlite,
}

impl BackendKind {
    pub fn as_str(&self) -> &str {
        match self {
            BackendKind::Git => "git",
            BackendKind::Sqlite => "sqlite",
        }
    }
}

/// Search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Also match and score document bodies (loads every body per query)
    pub include_content: bool,

    /// Result limit when the caller does not pass one
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            include_content: false,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

impl SearchConfig {
    pub fn scope(&self) -> SearchScope {
        if self.include_content {
            SearchScope::IncludeContent
        } else {
            SearchScope::NameAndDescription
        }
    }
}

/// Git backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Deadline for each git invocation
    pub timeout_secs: u64,

    /// Append the enclosing project's `hash@branch` to commit messages
    pub record_project_ref: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            record_project_ref: true,
        }
    }
}

impl GitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Commands run after document mutations
///
/// Each command runs through `sh -c` with `AIDOCS_EVENT` and `AIDOCS_DOC`
/// set. Failures are logged and never undo the write.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct HooksConfig {
    /// Runs after create and update
    pub post_write: Option<String>,

    /// Runs after delete
    pub post_delete: Option<String>,

    /// Deadline per hook, defaults to 5 seconds
    pub timeout_secs: Option<u64>,
}

impl HooksConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(5).max(1))
    }

    pub fn is_empty(&self) -> bool {
        self.post_write.is_none() && self.post_delete.is_none()
    }
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProjectConfig {
    /// Content store backend
    pub backend: BackendKind,

    /// Search settings
    pub search: SearchConfig,

    /// Git backend settings
    pub git: GitConfig,

    /// Post-mutation hooks
    pub hooks: HooksConfig,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
}

impl Config {
    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self { project, global })
    }

    /// Loads only the global configuration (outside any project)
    pub fn global_only() -> Result<Self> {
        Ok(Self {
            project: ProjectConfig::default(),
            global: Self::load_global()?,
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "aidocs", "aidocs").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = Self::project_config_path(project_root);

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")
    }

    fn project_config_path(project_root: &Path) -> PathBuf {
        project_root.join(".aidocs").join("config.toml")
    }

    /// Finds the project root by walking upward from `start` for `.aidocs/`
    pub fn find_project_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(".aidocs").is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = ProjectConfig::default();

        assert_eq!(config.backend, BackendKind::Git);
        assert!(!config.search.include_content);
        assert_eq!(config.search.default_limit, 10);
        assert_eq!(config.git.timeout(), Duration::from_secs(5));
        assert!(config.hooks.is_empty());
    }

    #[test]
    fn parse_project_config() {
        let toml = r#"
backend = "sqlite"

[search]
include_content = true

[hooks]
post_write = "echo $AIDOCS_DOC"
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.search.scope(), SearchScope::IncludeContent);
        assert_eq!(config.search.default_limit, 10);
        assert_eq!(config.hooks.post_write.as_deref(), Some("echo $AIDOCS_DOC"));
        assert_eq!(config.hooks.post_delete, None);
        assert!(config.git.record_project_ref);
    }

    #[test]
    fn unknown_hook_fields_are_rejected_by_type() {
        let toml = r#"
[hooks]
post_write = 42
"#;
        assert!(toml::from_str::<ProjectConfig>(toml).is_err());
    }

    #[test]
    fn parse_global_config() {
        let config: GlobalConfig = toml::from_str("default_format = \"json\"").unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
    }

    #[test]
    fn find_project_root_walks_upward() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".aidocs")).unwrap();

        let sub_dir = dir.path().join("sub").join("dir");
        fs::create_dir_all(&sub_dir).unwrap();

        let root = Config::find_project_root(&sub_dir);
        assert_eq!(root.as_deref(), Some(dir.path()));
    }

    #[test]
    fn find_project_root_none_outside_project() {
        let dir = TempDir::new().unwrap();
        let root = Config::find_project_root(dir.path());

        // A parent of the temp dir could be a project, but never the temp dir itself
        assert_ne!(root.as_deref(), Some(dir.path()));
    }

    #[test]
    fn for_project_reads_config_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".aidocs")).unwrap();
        fs::write(
            dir.path().join(".aidocs/config.toml"),
            "backend = \"sqlite\"\n[search]\ndefault_limit = 3\n",
        )
        .unwrap();

        let config = Config::for_project(dir.path()).unwrap();
        assert_eq!(config.project.backend, BackendKind::Sqlite);
        assert_eq!(config.project.search.default_limit, 3);
    }

    #[test]
    fn for_project_without_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::for_project(dir.path()).unwrap();
        assert_eq!(config.project.backend, BackendKind::Git);
    }
}
