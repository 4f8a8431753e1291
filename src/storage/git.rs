//! Git repository used as the revision log for document files
//!
//! `.aidocs/` is its own git repository, separate from the project's. Every
//! document write is one commit touching one file, so the history of a
//! document is the git log of its path.
//!
//! A name that is deleted and later recreated starts a new "generation": only
//! commits since the most recent commit that added the file count towards its
//! version.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use super::process::{run_with_timeout, ProcessError};
use crate::domain::RevisionMeta;

const FIELD_SEP: char = '\u{1f}';
const LOG_FORMAT: &str = "--format=%h%x1f%aI%x1f%s";
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum GitError {
    #[error("No git repository at {0}")]
    NotARepository(PathBuf),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Unexpected git output: {0}")]
    Parse(String),
}

/// A git repository rooted at the `.aidocs` directory
#[derive(Debug, Clone)]
pub struct GitRepo {
    dir: PathBuf,
    timeout: Duration,
}

impl GitRepo {
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            timeout,
        }
    }

    /// Returns true if a `git` binary can be run
    pub fn is_available() -> bool {
        run_with_timeout(Command::new("git").arg("--version"), Duration::from_secs(5)).is_ok()
    }

    pub fn is_initialized(&self) -> bool {
        self.dir.join(".git").is_dir()
    }

    /// Initializes the repository with an initial commit, if needed
    ///
    /// The initial commit gives every document commit a parent and records
    /// the `.gitignore` written by project init.
    pub fn init(&self) -> Result<(), GitError> {
        if self.is_initialized() {
            return Ok(());
        }

        debug!(dir = %self.dir.display(), "initializing git repository");
        run_with_timeout(
            Command::new("git").arg("init").arg("--quiet").current_dir(&self.dir),
            self.timeout,
        )?;

        if self.dir.join(".gitignore").exists() {
            self.git(&["add", "--", ".gitignore"])?;
        }
        self.git(&["commit", "--quiet", "--allow-empty", "-m", "Initialize aidocs repository"])?;
        Ok(())
    }

    /// Stages and commits one path, returning the short commit hash
    ///
    /// Works for modified, new and deleted files.
    pub fn commit_path(&self, rel_path: &Path, message: &str) -> Result<String, GitError> {
        let path = path_arg(rel_path);
        self.git(&["add", "-A", "--", &path])?;
        self.git(&["commit", "--quiet", "-m", message, "--", &path])?;
        self.head()
    }

    /// Short hash of HEAD
    pub fn head(&self) -> Result<String, GitError> {
        let out = self.git(&["rev-parse", "--short", "HEAD"])?;
        Ok(out.trim().to_string())
    }

    /// Number of revisions in the current generation of a path
    pub fn revision_count(&self, rel_path: &Path) -> Result<u32, GitError> {
        let path = path_arg(rel_path);
        let Some(base) = self.generation_base(&path)? else {
            return Ok(0);
        };

        let range = format!("{}..HEAD", base);
        let out = self.git(&["rev-list", "--count", &range, "--", &path])?;
        let later: u32 = out
            .trim()
            .parse()
            .map_err(|_| GitError::Parse(out.trim().to_string()))?;

        Ok(later + 1)
    }

    /// History of the current generation of a path, newest first
    pub fn log(&self, rel_path: &Path, limit: usize) -> Result<Vec<RevisionMeta>, GitError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let path = path_arg(rel_path);
        let Some(base) = self.generation_base(&path)? else {
            return Ok(Vec::new());
        };

        let total = self.revision_count(rel_path)?;
        let max = format!("-{}", limit);
        let range = format!("{}..HEAD", base);

        let mut lines: Vec<String> = self
            .git(&["log", &max, LOG_FORMAT, &range, "--", &path])?
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        if lines.len() < limit {
            let first = self.git(&["log", "-1", LOG_FORMAT, &base])?;
            lines.extend(first.lines().filter(|l| !l.is_empty()).map(str::to_string));
        }

        lines
            .iter()
            .enumerate()
            .map(|(i, line)| parse_log_line(line, total.saturating_sub(i as u32)))
            .collect()
    }

    /// Paths under `rel_dir` whose working tree state is not committed
    pub fn uncommitted_paths(&self, rel_dir: &Path) -> Result<Vec<PathBuf>, GitError> {
        let dir = path_arg(rel_dir);
        let out = self.git(&["status", "--porcelain", "--untracked-files=all", "--", &dir])?;

        Ok(out
            .lines()
            .filter_map(|line| line.get(3..))
            .map(|path| path.split('/').collect::<PathBuf>())
            .collect())
    }

    /// Most recent commit that added the path
    fn generation_base(&self, path: &str) -> Result<Option<String>, GitError> {
        let out = self.git(&["log", "-1", "--diff-filter=A", "--format=%H", "--", path])?;
        let hash = out.trim();
        Ok((!hash.is_empty()).then(|| hash.to_string()))
    }

    /// Runs git against this repository, retrying once on index lock contention
    fn git(&self, args: &[&str]) -> Result<String, GitError> {
        if !self.is_initialized() {
            return Err(GitError::NotARepository(self.dir.clone()));
        }

        match self.run(args) {
            Err(GitError::Process(e)) if e.stderr_contains("index.lock") => {
                warn!(dir = %self.dir.display(), "git index is locked, retrying once");
                thread::sleep(LOCK_RETRY_DELAY);
                self.run(args)
            }
            other => other,
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        debug!(args = ?args, "git");
        let mut cmd = Command::new("git");
        cmd.arg("--git-dir")
            .arg(self.dir.join(".git"))
            .arg("--work-tree")
            .arg(&self.dir)
            .args(["-c", "user.name=aidocs"])
            .args(["-c", "user.email=aidocs@localhost"])
            .args(["-c", "commit.gpgsign=false"])
            .args(args)
            .current_dir(&self.dir);

        Ok(run_with_timeout(&mut cmd, self.timeout)?.stdout)
    }
}

/// `hash@branch` of the git repository enclosing the project, if any
pub fn project_ref(project_root: &Path, timeout: Duration) -> Option<String> {
    let rev = |args: &[&str]| {
        run_with_timeout(
            Command::new("git").arg("rev-parse").args(args).current_dir(project_root),
            timeout,
        )
        .ok()
        .map(|out| out.stdout.trim().to_string())
        .filter(|s| !s.is_empty())
    };

    let hash = rev(&["--short", "HEAD"])?;
    let branch = rev(&["--abbrev-ref", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    Some(format!("{}@{}", hash, branch))
}

fn path_arg(rel_path: &Path) -> String {
    // git pathspecs always use forward slashes
    rel_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn parse_log_line(line: &str, version: u32) -> Result<RevisionMeta, GitError> {
    let mut parts = line.splitn(3, FIELD_SEP);
    let (Some(id), Some(date), Some(message)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(GitError::Parse(line.to_string()));
    };

    let timestamp = DateTime::parse_from_rfc3339(date)
        .map_err(|_| GitError::Parse(line.to_string()))?
        .with_timezone(&Utc);

    Ok(RevisionMeta {
        id: id.to_string(),
        version,
        message: message.to_string(),
        timestamp,
    })
}
