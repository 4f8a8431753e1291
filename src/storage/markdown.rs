//! Markdown file storage with git history
//!
//! Documents are stored as markdown files in `.aidocs/docs/`, at a path
//! derived from the name (`auth.jwt.middleware` -> `auth/jwt/middleware.md`).
//! Each file has YAML frontmatter for metadata followed by the body, so
//! editors and diff tools can work on the files directly.
//!
//! Every write is committed to the `.aidocs/` git repository; the version of
//! a document is the number of commits in its current generation.

use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::{BackendKind, GitConfig};
use super::content::{ContentStore, PutOutcome};
use super::git::{self, GitRepo};
use crate::domain::{DocName, Document, RevisionMeta, RevisionRef};

/// YAML frontmatter of a document file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocFrontmatter {
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Store for documents as git-tracked markdown files
pub struct MarkdownStore {
    /// The `.aidocs` directory (git work tree)
    aidocs_dir: PathBuf,

    /// Directory containing document files
    docs_dir: PathBuf,

    /// Root of the enclosing project, for commit trailers
    project_root: PathBuf,

    repo: GitRepo,
    config: GitConfig,
    project_ref: OnceCell<Option<String>>,
}

impl MarkdownStore {
    /// Creates the store for a project
    pub fn for_project(project_root: &Path, config: &GitConfig) -> Self {
        let aidocs_dir = project_root.join(".aidocs");
        Self {
            docs_dir: aidocs_dir.join("docs"),
            repo: GitRepo::new(&aidocs_dir, config.timeout()),
            aidocs_dir,
            project_root: project_root.to_path_buf(),
            config: config.clone(),
            project_ref: OnceCell::new(),
        }
    }

    /// Creates the docs directory and the git repository
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.docs_dir).with_context(|| {
            format!("Failed to create docs directory: {}", self.docs_dir.display())
        })?;

        if let Err(e) = self.repo.init() {
            warn!(dir = %self.aidocs_dir.display(), error = %e, "could not initialize git history");
        }

        Ok(())
    }

    /// Path of a document file relative to the git work tree
    fn rel_path(name: &DocName) -> PathBuf {
        Path::new("docs").join(name.relative_path())
    }

    fn doc_path(&self, name: &DocName) -> PathBuf {
        self.docs_dir.join(name.relative_path())
    }

    /// Builds the commit message, with the project trailer when enabled
    fn commit_message(&self, message: &str) -> String {
        if !self.config.record_project_ref {
            return message.to_string();
        }

        let project_ref = self
            .project_ref
            .get_or_init(|| git::project_ref(&self.project_root, self.config.timeout()));

        match project_ref {
            Some(r) => format!("{}\n\nProject: {}", message, r),
            None => message.to_string(),
        }
    }

    /// Reads a document file
    fn read_from_file(&self, name: &DocName, path: &Path) -> Result<Document> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read doc file: {}", path.display()))?;

        let (fm, body) = parse_markdown(&text)
            .with_context(|| format!("Invalid doc file: {}", path.display()))?;

        Ok(Document {
            name: name.clone(),
            version: 1,
            description: fm.description,
            content: body.to_string(),
            created_at: fm.created_at,
            updated_at: fm.updated_at,
        })
    }

    /// Writes a document to its file atomically (temp file + rename)
    fn write_to_file(&self, doc: &Document) -> Result<()> {
        let path = self.doc_path(&doc.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let temp_path = path.with_extension("md.tmp");
        let content = render_markdown(doc)?;

        fs::write(&temp_path, &content)
            .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

        fs::rename(&temp_path, &path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    /// Version derived from git, falling back to zero when git is unusable
    fn derived_version(&self, name: &DocName) -> u32 {
        match self.repo.revision_count(&Self::rel_path(name)) {
            Ok(count) => count,
            Err(e) => {
                warn!(name = %name, error = %e, "could not count revisions");
                0
            }
        }
    }

    /// Removes now-empty directories between `path` and the docs directory
    fn prune_empty_dirs(&self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == self.docs_dir || !dir.starts_with(&self.docs_dir) {
                break;
            }
            // Fails when the directory still has entries, which ends the walk
            if fs::remove_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
    }

    /// Every `.md` file under the docs directory with its document name
    fn doc_files(&self) -> Result<Vec<(DocName, PathBuf)>> {
        let mut files = Vec::new();
        if self.docs_dir.exists() {
            collect_md_files(&self.docs_dir, &mut files)?;
        }

        let mut docs = Vec::new();
        for path in files {
            match name_for_path(&self.docs_dir, &path) {
                Some(name) => docs.push((name, path)),
                None => warn!(path = %path.display(), "skipping file with invalid doc name"),
            }
        }
        docs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(docs)
    }
}

impl ContentStore for MarkdownStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Git
    }

    fn put(&self, doc: &Document, message: &str) -> Result<PutOutcome> {
        self.write_to_file(doc)?;

        let rel = Self::rel_path(&doc.name);
        let revision = match self.repo.commit_path(&rel, &self.commit_message(message)) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(
                    name = %doc.name,
                    error = %e,
                    "content written but revision not recorded"
                );
                None
            }
        };

        let version = self.derived_version(&doc.name).max(1);
        debug!(name = %doc.name, version, revision = ?revision, "stored doc file");

        Ok(PutOutcome {
            revision: revision.map(|id| RevisionRef { id, version }),
            version,
        })
    }

    fn get(&self, name: &DocName) -> Result<Option<Document>> {
        let path = self.doc_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let mut doc = self.read_from_file(name, &path)?;
        doc.version = self.derived_version(name).max(1);
        Ok(Some(doc))
    }

    fn history(&self, name: &DocName, limit: usize) -> Result<Vec<RevisionMeta>> {
        if !self.doc_path(name).exists() {
            return Ok(Vec::new());
        }

        self.repo
            .log(&Self::rel_path(name), limit)
            .with_context(|| format!("Failed to read history of {}", name))
    }

    fn revision_count(&self, name: &DocName) -> Result<u32> {
        if !self.doc_path(name).exists() {
            return Ok(0);
        }

        self.repo
            .revision_count(&Self::rel_path(name))
            .with_context(|| format!("Failed to count revisions of {}", name))
    }

    fn delete(&self, name: &DocName) -> Result<bool> {
        let path = self.doc_path(name);
        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove doc file: {}", path.display()))?;
        self.prune_empty_dirs(&path);

        let message = self.commit_message(&format!("Delete {}", name));
        if let Err(e) = self.repo.commit_path(&Self::rel_path(name), &message) {
            warn!(name = %name, error = %e, "file removed but deletion not recorded");
        }

        Ok(true)
    }

    fn names(&self) -> Result<Vec<DocName>> {
        Ok(self.doc_files()?.into_iter().map(|(name, _)| name).collect())
    }

    fn scan(&self) -> Result<Vec<Document>> {
        let mut docs = Vec::new();

        for (name, path) in self.doc_files()? {
            match self.read_from_file(&name, &path) {
                Ok(mut doc) => {
                    doc.version = self.derived_version(&name).max(1);
                    docs.push(doc);
                }
                Err(e) => warn!(path = %path.display(), error = %format!("{:#}", e), "skipping unreadable doc file"),
            }
        }

        Ok(docs)
    }

    fn unrecorded(&self) -> Result<Vec<DocName>> {
        let paths = self
            .repo
            .uncommitted_paths(Path::new("docs"))
            .context("Failed to read git status")?;

        let mut names: Vec<DocName> = paths
            .iter()
            .filter(|p| p.extension().is_some_and(|e| e == "md"))
            .filter_map(|p| name_for_path(&self.docs_dir, &self.aidocs_dir.join(p)))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn changed_since(&self, since: DateTime<Utc>) -> Result<bool> {
        let since: SystemTime = since.into();

        for (_, path) in self.doc_files()? {
            if let Ok(mtime) = fs::metadata(&path).and_then(|m| m.modified()) {
                if mtime > since {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    fn path_for(&self, name: &DocName) -> Option<PathBuf> {
        Some(self.doc_path(name))
    }
}

/// Renders a document as frontmatter plus body
fn render_markdown(doc: &Document) -> Result<String> {
    let frontmatter = DocFrontmatter {
        description: doc.description.clone(),
        created_at: doc.created_at,
        updated_at: doc.updated_at,
    };
    let yaml = serde_yaml::to_string(&frontmatter).context("Failed to serialize frontmatter")?;

    let mut text = String::with_capacity(yaml.len() + doc.content.len() + 16);
    text.push_str("---\n");
    text.push_str(&yaml);
    text.push_str("---\n\n");
    text.push_str(&doc.content);
    Ok(text)
}

/// Splits a document file into frontmatter and body
///
/// The body is returned verbatim after the blank separator line.
fn parse_markdown(text: &str) -> Result<(DocFrontmatter, &str)> {
    let rest = text
        .strip_prefix("---\n")
        .ok_or_else(|| anyhow::anyhow!("Missing frontmatter (must start with ---)"))?;

    let (yaml, body) = if let Some(body) = rest.strip_prefix("---\n") {
        ("", body)
    } else {
        let end = rest
            .find("\n---\n")
            .ok_or_else(|| anyhow::anyhow!("Missing frontmatter end delimiter (---)"))?;
        (&rest[..end + 1], &rest[end + 5..])
    };

    let fm: DocFrontmatter = serde_yaml::from_str(yaml).context("Failed to parse frontmatter")?;
    let body = body.strip_prefix('\n').unwrap_or(body);

    Ok((fm, body))
}

fn collect_md_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        if path.is_dir() {
            collect_md_files(&path, out)?;
        } else if path.extension().is_some_and(|e| e == "md") {
            out.push(path);
        }
    }
    Ok(())
}

/// Inverse of [`DocName::relative_path`]
fn name_for_path(docs_dir: &Path, path: &Path) -> Option<DocName> {
    let rel = path.strip_prefix(docs_dir).ok()?.with_extension("");
    let segments: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    DocName::parse(&segments.join(".")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, MarkdownStore) {
        let dir = TempDir::new().unwrap();
        let store = MarkdownStore::for_project(dir.path(), &GitConfig::default());
        fs::create_dir_all(&store.docs_dir).unwrap();
        (dir, store)
    }

    fn git_store() -> Option<(TempDir, MarkdownStore)> {
        if !GitRepo::is_available() {
            eprintln!("git not available, skipping");
            return None;
        }
        let (dir, store) = store();
        store.init().unwrap();
        Some((dir, store))
    }

    fn doc(name: &str, description: &str, content: &str) -> Document {
        Document::new(DocName::parse(name).unwrap(), description, content).unwrap()
    }

    #[test]
    fn markdown_roundtrip_keeps_body_verbatim() {
        let original = doc("auth.jwt", "JWT: tokens", "# JWT\n\n---\nnot frontmatter\n");
        let text = render_markdown(&original).unwrap();
        let (fm, body) = parse_markdown(&text).unwrap();

        assert_eq!(fm.description, "JWT: tokens");
        assert_eq!(fm.created_at, original.created_at);
        assert_eq!(body, original.content);
    }

    #[test]
    fn parse_rejects_missing_frontmatter() {
        assert!(parse_markdown("# just markdown").is_err());
        assert!(parse_markdown("---\ndescription: x\n").is_err());
    }

    #[test]
    fn name_for_path_inverts_relative_path() {
        let docs = Path::new("/p/.aidocs/docs");
        let name = DocName::parse("auth.jwt.middleware").unwrap();
        let path = docs.join(name.relative_path());

        assert_eq!(name_for_path(docs, &path), Some(name));
        assert_eq!(name_for_path(docs, &docs.join("Bad Name.md")), None);
    }

    #[test]
    fn write_read_without_git() {
        let (_dir, store) = store();
        let original = doc("auth.jwt", "JWT auth", "Body");

        let outcome = store.put(&original, "Create auth.jwt").unwrap();
        assert!(outcome.revision.is_none());

        let loaded = store.get(&original.name).unwrap().unwrap();
        assert_eq!(loaded.description, "JWT auth");
        assert_eq!(loaded.content, "Body");
        assert_eq!(loaded.version, 1);
        assert!(store.docs_dir.join("auth").join("jwt.md").is_file());
    }

    #[test]
    fn atomic_write_no_temp_file_left() {
        let (_dir, store) = store();
        let original = doc("atomic", "Atomic", "Body");
        store.put(&original, "Create atomic").unwrap();

        let path = store.doc_path(&original.name);
        assert!(path.exists());
        assert!(!path.with_extension("md.tmp").exists());
    }

    #[test]
    fn delete_prunes_empty_directories() {
        let (_dir, store) = store();
        let nested = doc("a.b.c", "Nested", "Body");
        let sibling = doc("a.d", "Sibling", "Body");
        store.put(&nested, "Create").unwrap();
        store.put(&sibling, "Create").unwrap();

        assert!(store.delete(&nested.name).unwrap());
        assert!(!store.docs_dir.join("a").join("b").exists());
        assert!(store.docs_dir.join("a").is_dir());

        assert!(!store.delete(&nested.name).unwrap());
    }

    #[test]
    fn scan_finds_nested_docs() {
        let (_dir, store) = store();
        store.put(&doc("auth", "Auth", "Body"), "Create").unwrap();
        store.put(&doc("auth.jwt", "JWT", "Body"), "Create").unwrap();
        fs::write(store.docs_dir.join("NOTES.md"), "ignored").unwrap();

        let names: Vec<String> = store
            .scan()
            .unwrap()
            .into_iter()
            .map(|d| d.name.to_string())
            .collect();
        assert_eq!(names, vec!["auth", "auth.jwt"]);
    }

    #[test]
    fn changed_since_sees_new_files() {
        let (_dir, store) = store();
        let before = Utc::now() - chrono::Duration::seconds(5);
        assert!(!store.changed_since(before).unwrap());

        store.put(&doc("auth", "Auth", "Body"), "Create").unwrap();
        assert!(store.changed_since(before).unwrap());
        assert!(!store
            .changed_since(Utc::now() + chrono::Duration::seconds(60))
            .unwrap());
    }

    #[test]
    fn git_history_tracks_writes() {
        let Some((_dir, store)) = git_store() else { return };
        let mut d = doc("auth.jwt", "v1", "One");

        let first = store.put(&d, "Create auth.jwt: v1").unwrap();
        assert_eq!(first.version, 1);
        assert!(first.revision.is_some());

        d.revise("v2", "Two").unwrap();
        store.put(&d, "auth.jwt: second").unwrap();
        d.revise("v3", "Three").unwrap();
        let third = store.put(&d, "auth.jwt: third").unwrap();
        assert_eq!(third.version, 3);

        let history = store.history(&d.name, 10).unwrap();
        let versions: Vec<u32> = history.iter().map(|h| h.version).collect();
        assert_eq!(versions, vec![3, 2, 1]);
        assert_eq!(history[0].message, "auth.jwt: third");

        assert_eq!(store.get(&d.name).unwrap().unwrap().version, 3);
    }

    #[test]
    fn git_unrecorded_reports_uncommitted_edits() {
        let Some((_dir, store)) = git_store() else { return };
        let d = doc("auth", "Auth", "Body");
        store.put(&d, "Create auth").unwrap();
        assert!(store.unrecorded().unwrap().is_empty());

        // An edit that bypasses the store leaves no revision behind
        fs::write(store.doc_path(&d.name), render_markdown(&d).unwrap() + "more").unwrap();
        assert_eq!(store.unrecorded().unwrap(), vec![d.name.clone()]);
    }

    #[test]
    fn git_delete_clears_visible_history() {
        let Some((_dir, store)) = git_store() else { return };
        let d = doc("auth", "Auth", "Body");
        store.put(&d, "Create auth").unwrap();

        assert!(store.delete(&d.name).unwrap());
        assert!(store.history(&d.name, 10).unwrap().is_empty());
        assert_eq!(store.revision_count(&d.name).unwrap(), 0);

        let again = store.put(&doc("auth", "Auth again", "Body"), "Create auth").unwrap();
        assert_eq!(again.version, 1);
    }
}
