//! CLI integration tests for aidocs
//!
//! These tests verify the complete workflow from initialization through
//! storing, querying and deleting docs, ensuring commands work together
//! correctly.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command instance for the aidocs binary, isolated from the
/// caller's environment and global config
fn aidocs_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("aidocs"));
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".xdg"))
        .env_remove("AIDOCS_BACKEND")
        .env_remove("AIDOCS_DIR")
        .env_remove("AIDOCS_LOG");
    cmd
}

/// Create a temporary directory and initialize a project with the sqlite backend
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    aidocs_cmd(dir.path())
        .args(["init", "--backend", "sqlite"])
        .assert()
        .success();
    dir
}

fn store(dir: &Path, name: &str, description: &str, content: &str) {
    aidocs_cmd(dir)
        .args(["store", name, description, content])
        .assert()
        .success();
}

fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    aidocs_cmd(dir.path())
        .args(["init", "--backend", "sqlite"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized aidocs project"))
        .stdout(predicate::str::contains("sqlite backend"));

    assert!(dir.path().join(".aidocs").is_dir());
    assert!(dir.path().join(".aidocs/locks").is_dir());
    assert!(dir.path().join(".aidocs/config.toml").is_file());
    assert!(dir.path().join(".aidocs/.gitignore").is_file());
    assert!(dir.path().join(".aidocs/content.db").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = setup_project();

    aidocs_cmd(dir.path())
        .args(["init", "--backend", "sqlite"])
        .assert()
        .success();
}

#[test]
fn test_commands_outside_project_fail() {
    let dir = TempDir::new().unwrap();

    aidocs_cmd(dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not in an aidocs project"));
}

#[test]
fn test_commands_work_from_subdirectory() {
    let dir = setup_project();
    store(dir.path(), "auth", "Authentication", "Body");

    let sub = dir.path().join("src").join("nested");
    fs::create_dir_all(&sub).unwrap();

    aidocs_cmd(&sub)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("auth - Authentication"));
}

// =============================================================================
// Store and Show Tests
// =============================================================================

#[test]
fn test_store_and_show_roundtrip() {
    let dir = setup_project();

    aidocs_cmd(dir.path())
        .args(["store", "auth.jwt", "JWT middleware", "# JWT\n\nTokens are verified."])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stored auth.jwt (v1)"));

    aidocs_cmd(dir.path())
        .args(["show", "auth.jwt"])
        .assert()
        .success()
        .stdout("# JWT\n\nTokens are verified.\n");
}

#[test]
fn test_store_reads_stdin() {
    let dir = setup_project();

    aidocs_cmd(dir.path())
        .args(["store", "notes", "Scratch notes", "-"])
        .write_stdin("from stdin\n")
        .assert()
        .success();

    aidocs_cmd(dir.path())
        .args(["show", "notes"])
        .assert()
        .success()
        .stdout("from stdin\n");
}

#[test]
fn test_store_template() {
    let dir = setup_project();

    aidocs_cmd(dir.path())
        .args(["store", "payments", "Payments", "--template"])
        .assert()
        .success();

    aidocs_cmd(dir.path())
        .args(["show", "payments"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# payments"))
        .stdout(predicate::str::contains("## Decisions Made"));
}

#[test]
fn test_store_invalid_name_fails() {
    let dir = setup_project();

    for name in ["Auth", "1auth", "auth..jwt", ".auth", "auth.", "auth jwt", " auth", "auth\n"] {
        aidocs_cmd(dir.path())
            .args(["store", name, "Desc", "Body"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid"));
    }
}

#[test]
fn test_store_empty_fields_fail() {
    let dir = setup_project();

    aidocs_cmd(dir.path())
        .args(["store", "auth", "", "Body"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Description cannot be empty"));

    aidocs_cmd(dir.path())
        .args(["store", "auth", "Desc", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Content cannot be empty"));
}

#[test]
fn test_store_existing_is_conflict() {
    let dir = setup_project();
    store(dir.path(), "auth", "Auth", "Body");

    aidocs_cmd(dir.path())
        .args(["store", "auth", "Auth", "Other"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_update_missing_is_not_found() {
    let dir = setup_project();

    aidocs_cmd(dir.path())
        .args(["store", "--update", "ghost", "Ghost", "Body"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Doc 'ghost' not found"));
}

#[test]
fn test_show_missing_fails() {
    let dir = setup_project();

    aidocs_cmd(dir.path())
        .args(["show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// =============================================================================
// History Tests
// =============================================================================

#[test]
fn test_update_and_log() {
    let dir = setup_project();
    store(dir.path(), "auth.jwt", "JWT", "One");

    aidocs_cmd(dir.path())
        .args(["store", "-u", "auth.jwt", "JWT", "Two", "-m", "Second pass"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated auth.jwt (v2)"));

    aidocs_cmd(dir.path())
        .args(["store", "-u", "auth.jwt", "JWT", "Three"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(v3)"));

    let output = aidocs_cmd(dir.path())
        .args(["--format", "json", "log", "auth.jwt"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let history: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let versions: Vec<u64> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["version"].as_u64().unwrap())
        .collect();
    assert_eq!(versions, vec![3, 2, 1]);
    assert_eq!(history[1]["message"], "auth.jwt: Second pass");
}

// =============================================================================
// Listing and Search Tests
// =============================================================================

#[test]
fn test_list_sorted() {
    let dir = setup_project();
    for name in ["zeta", "auth.jwt", "database", "auth"] {
        store(dir.path(), name, &format!("About {}", name), "Body");
    }

    aidocs_cmd(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout("auth - About auth\nauth.jwt - About auth.jwt\ndatabase - About database\nzeta - About zeta\n");
}

#[test]
fn test_list_tree() {
    let dir = setup_project();
    store(dir.path(), "auth.jwt", "JWT middleware", "Body");
    store(dir.path(), "auth.oauth", "OAuth flow", "Body");
    store(dir.path(), "database", "Database layer", "Body");

    aidocs_cmd(dir.path())
        .args(["list", "--tree"])
        .assert()
        .success()
        .stdout(
            "├── auth/\n│   ├── jwt - JWT middleware\n│   └── oauth - OAuth flow\n└── database - Database layer\n",
        );
}

#[test]
fn test_list_empty() {
    let dir = setup_project();

    aidocs_cmd(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No docs found"));
}

#[test]
fn test_search_ranks_name_matches_first() {
    let dir = setup_project();
    store(dir.path(), "user.auth", "User accounts", "Body");
    store(dir.path(), "sessions", "Cookie based auth", "Body");
    store(dir.path(), "auth", "Login", "Body");

    let output = aidocs_cmd(dir.path())
        .args(["-f", "json", "search", "auth"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let hits: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = hits
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["auth", "user.auth", "sessions"]);
}

#[test]
fn test_search_requires_all_terms() {
    let dir = setup_project();
    store(dir.path(), "auth.jwt", "Token checks", "Body");
    store(dir.path(), "auth.oauth", "OAuth flow", "Body");

    aidocs_cmd(dir.path())
        .args(["search", "auth", "jwt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("auth.jwt"))
        .stdout(predicate::str::contains("auth.oauth").not());

    aidocs_cmd(dir.path())
        .args(["search", "nothing-here"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No docs found matching"));
}

#[test]
fn test_search_limit() {
    let dir = setup_project();
    for name in ["api.a", "api.b", "api.c"] {
        store(dir.path(), name, "API", "Body");
    }

    let output = aidocs_cmd(dir.path())
        .args(["-f", "json", "search", "api", "--limit", "2"])
        .output()
        .unwrap();
    let hits: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(hits.as_array().unwrap().len(), 2);
}

// =============================================================================
// Delete and Status Tests
// =============================================================================

#[test]
fn test_delete() {
    let dir = setup_project();
    store(dir.path(), "auth", "Auth", "Body");

    aidocs_cmd(dir.path())
        .args(["delete", "auth"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted auth"));

    aidocs_cmd(dir.path()).args(["show", "auth"]).assert().failure();

    aidocs_cmd(dir.path())
        .args(["delete", "auth"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_status_counts() {
    let dir = setup_project();
    store(dir.path(), "auth", "Auth", "One");
    store(dir.path(), "database", "DB", "One");
    aidocs_cmd(dir.path())
        .args(["store", "-u", "auth", "Auth", "Two"])
        .assert()
        .success();

    let output = aidocs_cmd(dir.path())
        .args(["-f", "json", "status"])
        .output()
        .unwrap();
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(stats["total_docs"], 2);
    assert_eq!(stats["total_revisions"], 3);
    assert_eq!(stats["backend"], "sqlite");
    assert_eq!(stats["recent_docs"][0]["name"], "auth");
}

// =============================================================================
// Section Editing Tests
// =============================================================================

#[test]
fn test_append_decide_and_why() {
    let dir = setup_project();
    store(dir.path(), "auth", "Authentication", "# Auth");

    aidocs_cmd(dir.path())
        .args(["append", "auth", "Rotate signing keys"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Appended to auth (v2)"));

    aidocs_cmd(dir.path())
        .args(["decide", "auth", "Use JWT", "Stateless services"])
        .assert()
        .success();

    aidocs_cmd(dir.path())
        .args(["show", "auth"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Current Work\n- Rotate signing keys"))
        .stdout(predicate::str::contains("**Rationale**: Stateless services"));

    aidocs_cmd(dir.path())
        .args(["why", "auth"])
        .assert()
        .success()
        .stdout(predicate::str::contains("**Decision**: Use JWT"));
}

// =============================================================================
// Index Tests
// =============================================================================

#[test]
fn test_index_self_heals() {
    let dir = setup_project();
    store(dir.path(), "auth", "Auth", "Body");
    store(dir.path(), "database", "DB", "Body");

    fs::remove_dir_all(dir.path().join(".aidocs/.cache")).unwrap();

    aidocs_cmd(dir.path())
        .args(["index", "check"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("not indexed"));

    aidocs_cmd(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("database - DB"));

    aidocs_cmd(dir.path())
        .args(["index", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Index matches"));
}

#[test]
fn test_index_rebuild() {
    let dir = setup_project();
    store(dir.path(), "auth", "Auth", "Body");

    aidocs_cmd(dir.path())
        .args(["index", "rebuild"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(1 docs)"));
}

// =============================================================================
// Git Backend Tests
// =============================================================================

#[test]
fn test_git_backend_workflow() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let dir = TempDir::new().unwrap();
    aidocs_cmd(dir.path()).arg("init").assert().success();
    assert!(dir.path().join(".aidocs/.git").is_dir());

    store(dir.path(), "auth.jwt", "JWT", "One");
    aidocs_cmd(dir.path())
        .args(["store", "-u", "auth.jwt", "JWT", "Two"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(v2)"));

    let file = dir.path().join(".aidocs/docs/auth/jwt.md");
    assert!(file.is_file());
    assert!(fs::read_to_string(&file).unwrap().ends_with("Two"));

    aidocs_cmd(dir.path())
        .args(["path", "auth.jwt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("jwt.md"));

    aidocs_cmd(dir.path())
        .args(["log", "auth.jwt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("v2"))
        .stdout(predicate::str::contains("Create auth.jwt: JWT"));

    aidocs_cmd(dir.path()).args(["delete", "auth.jwt"]).assert().success();
    assert!(!dir.path().join(".aidocs/docs/auth").exists());
}

#[test]
fn test_git_backend_picks_up_external_edits() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let dir = TempDir::new().unwrap();
    aidocs_cmd(dir.path()).arg("init").assert().success();
    store(dir.path(), "auth", "Auth", "Body");

    // Another tool drops a doc file next to ours
    let file = dir.path().join(".aidocs/docs/manual.md");
    fs::write(
        &file,
        "---\ndescription: Written by hand\ncreated_at: 2024-01-01T00:00:00Z\nupdated_at: 2024-01-01T00:00:00Z\n---\n\nHand written\n",
    )
    .unwrap();

    aidocs_cmd(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("manual - Written by hand"));

    aidocs_cmd(dir.path())
        .args(["index", "check"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("revision not recorded"));
}

#[test]
fn test_path_unavailable_for_sqlite() {
    let dir = setup_project();
    store(dir.path(), "auth", "Auth", "Body");

    aidocs_cmd(dir.path())
        .args(["path", "auth"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("keeps no file per doc"));
}
