//! Index CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::storage::Project;

#[derive(Subcommand)]
pub enum IndexCommands {
    /// Rebuild the index from the content store
    Rebuild,

    /// Compare the index with the content store
    Check,
}

pub fn run(cmd: IndexCommands, output: &Output, project: &Project) -> Result<()> {
    match cmd {
        IndexCommands::Rebuild => rebuild(output, project),
        IndexCommands::Check => check(output, project),
    }
}

fn rebuild(output: &Output, project: &Project) -> Result<()> {
    let mut docs = project.docs()?;
    output.verbose_ctx("index", "Rebuilding index from content store");

    let start = std::time::Instant::now();
    let count = docs.reindex()?;
    let duration = start.elapsed();

    if output.is_json() {
        output.data(&serde_json::json!({
            "rebuilt": true,
            "duration_ms": duration.as_millis(),
            "docs": count,
        }));
    } else {
        output.success(&format!("Index rebuilt in {:?} ({} docs)", duration, count));
    }

    Ok(())
}

fn check(output: &Output, project: &Project) -> Result<()> {
    let docs = project.docs()?;
    let drift = docs.check()?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "consistent": drift.is_empty(),
            "drift": drift,
        }));
    } else if drift.is_empty() {
        println!("Index matches the content store.");
    } else {
        println!("{:<30} PROBLEM", "DOC");
        println!("{}", "-".repeat(55));
        for d in &drift {
            println!("{:<30} {}", d.name, d.kind.as_str());
        }
        println!();
        println!("Run 'aidocs index rebuild' to refresh the index.");
    }

    if drift.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} doc(s) out of sync", drift.len())
    }
}
