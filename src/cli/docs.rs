//! Document CLI commands

use std::io::{self, Read};

use anyhow::{Context, Result};

use super::output::Output;
use crate::domain::hierarchy::format_tree;
use crate::domain::sections;
use crate::domain::DocError;
use crate::storage::{Project, WriteOutcome};

/// Where `store` takes the document body from
pub enum ContentSource {
    Inline(String),
    Stdin,
    Template,
}

impl ContentSource {
    /// `-` or a missing argument means stdin
    pub fn from_args(content: Option<String>, template: bool) -> Self {
        match content {
            _ if template => ContentSource::Template,
            Some(c) if c != "-" => ContentSource::Inline(c),
            _ => ContentSource::Stdin,
        }
    }

    fn read(self, name: &str) -> Result<String> {
        match self {
            ContentSource::Inline(c) => Ok(c),
            ContentSource::Template => Ok(sections::template(name)),
            ContentSource::Stdin => {
                let mut buffer = String::new();
                io::stdin()
                    .read_to_string(&mut buffer)
                    .context("Failed to read content from stdin")?;
                Ok(buffer)
            }
        }
    }
}

pub fn store(
    output: &Output,
    project: &Project,
    name: &str,
    description: &str,
    source: ContentSource,
    update: bool,
    message: Option<&str>,
) -> Result<()> {
    let content = source.read(name)?;
    let mut docs = project.docs()?;

    let outcome = if update {
        output.verbose_ctx("store", &format!("Updating {}", name));
        docs.update(name, Some(description), &content, message)?
    } else {
        output.verbose_ctx("store", &format!("Creating {}", name));
        docs.create(name, description, &content)?
    };

    report_write(output, &outcome, if update { "Updated" } else { "Stored" });
    Ok(())
}

pub fn show(output: &Output, project: &Project, name: &str) -> Result<()> {
    let docs = project.docs()?;
    let doc = docs
        .read(name)?
        .ok_or_else(|| DocError::NotFound(name.to_string()))?;

    if output.is_json() {
        output.data(&doc);
    } else {
        if output.is_verbose() {
            eprintln!(
                "{} (v{}) - {}, updated {}",
                doc.name,
                doc.version,
                doc.description,
                doc.updated_at.format("%Y-%m-%d %H:%M")
            );
        }
        print!("{}", doc.content);
        if !doc.content.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}

pub fn list(output: &Output, project: &Project, tree: bool) -> Result<()> {
    let mut docs = project.docs()?;
    let list = docs.list()?;

    if output.is_json() {
        output.data(&list);
    } else if list.is_empty() {
        println!("No docs found.");
    } else if tree {
        print!("{}", format_tree(&list));
    } else {
        for doc in &list {
            println!("{} - {}", doc.name, doc.description);
        }
    }

    Ok(())
}

pub fn search(output: &Output, project: &Project, query: &str, limit: Option<usize>) -> Result<()> {
    let mut docs = project.docs()?;
    output.verbose_ctx("search", &format!("Searching for: {}", query));

    let hits = docs.search(query, limit)?;
    output.verbose_ctx("search", &format!("Found {} results", hits.len()));

    if output.is_json() {
        output.data(&hits);
    } else if hits.is_empty() {
        println!("No docs found matching '{}'", query);
    } else {
        for hit in &hits {
            println!("{:<30} {:>3}  {}", hit.doc.name, hit.score, hit.doc.description);
        }
    }

    Ok(())
}

pub fn log(output: &Output, project: &Project, name: &str, limit: usize) -> Result<()> {
    let docs = project.docs()?;
    let history = docs.history(name, limit)?;

    if output.is_json() {
        output.data(&history);
    } else if history.is_empty() {
        println!("No history for '{}'", name);
    } else {
        for rev in &history {
            println!(
                "{:<8} v{:<4} {}  {}",
                rev.id,
                rev.version,
                rev.timestamp.format("%Y-%m-%d %H:%M"),
                rev.message
            );
        }
    }

    Ok(())
}

pub fn delete(output: &Output, project: &Project, name: &str) -> Result<()> {
    let mut docs = project.docs()?;

    if !docs.delete(name)? {
        return Err(DocError::NotFound(name.to_string()).into());
    }

    output.success(&format!("Deleted {}", name));
    Ok(())
}

pub fn status(output: &Output, project: &Project) -> Result<()> {
    let mut docs = project.docs()?;
    let stats = docs.stats()?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "root": project.root().display().to_string(),
            "backend": project.backend().as_str(),
            "total_docs": stats.total_docs,
            "total_revisions": stats.total_revisions,
            "recent_docs": stats.recent_docs,
        }));
        return Ok(());
    }

    println!("Project: {}", project.root().display());
    println!("Backend: {}", project.backend().as_str());
    println!("Docs: {}", stats.total_docs);
    println!("Revisions: {}", stats.total_revisions);

    if !stats.recent_docs.is_empty() {
        println!();
        println!("Recently updated:");
        for doc in &stats.recent_docs {
            println!(
                "  {} - {} ({})",
                doc.name,
                doc.description,
                doc.updated_at.format("%Y-%m-%d %H:%M")
            );
        }
    }

    Ok(())
}

pub fn append(
    output: &Output,
    project: &Project,
    name: &str,
    text: &str,
    section: Option<&str>,
) -> Result<()> {
    let mut docs = project.docs()?;
    let outcome = docs.append(name, text, section)?;

    report_write(output, &outcome, "Appended to");
    Ok(())
}

pub fn decide(
    output: &Output,
    project: &Project,
    name: &str,
    decision: &str,
    rationale: &str,
) -> Result<()> {
    let mut docs = project.docs()?;
    let outcome = docs.decide(name, decision, rationale)?;

    report_write(output, &outcome, "Recorded decision in");
    Ok(())
}

pub fn why(output: &Output, project: &Project, query: &str) -> Result<()> {
    let mut docs = project.docs()?;
    let rationales = docs.why(query)?;

    if output.is_json() {
        output.data(&rationales);
    } else if rationales.is_empty() {
        println!("No recorded decisions match '{}'", query);
    } else {
        for (i, r) in rationales.iter().enumerate() {
            if i > 0 {
                println!();
            }
            println!("{} - {}", r.name, r.description);
            for line in &r.decisions {
                println!("  {}", line);
            }
        }
    }

    Ok(())
}

pub fn path(output: &Output, project: &Project, name: &str) -> Result<()> {
    let docs = project.docs()?;
    let path = docs.path_for(name)?.ok_or_else(|| {
        anyhow::anyhow!(
            "The {} backend keeps no file per doc",
            project.backend().as_str()
        )
    })?;

    if output.is_json() {
        output.data(&serde_json::json!({ "name": name, "path": path }));
    } else {
        println!("{}", path.display());
    }

    Ok(())
}

fn report_write(output: &Output, outcome: &WriteOutcome, verb: &str) {
    if outcome.revision.is_none() {
        output.warn(&format!(
            "{} was saved but its revision was not recorded. Run 'aidocs index check'.",
            outcome.doc.name
        ));
    }

    if output.is_json() {
        output.data(outcome);
    } else {
        let revision = outcome
            .revision
            .as_ref()
            .map(|r| format!(" [{}]", r.id))
            .unwrap_or_default();
        output.success(&format!(
            "{} {} (v{}){}",
            verb, outcome.doc.name, outcome.doc.version, revision
        ));
    }
}
