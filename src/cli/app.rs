//! Main CLI application structure

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{docs, index_cmd};
use crate::domain::sections::DEFAULT_APPEND_SECTION;
use crate::storage::{BackendKind, Config, Project};

#[derive(Parser)]
#[command(name = "aidocs")]
#[command(author, version, about = "Local, versioned documentation for projects and AI agents")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Content backend, overriding the project config
    #[arg(long, global = true, env = "AIDOCS_BACKEND")]
    pub backend: Option<BackendKind>,

    /// Directory to search upward from for the project (defaults to current directory)
    #[arg(long, short = 'C', global = true, env = "AIDOCS_DIR")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new aidocs project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Create a doc, or replace one with --update
    Store {
        /// Dot-separated name, e.g. auth.jwt
        name: String,

        /// One-line description
        description: String,

        /// Markdown content ('-' or omitted reads stdin)
        content: Option<String>,

        /// Update an existing doc instead of creating one
        #[arg(long, short)]
        update: bool,

        /// Revision message for updates
        #[arg(long, short)]
        message: Option<String>,

        /// Start from the standard doc template
        #[arg(long, conflicts_with = "content")]
        template: bool,
    },

    /// Print a doc
    Show {
        name: String,
    },

    /// List all docs
    List {
        /// Show the name hierarchy as a tree
        #[arg(long, short)]
        tree: bool,
    },

    /// Search docs by name and description
    Search {
        /// Search terms (all must match)
        #[arg(required = true)]
        query: Vec<String>,

        /// Maximum results (defaults to the project config)
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Show the revision history of a doc
    Log {
        name: String,

        /// Maximum revisions to show
        #[arg(long, short = 'n', default_value = "10")]
        limit: usize,
    },

    /// Delete a doc
    Delete {
        name: String,
    },

    /// Show counts and recently updated docs
    Status,

    /// Add a bullet to a section of a doc
    Append {
        name: String,

        /// Text of the bullet
        text: String,

        /// Section heading to add under
        #[arg(long, short, default_value = DEFAULT_APPEND_SECTION)]
        section: String,
    },

    /// Record a decision and its rationale in a doc
    Decide {
        name: String,
        decision: String,
        rationale: String,
    },

    /// Show recorded decisions of docs matching a query
    Why {
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Print the file path of a doc (git backend)
    Path {
        name: String,
    },

    /// Manage the metadata index
    #[command(subcommand)]
    Index(index_cmd::IndexCommands),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        None => Config::global_only()?.global.default_format,
    };
    let output = Output::new(format, cli.verbose);

    let start = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    let command = match cli.command {
        Commands::Init { path } => {
            let root = if path == Path::new(".") { start } else { start.join(path) };
            return init(&output, &root, cli.backend);
        }
        command => command,
    };

    let project = Project::discover(&start)?.with_backend(cli.backend);
    output.verbose_ctx(
        "project",
        &format!(
            "{} ({} backend)",
            project.root().display(),
            project.backend().as_str()
        ),
    );

    match command {
        Commands::Init { .. } => unreachable!("handled above"),

        Commands::Store {
            name,
            description,
            content,
            update,
            message,
            template,
        } => docs::store(
            &output,
            &project,
            &name,
            &description,
            docs::ContentSource::from_args(content, template),
            update,
            message.as_deref(),
        )?,

        Commands::Show { name } => docs::show(&output, &project, &name)?,
        Commands::List { tree } => docs::list(&output, &project, tree)?,
        Commands::Search { query, limit } => {
            docs::search(&output, &project, &query.join(" "), limit)?
        }
        Commands::Log { name, limit } => docs::log(&output, &project, &name, limit)?,
        Commands::Delete { name } => docs::delete(&output, &project, &name)?,
        Commands::Status => docs::status(&output, &project)?,

        Commands::Append {
            name,
            text,
            section,
        } => docs::append(&output, &project, &name, &text, Some(&section))?,

        Commands::Decide {
            name,
            decision,
            rationale,
        } => docs::decide(&output, &project, &name, &decision, &rationale)?,

        Commands::Why { query } => docs::why(&output, &project, &query.join(" "))?,
        Commands::Path { name } => docs::path(&output, &project, &name)?,
        Commands::Index(cmd) => index_cmd::run(cmd, &output, &project)?,
    }

    output.verbose_ctx("done", "Command completed successfully");
    Ok(())
}

fn init(output: &Output, path: &Path, backend: Option<BackendKind>) -> Result<()> {
    let backend = backend.unwrap_or_default();
    output.verbose_ctx("init", &format!("Initializing project at: {}", path.display()));

    let project = Project::init(path, backend)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "root": project.root().display().to_string(),
            "backend": project.backend().as_str(),
        }));
    } else {
        output.success(&format!(
            "Initialized aidocs project at {} ({} backend)",
            project.root().display(),
            project.backend().as_str()
        ));
    }

    Ok(())
}

/// Logs go to stderr; `AIDOCS_LOG` takes precedence over `--verbose`
fn init_logging(verbose: bool) {
    let default = if verbose { "aidocs=debug" } else { "aidocs=warn" };
    let filter = EnvFilter::try_from_env("AIDOCS_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
