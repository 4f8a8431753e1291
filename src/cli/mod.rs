//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project management | `init`, `status` |
//! | Docs | Document lifecycle | `store`, `show`, `list`, `delete` |
//! | Query | Finding docs | `search`, `log`, `why`, `path` |
//! | Editing | Section helpers | `append`, `decide` |
//! | Index | Index maintenance | `index rebuild`, `index check` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output and debug logging:
//! ```bash
//! aidocs --verbose search auth jwt
//! ```
//!
//! `AIDOCS_LOG` accepts a `tracing` filter and overrides `--verbose`.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod docs;
mod index_cmd;
mod output;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
