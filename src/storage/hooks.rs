//! Post-mutation shell hooks
//!
//! Hooks are configured in `[hooks]` of the project config. They run after
//! the write is complete, with the project root as working directory, and
//! their failure only produces a warning.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use super::config::HooksConfig;
use super::process::run_with_timeout;
use crate::domain::DocName;

/// Mutation that triggered a hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    Create,
    Update,
    Delete,
}

impl HookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::Create => "create",
            HookEvent::Update => "update",
            HookEvent::Delete => "delete",
        }
    }
}

/// Runs configured hooks for document events
#[derive(Debug, Clone)]
pub struct Hooks {
    config: HooksConfig,
    project_root: PathBuf,
}

impl Hooks {
    pub fn new(config: HooksConfig, project_root: &Path) -> Self {
        Self {
            config,
            project_root: project_root.to_path_buf(),
        }
    }

    /// Runs the hook for `event`, if one is configured
    ///
    /// Returns false if a hook ran and failed.
    pub fn fire(&self, event: HookEvent, name: &DocName) -> bool {
        let command = match event {
            HookEvent::Create | HookEvent::Update => self.config.post_write.as_deref(),
            HookEvent::Delete => self.config.post_delete.as_deref(),
        };
        let Some(command) = command else {
            return true;
        };

        debug!(event = event.as_str(), name = %name, command, "running hook");
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .env("AIDOCS_EVENT", event.as_str())
            .env("AIDOCS_DOC", name.as_str())
            .current_dir(&self.project_root);

        match run_with_timeout(&mut cmd, self.config.timeout()) {
            Ok(_) => true,
            Err(e) => {
                warn!(event = event.as_str(), name = %name, error = %e, "hook failed");
                false
            }
        }
    }
}
