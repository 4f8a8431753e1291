//! Child processes with a deadline
//!
//! Git and hook commands run as blocking child processes. Each call gets a
//! timeout; on expiry the child is killed and reaped before returning.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use wait_timeout::ChildExt;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' timed out after {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },

    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Failed waiting for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    /// Returns true if the process ran but wrote `needle` to stderr
    pub fn stderr_contains(&self, needle: &str) -> bool {
        matches!(self, ProcessError::Failed { stderr, .. } if stderr.contains(needle))
    }
}

/// Captured output of a successful run
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs `command` to completion, killing it if it outlives `timeout`
///
/// A non-zero exit status is reported as [`ProcessError::Failed`].
pub fn run_with_timeout(
    command: &mut Command,
    timeout: Duration,
) -> Result<CommandOutput, ProcessError> {
    let program = command.get_program().to_string_lossy().into_owned();

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

    // Drain pipes on threads so a chatty child cannot block on a full pipe
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            kill(&mut child);
            return Err(ProcessError::TimedOut { program, timeout });
        }
        Err(source) => {
            kill(&mut child);
            return Err(ProcessError::Wait { program, source });
        }
    };

    let stdout = join(stdout);
    let stderr = join(stderr);

    if !status.success() {
        return Err(ProcessError::Failed {
            program,
            status,
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(CommandOutput { stdout, stderr })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            String::from_utf8_lossy(&buffer).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
