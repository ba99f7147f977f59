// Container runtime abstraction
// Everything the harness does to containers goes through this trait

pub mod command;

#[cfg(test)]
pub mod test_support;

use crate::errors::Result;
use std::time::Duration;

pub use command::CliRuntime;

/// Captured result of one runtime invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout with surrounding whitespace removed, the way `$(...)` would see it
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Stdout and stderr joined, for checks that accept either stream
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Outcome of an invocation that is allowed to run for a bounded time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimedOutput {
    Finished(CommandOutput),
    /// The process outlived its deadline and was killed
    TimedOut,
}

/// A container CLI (docker, podman) driven as a black box
pub trait ContainerRuntime {
    /// Program name used for display
    fn program(&self) -> &str;

    /// Run the CLI with the given arguments and capture its output
    fn run(&self, args: &[String]) -> Result<CommandOutput>;

    /// Run the CLI, killing it if it is still alive after `timeout`
    fn run_with_timeout(&self, args: &[String], timeout: Duration) -> Result<TimedOutput>;
}

/// Build an owned argument vector from string slices
pub fn args<S: AsRef<str>>(parts: &[S]) -> Vec<String> {
    parts.iter().map(|p| p.as_ref().to_string()).collect()
}
