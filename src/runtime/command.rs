// Runtime backed by an external CLI program (docker, podman)
use crate::clock::{Clock, SystemClock};
use crate::errors::{CheckError, Result};
use crate::interrupt::Interrupt;
use crate::runtime::{CommandOutput, ContainerRuntime, TimedOutput};
use std::fs::File;
use std::io::Read;
use std::process::{Child, Command, ExitStatus};
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Invokes the container CLI without a shell, so arguments are never re-split
pub struct CliRuntime {
    program: String,
    clock: Arc<dyn Clock>,
    interrupt: Interrupt,
}

impl CliRuntime {
    pub fn new(program: impl Into<String>) -> Self {
        Self::new_with_clock(program, Arc::new(SystemClock))
    }

    pub fn new_with_clock(program: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            program: program.into(),
            clock,
            interrupt: Interrupt::new(),
        }
    }

    /// Abort bounded runs when `interrupt` is raised
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    fn spawn_error(&self, args: &[String], e: std::io::Error) -> CheckError {
        CheckError::RuntimeError(format!(
            "Failed to execute '{} {}': {}",
            self.program,
            args.join(" "),
            e
        ))
    }
}

impl ContainerRuntime for CliRuntime {
    fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, args: &[String]) -> Result<CommandOutput> {
        tracing::debug!("+ {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| self.spawn_error(args, e))?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        };
        tracing::debug!(exit_code = ?result.exit_code, "runtime command finished");

        Ok(result)
    }

    fn run_with_timeout(&self, args: &[String], timeout: Duration) -> Result<TimedOutput> {
        tracing::debug!(
            "+ {} {} (timeout {}s)",
            self.program,
            args.join(" "),
            timeout.as_secs()
        );

        // Output goes to files so a chatty process cannot block on a full pipe
        let stdout_file = tempfile::NamedTempFile::new()?;
        let stderr_file = tempfile::NamedTempFile::new()?;

        let mut child = Command::new(&self.program)
            .args(args)
            .stdout(File::create(stdout_file.path())?)
            .stderr(File::create(stderr_file.path())?)
            .spawn()
            .map_err(|e| self.spawn_error(args, e))?;

        match wait_with_timeout(&mut child, timeout, self.clock.as_ref(), &self.interrupt)? {
            Some(status) => {
                let mut stdout = String::new();
                let mut stderr = String::new();
                File::open(stdout_file.path())?.read_to_string(&mut stdout)?;
                File::open(stderr_file.path())?.read_to_string(&mut stderr)?;

                tracing::debug!(exit_code = ?status.code(), "runtime command finished");
                Ok(TimedOutput::Finished(CommandOutput {
                    stdout,
                    stderr,
                    exit_code: status.code(),
                }))
            }
            None => {
                // Kill may race with a natural exit; either way reap the child
                let _ = child.kill();
                let _ = child.wait();
                tracing::debug!("runtime command killed after timeout");
                Ok(TimedOutput::TimedOut)
            }
        }
    }
}

/// Poll `try_wait` until the child exits or the deadline passes. The child
/// is killed and reaped if the run is interrupted.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    clock: &dyn Clock,
    interrupt: &Interrupt,
) -> Result<Option<ExitStatus>> {
    let start = clock.now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {
                if interrupt.is_set() {
                    let _ = child.kill();
                    let _ = child.wait();
                    tracing::debug!("runtime command killed after interrupt");
                    return Err(CheckError::Interrupted);
                }
                if clock.now().duration_since(start) >= timeout {
                    return Ok(None);
                }
                clock.sleep(POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CheckError::RuntimeError(format!(
                    "Failed to monitor child process: {}",
                    e
                )));
            }
        }
    }
}
