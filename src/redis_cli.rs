// Talks to a Redis container through redis-cli from a throwaway container
// of the same image, so no client needs to be installed on the host.

use crate::errors::Result;
use crate::runtime::{CommandOutput, ContainerRuntime};

pub struct RedisCli<'a> {
    runtime: &'a dyn ContainerRuntime,
    image: &'a str,
}

impl<'a> RedisCli<'a> {
    pub fn new(runtime: &'a dyn ContainerRuntime, image: &'a str) -> Self {
        Self { runtime, image }
    }

    /// Argument list for `run --rm IMAGE redis-cli -h HOST [-a PASSWORD] ...`.
    /// An empty password means no `-a` at all.
    pub fn command_args(&self, host: &str, password: &str, command: &[&str]) -> Vec<String> {
        let mut out = vec![
            "run".to_string(),
            "--rm".to_string(),
            self.image.to_string(),
            "redis-cli".to_string(),
            "-h".to_string(),
            host.to_string(),
        ];
        if !password.is_empty() {
            out.push("-a".to_string());
            out.push(password.to_string());
        }
        out.extend(command.iter().map(|c| c.to_string()));
        out
    }

    pub fn cmd(&self, host: &str, password: &str, command: &[&str]) -> Result<CommandOutput> {
        self.runtime.run(&self.command_args(host, password, command))
    }

    /// True when `ping` answers exactly `PONG`
    pub fn ping(&self, host: &str, password: &str) -> Result<bool> {
        let out = self.cmd(host, password, &["ping"])?;
        Ok(out.stdout_trimmed() == "PONG")
    }
}
