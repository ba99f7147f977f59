// Scripted runtime for unit tests
use super::{CommandOutput, ContainerRuntime, TimedOutput};
use crate::errors::Result;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone)]
enum Reply {
    Output(CommandOutput),
    TimedOut,
}

struct Rule {
    needle: String,
    reply: Reply,
    remaining: Option<usize>,
}

/// Answers runtime calls from a list of rules matched against the joined
/// argument line. Rules are tried in insertion order; unmatched calls succeed
/// with empty output. A successful call carrying `--cidfile PATH` writes a
/// fake container id into PATH, like the real CLI does.
pub struct FakeRuntime {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, needle: &str, reply: Reply, remaining: Option<usize>) -> &Self {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.to_string(),
            reply,
            remaining,
        });
        self
    }

    /// Always answer calls containing `needle`
    pub fn on(&self, needle: &str, stdout: &str, exit_code: i32) -> &Self {
        self.push(needle, Reply::Output(output(stdout, exit_code)), None)
    }

    /// Answer the next call containing `needle` once
    pub fn once(&self, needle: &str, stdout: &str, exit_code: i32) -> &Self {
        self.push(needle, Reply::Output(output(stdout, exit_code)), Some(1))
    }

    /// Calls containing `needle` behave like a process killed at its deadline
    pub fn on_timeout(&self, needle: &str) -> &Self {
        self.push(needle, Reply::TimedOut, None)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(needle)).count()
    }

    fn answer(&self, args: &[String]) -> Reply {
        let line = args.join(" ");
        self.calls.lock().unwrap().push(line.clone());

        let mut rules = self.rules.lock().unwrap();
        let reply = rules
            .iter_mut()
            .find(|r| line.contains(&r.needle) && r.remaining != Some(0))
            .map(|r| {
                if let Some(n) = r.remaining.as_mut() {
                    *n -= 1;
                }
                r.reply.clone()
            })
            .unwrap_or_else(|| Reply::Output(output("", 0)));

        if let Reply::Output(out) = &reply {
            if out.success() {
                write_cidfile(args);
            }
        }
        reply
    }
}

fn output(stdout: &str, exit_code: i32) -> CommandOutput {
    CommandOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
        exit_code: Some(exit_code),
    }
}

fn write_cidfile(args: &[String]) {
    if let Some(pos) = args.iter().position(|a| a == "--cidfile") {
        if let Some(path) = args.get(pos + 1) {
            let path = Path::new(path);
            let name = path.file_name().unwrap().to_string_lossy();
            std::fs::write(path, format!("cid-{}", name)).unwrap();
        }
    }
}

impl ContainerRuntime for FakeRuntime {
    fn program(&self) -> &str {
        "fake"
    }

    fn run(&self, args: &[String]) -> Result<CommandOutput> {
        match self.answer(args) {
            Reply::Output(out) => Ok(out),
            Reply::TimedOut => Ok(CommandOutput {
                exit_code: None,
                ..Default::default()
            }),
        }
    }

    fn run_with_timeout(&self, args: &[String], _timeout: Duration) -> Result<TimedOutput> {
        match self.answer(args) {
            Reply::Output(out) => Ok(TimedOutput::Finished(out)),
            Reply::TimedOut => Ok(TimedOutput::TimedOut),
        }
    }
}
