/// Common test utilities for redis-image-check integration tests
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tempfile::TempDir;

/// Shell script standing in for docker. It logs every invocation and answers
/// the calls the harness makes the way a healthy image would.
const FAKE_RUNTIME: &str = r##"#!/bin/sh
echo "$*" >> "$FAKE_RUNTIME_LOG"
write_cidfile() {
  prev=""
  for a in "$@"; do
    if [ "$prev" = "--cidfile" ]; then echo "fakecid0001" > "$a"; fi
    prev="$a"
  done
}
case "$*" in
  "image inspect missing/"*)
    echo "Error: No such image" >&2
    exit 1 ;;
  "image inspect"*)
    echo "[]" ;;
  *" -d "*)
    write_cidfile "$@"
    echo "fakecid0001" ;;
  "run --cidfile"*REDIS_PASSWORD=*)
    write_cidfile "$@"
    echo "Password contains invalid characters" >&2
    exit 1 ;;
  *IPAddress*)
    echo "172.17.0.2" ;;
  *State.ExitCode*)
    echo "0" ;;
  *--version*)
    echo "Redis server v=7.2.4 sha=00000000:0 malloc=jemalloc-5.3.0 bits=64" ;;
  *"cat /help.1"*)
    if [ -n "$FAKE_HELP_BROKEN" ]; then
      echo "# Redis image"
    else
      printf '.TH REDIS 1\n.SH NAME\nredis\n.PP\nSet REDIS_PASSWORD and mount a volume.\n'
    fi ;;
  *"-a pass_foo"*)
    echo "AUTH failed: WRONGPASS invalid username-password pair" ;;
  *" ping")
    if [ -n "$FAKE_NO_PONG" ]; then
      echo "Could not connect to Redis" >&2
      exit 1
    fi
    echo "PONG" ;;
  *"get b")
    echo "2" ;;
esac
exit 0
"##;

/// A temporary directory holding the fake runtime, its call log and the
/// working directory for the harness
pub struct FakeRuntime {
    pub temp_dir: TempDir,
    pub script: PathBuf,
    pub log: PathBuf,
}

impl FakeRuntime {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let script = temp_dir.path().join("fake-docker");
        let log = temp_dir.path().join("calls.log");

        fs::write(&script, FAKE_RUNTIME).expect("Failed to write fake runtime");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755))
                .expect("Failed to make fake runtime executable");
        }
        fs::write(&log, "").expect("Failed to create call log");

        FakeRuntime {
            temp_dir,
            script,
            log,
        }
    }

    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Every runtime invocation so far, one argument line each
    #[allow(dead_code)]
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .expect("Failed to read call log")
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    #[allow(dead_code)]
    pub fn count(&self, needle: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(needle)).count()
    }

    fn command(&self, envs: &[(&str, &str)], args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_redis-image-check"));
        for var in [
            "IMAGE_NAME",
            "VERSION",
            "OS",
            "TESTS",
            "FAIL_QUICKLY",
            "DEBUG",
            "CONTAINER_RUNTIME",
            "RUST_LOG",
        ] {
            cmd.env_remove(var);
        }
        cmd.env("NO_COLOR", "1")
            .env("XDG_CONFIG_HOME", self.temp_dir.path())
            .env("FAKE_RUNTIME_LOG", &self.log)
            .env("CONTAINER_RUNTIME", &self.script)
            .envs(envs.iter().copied())
            .args(args)
            .current_dir(self.temp_dir.path());
        cmd
    }

    /// Start the harness in the background with piped output
    #[allow(dead_code)]
    pub fn spawn(&self, envs: &[(&str, &str)]) -> Child {
        self.command(envs, &[])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to start redis-image-check")
    }

    /// Run the harness with a clean environment plus `envs`
    pub fn check(&self, envs: &[(&str, &str)], args: &[&str]) -> CommandResult {
        let output = self
            .command(envs, args)
            .output()
            .expect("Failed to execute redis-image-check");

        CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            exit_code: output.status.code(),
        }
    }
}

/// Required settings for a run against the fake image
#[allow(dead_code)]
pub fn image_env() -> Vec<(&'static str, &'static str)> {
    vec![
        ("IMAGE_NAME", "quay.io/test/redis-7"),
        ("VERSION", "7.2"),
        ("OS", "rhel9"),
    ]
}

/// Result of running a command
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: Option<i32>,
}

impl CommandResult {
    /// Assert the command succeeded
    #[allow(dead_code)]
    pub fn assert_success(&self) {
        if !self.success {
            panic!(
                "Command failed:\nstdout: {}\nstderr: {}\nexit code: {:?}",
                self.stdout, self.stderr, self.exit_code
            );
        }
    }

    /// Assert the command exited with status 1
    #[allow(dead_code)]
    pub fn assert_failure(&self) {
        if self.exit_code != Some(1) {
            panic!(
                "Expected exit code 1, got {:?}:\nstdout: {}\nstderr: {}",
                self.exit_code, self.stdout, self.stderr
            );
        }
    }

    /// Assert stdout contains text
    #[allow(dead_code)]
    pub fn assert_stdout_contains(&self, text: &str) {
        assert!(
            self.stdout.contains(text),
            "stdout does not contain '{}'\nstdout: {}",
            text,
            self.stdout
        );
    }

    /// Assert stderr contains text
    #[allow(dead_code)]
    pub fn assert_stderr_contains(&self, text: &str) {
        assert!(
            self.stderr.contains(text),
            "stderr does not contain '{}'\nstderr: {}",
            text,
            self.stderr
        );
    }
}
