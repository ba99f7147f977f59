// Containers launched from the image under test, tracked by CID file
// Every container is recorded in a CID file so cleanup can find it later,
// even when the test case that created it bailed out early.

use crate::errors::{CheckError, Result};
use crate::interrupt::Interrupt;
use crate::runtime::{args, CommandOutput, ContainerRuntime, TimedOutput};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// How a container should be started
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Run as this UID instead of the image default
    pub user: Option<u32>,
    pub env: Vec<(String, String)>,
    /// `host:container[:options]` bind mounts
    pub volumes: Vec<String>,
}

impl ContainerSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, uid: u32) -> Self {
        self.user = Some(uid);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn volume(mut self, mount: impl Into<String>) -> Self {
        self.volumes.push(mount.into());
        self
    }

    /// Password passed to the entrypoint, if any
    pub fn password(self, password: Option<&str>) -> Self {
        match password {
            Some(p) => self.env("REDIS_PASSWORD", p),
            None => self,
        }
    }

    /// Runtime options that go before `--cidfile` (user switch)
    fn leading_args(&self) -> Vec<String> {
        match self.user {
            Some(uid) => vec!["-u".to_string(), uid.to_string()],
            None => Vec::new(),
        }
    }

    /// Runtime options that go after `-d` (environment, volumes)
    fn trailing_args(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (key, value) in &self.env {
            out.push("-e".to_string());
            out.push(format!("{}={}", key, value));
        }
        for volume in &self.volumes {
            out.push("-v".to_string());
            out.push(volume.clone());
        }
        out
    }
}

/// Registry of named containers for one harness run
pub struct ContainerSet<'a> {
    runtime: &'a dyn ContainerRuntime,
    image: String,
    cid_dir: TempDir,
    /// Host directories handed to containers as volumes
    scratch: TempDir,
    interrupt: Interrupt,
    cleaned: bool,
}

impl<'a> ContainerSet<'a> {
    pub fn new(runtime: &'a dyn ContainerRuntime, image: &str) -> Result<Self> {
        let cid_dir = tempfile::Builder::new()
            .prefix("redis_test_cidfiles")
            .tempdir()?;
        let scratch = tempfile::Builder::new()
            .prefix("redis_test_volumes")
            .tempdir()?;

        Ok(Self {
            runtime,
            image: image.to_string(),
            cid_dir,
            scratch,
            interrupt: Interrupt::new(),
            cleaned: false,
        })
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Flag raised when the run should stop early
    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    pub fn runtime(&self) -> &'a dyn ContainerRuntime {
        self.runtime
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn cid_dir(&self) -> &Path {
        self.cid_dir.path()
    }

    pub fn cidfile(&self, name: &str) -> PathBuf {
        self.cid_dir.path().join(name)
    }

    /// Create a fresh host directory that lives until the containers are gone
    pub fn scratch_dir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.scratch.path().join(name);
        if dir.exists() {
            return Err(CheckError::RuntimeError(format!(
                "Scratch directory '{}' is already in use",
                name
            )));
        }
        fs::create_dir(&dir)?;
        Ok(dir)
    }

    /// Build the detached `run` argument list for a named container
    pub fn create_args(&self, name: &str, spec: &ContainerSpec) -> Vec<String> {
        let mut out = vec!["run".to_string()];
        out.extend(spec.leading_args());
        out.push("--cidfile".to_string());
        out.push(self.cidfile(name).to_string_lossy().to_string());
        out.push("-d".to_string());
        out.extend(spec.trailing_args());
        out.push(self.image.clone());
        out
    }

    /// Start a detached container and record its id under `name`
    pub fn create(&self, name: &str, spec: &ContainerSpec) -> Result<String> {
        if self.cidfile(name).exists() {
            return Err(CheckError::RuntimeError(format!(
                "Container name '{}' is already in use",
                name
            )));
        }

        let output = self.runtime.run(&self.create_args(name, spec))?;
        if !output.success() {
            return Err(CheckError::RuntimeError(format!(
                "Failed to create container '{}': {}",
                name,
                output.stderr.trim()
            )));
        }

        let cid = output.stdout_trimmed().to_string();
        println!("Created container {}", cid);
        Ok(cid)
    }

    /// Container id recorded for `name`
    pub fn cid(&self, name: &str) -> Result<String> {
        let cid = fs::read_to_string(self.cidfile(name))
            .map_err(|_| CheckError::ContainerNotFound(name.to_string()))?;
        let cid = cid.trim().to_string();
        if cid.is_empty() {
            return Err(CheckError::ContainerNotFound(name.to_string()));
        }
        Ok(cid)
    }

    /// IP address of the container on the default bridge network
    pub fn ip(&self, name: &str) -> Result<String> {
        let cid = self.cid(name)?;
        let output = self.runtime.run(&args(&[
            "inspect",
            "--format={{.NetworkSettings.IPAddress}}",
            &cid,
        ]))?;

        let ip = output.stdout_trimmed();
        if !output.success() || ip.is_empty() {
            return Err(CheckError::RuntimeError(format!(
                "Could not determine IP address of container '{}'",
                name
            )));
        }
        Ok(ip.to_string())
    }

    /// Run a command inside the running container
    pub fn exec(&self, name: &str, command: &[&str]) -> Result<CommandOutput> {
        let cid = self.cid(name)?;
        let mut full = vec!["exec".to_string(), cid];
        full.extend(args(command));
        self.runtime.run(&full)
    }

    pub fn stop(&self, name: &str) -> Result<()> {
        let cid = self.cid(name)?;
        let output = self.runtime.run(&args(&["stop", &cid]))?;
        if !output.success() {
            return Err(CheckError::RuntimeError(format!(
                "Failed to stop container '{}': {}",
                name,
                output.stderr.trim()
            )));
        }
        Ok(())
    }

    pub fn logs(&self, name: &str) -> Result<String> {
        let cid = self.cid(name)?;
        let output = self.runtime.run(&args(&["logs", &cid]))?;
        Ok(output.combined())
    }

    /// Run a throwaway container of the image (`run --rm IMAGE command...`)
    pub fn run_oneshot(&self, command: &[&str]) -> Result<CommandOutput> {
        let mut full = args(&["run", "--rm", &self.image]);
        full.extend(args(command));
        self.runtime.run(&full)
    }

    /// Run a container in the foreground with a deadline. A run that
    /// finished is removed right away; one that timed out or was interrupted
    /// keeps its CID file so cleanup stops and removes it.
    pub fn run_bounded(
        &self,
        name: &str,
        spec: &ContainerSpec,
        timeout: Duration,
    ) -> Result<TimedOutput> {
        let mut full = vec!["run".to_string()];
        full.extend(spec.leading_args());
        full.push("--cidfile".to_string());
        full.push(self.cidfile(name).to_string_lossy().to_string());
        full.extend(spec.trailing_args());
        full.push(self.image.clone());

        let result = self.runtime.run_with_timeout(&full, timeout)?;
        if let TimedOutput::Finished(_) = result {
            self.discard(name)?;
        }
        Ok(result)
    }

    /// Remove an exited container and forget its CID file
    fn discard(&self, name: &str) -> Result<()> {
        let cidfile = self.cidfile(name);
        if let Ok(cid) = self.cid(name) {
            let rm = self.runtime.run(&args(&["rm", "-v", &cid]))?;
            if !rm.success() {
                tracing::debug!(cid = %cid, stderr = %rm.stderr.trim(), "rm failed");
            }
        }
        if cidfile.exists() {
            fs::remove_file(&cidfile)?;
        }
        Ok(())
    }

    /// Names of all containers that still have a CID file
    pub fn names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.cid_dir.path())? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(names)
    }

    /// Stop and remove every recorded container. Problems are reported as
    /// warnings; cleanup never fails the run.
    pub fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;

        let names = match self.names() {
            Ok(names) => names,
            Err(e) => {
                eprintln!("  ⚠ Warning: Failed to list CID files: {}", e);
                return;
            }
        };

        for name in names {
            if let Err(e) = self.remove_container(&name) {
                eprintln!("  ⚠ Warning: Failed to clean up '{}': {}", name, e);
            }
            let _ = fs::remove_file(self.cidfile(&name));
        }
    }

    fn remove_container(&self, name: &str) -> Result<()> {
        let cid = match self.cid(name) {
            Ok(cid) => cid,
            // Empty CID file: the runtime never got as far as creating it
            Err(CheckError::ContainerNotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        println!("Stopping and removing container {}...", cid);
        let stop = self.runtime.run(&args(&["stop", &cid]))?;
        if !stop.success() {
            tracing::debug!(cid = %cid, stderr = %stop.stderr.trim(), "stop failed");
        }

        let inspect = self
            .runtime
            .run(&args(&["inspect", "--format={{.State.ExitCode}}", &cid]))?;
        let exit_code = inspect.stdout_trimmed();
        if inspect.success() && !exit_code.is_empty() && exit_code != "0" {
            println!(
                "Container {} exited with code {}. Dumping logs:",
                cid, exit_code
            );
            let logs = self.runtime.run(&args(&["logs", &cid]))?;
            print!("{}", logs.combined());
        }

        let rm = self.runtime.run(&args(&["rm", "-v", &cid]))?;
        if !rm.success() {
            return Err(CheckError::RuntimeError(rm.stderr.trim().to_string()));
        }
        Ok(())
    }
}

impl Drop for ContainerSet<'_> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
