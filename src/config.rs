use crate::cases::TestCase;
use crate::errors::{CheckError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the per-directory tuning file
pub const CONFIG_FILE_NAME: &str = ".redis-image-check.yml";

/// Knobs that rarely change between runs, loaded from YAML
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tuning {
    /// How many times to try `ping` before giving up on a container
    pub connect_attempts: u32,
    pub connect_interval_secs: u64,
    /// How long a run with invalid input may live before it counts as accepted
    pub creation_timeout_secs: u64,
    /// Arbitrary UID for the alternate-user cases
    pub alt_uid: u32,
    pub password: String,
    /// `REDIS_PASSWORD` values the image entrypoint must refuse
    pub invalid_passwords: Vec<String>,
    /// Extended regexes that must all match `/help.1`
    pub doc_terms: Vec<String>,
    /// Data directory inside the image, used for the persistence volume
    pub data_mount: String,
    /// Values of OS for which the `redis-server --version` check is skipped
    pub skip_version_check_os: Vec<String>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            connect_attempts: 10,
            connect_interval_secs: 2,
            creation_timeout_secs: 60,
            alt_uid: 12345,
            password: "pass".to_string(),
            invalid_passwords: vec![
                "pass with space".to_string(),
                "pass\"quote".to_string(),
                "pass'quote".to_string(),
                "pass`tick".to_string(),
                "pass\\backslash".to_string(),
            ],
            doc_terms: vec!["REDIS.*PASSWORD".to_string(), "volume".to_string()],
            data_mount: "/var/lib/redis/data".to_string(),
            skip_version_check_os: vec!["fedora".to_string()],
        }
    }
}

impl Tuning {
    /// Load tuning from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CheckError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        // An empty file deserializes to unit, not to an empty mapping
        if content.trim().is_empty() {
            return Ok(Tuning::default());
        }

        let tuning: Tuning = serde_yml::from_str(&content).map_err(|e| {
            CheckError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        tuning.validate()?;

        Ok(tuning)
    }

    /// Resolve the tuning file: an explicit path must exist, otherwise the
    /// working directory and then the user config directory are searched.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(CheckError::ConfigError(format!(
                    "Config file {} does not exist",
                    path.display()
                )));
            }
            return Self::load(path);
        }

        match Self::candidates(cwd).into_iter().find(|p| p.exists()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading tuning file");
                Self::load(&path)
            }
            None => Ok(Tuning::default()),
        }
    }

    fn candidates(cwd: &Path) -> Vec<PathBuf> {
        let mut paths = vec![cwd.join(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("redis-image-check").join("config.yml"));
        }
        paths
    }

    pub fn validate(&self) -> Result<()> {
        if self.connect_attempts == 0 {
            return Err(CheckError::ConfigError(
                "connect_attempts must be at least 1".to_string(),
            ));
        }
        if self.password.is_empty() {
            return Err(CheckError::ConfigError(
                "password must not be empty; the no-password cases cover that".to_string(),
            ));
        }
        for term in &self.doc_terms {
            regex::Regex::new(term).map_err(|e| {
                CheckError::ConfigError(format!("Invalid doc term '{}': {}", term, e))
            })?;
        }
        Ok(())
    }

    pub fn connect_interval(&self) -> Duration {
        Duration::from_secs(self.connect_interval_secs)
    }

    pub fn creation_timeout(&self) -> Duration {
        Duration::from_secs(self.creation_timeout_secs)
    }
}

/// Everything one run of the harness needs to know
#[derive(Debug, Clone)]
pub struct Settings {
    pub image: String,
    /// Expected Redis version string, matched against `redis-server --version`
    pub version: String,
    pub os: String,
    pub tests: Vec<TestCase>,
    pub fail_quickly: bool,
    pub debug: bool,
    /// Container CLI program
    pub runtime: String,
    pub tuning: Tuning,
}

impl Settings {
    /// Whether this OS skips the server version check
    pub fn skips_version_check(&self) -> bool {
        self.tuning
            .skip_version_check_os
            .iter()
            .any(|os| os.eq_ignore_ascii_case(&self.os))
    }
}

/// Require a non-empty value for a mandatory setting
pub fn required(
    value: Option<String>,
    name: &'static str,
    env: &'static str,
    flag: &'static str,
) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CheckError::MissingSetting(name, env, flag)),
    }
}
