// The named test cases run against the image
use crate::clock::Clock;
use crate::config::Settings;
use crate::containers::{ContainerSet, ContainerSpec};
use crate::docs;
use crate::errors::{CheckError, Result};
use crate::probe::{self, RetryPolicy};
use crate::redis_cli::RedisCli;
use crate::runtime::TimedOutput;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestCase {
    ContainerCreation,
    NoRoot,
    NoPass,
    NoPassAltUid,
    NoRootAltUid,
    ChangePassword,
    Doc,
}

impl TestCase {
    /// Default test set, in execution order
    pub fn all() -> &'static [TestCase] {
        &[
            TestCase::ContainerCreation,
            TestCase::NoRoot,
            TestCase::NoPass,
            TestCase::NoPassAltUid,
            TestCase::NoRootAltUid,
            TestCase::ChangePassword,
            TestCase::Doc,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestCase::ContainerCreation => "run_container_creation_tests",
            TestCase::NoRoot => "run_tests_no_root",
            TestCase::NoPass => "run_tests_no_pass",
            TestCase::NoPassAltUid => "run_tests_no_pass_altuid",
            TestCase::NoRootAltUid => "run_tests_no_root_altuid",
            TestCase::ChangePassword => "run_change_password_test",
            TestCase::Doc => "run_doc_test",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TestCase::ContainerCreation => "invalid REDIS_PASSWORD values are refused at startup",
            TestCase::NoRoot => "general checks with a password",
            TestCase::NoPass => "general checks without a password",
            TestCase::NoPassAltUid => "general checks without a password as an arbitrary UID",
            TestCase::NoRootAltUid => "general checks with a password as an arbitrary UID",
            TestCase::ChangePassword => "data survives a restart and the new password replaces the old",
            TestCase::Doc => "/help.1 documents the image in troff format",
        }
    }

    pub fn parse_case(s: &str) -> Option<Self> {
        TestCase::all().iter().copied().find(|c| c.as_str() == s)
    }

    pub fn run(&self, harness: &Harness<'_>) -> Result<()> {
        let password = harness.settings.tuning.password.as_str();
        let alt_uid = harness.settings.tuning.alt_uid;

        match self {
            TestCase::ContainerCreation => run_container_creation_tests(harness),
            TestCase::NoRoot => run_tests(harness, "no_root", Some(password), None),
            TestCase::NoPass => run_tests(harness, "no_pass", None, None),
            TestCase::NoPassAltUid => run_tests(harness, "no_pass_altuid", None, Some(alt_uid)),
            TestCase::NoRootAltUid => {
                run_tests(harness, "no_root_altuid", Some(password), Some(alt_uid))
            }
            TestCase::ChangePassword => run_change_password_test(harness),
            TestCase::Doc => run_doc_test(harness),
        }
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestCase {
    type Err = CheckError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse_case(s).ok_or_else(|| {
            CheckError::UnknownTestCase(
                s.to_string(),
                TestCase::all().iter().map(|c| c.to_string()).collect(),
            )
        })
    }
}

/// Parse a test list separated by whitespace and/or commas, keeping order.
/// A case named twice runs once, at its first position.
pub fn parse_test_list(list: &str) -> Result<Vec<TestCase>> {
    let mut cases = Vec::new();
    for name in list
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
    {
        let case: TestCase = name.parse()?;
        if !cases.contains(&case) {
            cases.push(case);
        }
    }
    Ok(cases)
}

/// What a test case gets to work with
pub struct Harness<'a> {
    pub settings: &'a Settings,
    pub containers: &'a ContainerSet<'a>,
    pub clock: &'a dyn Clock,
}

impl<'a> Harness<'a> {
    fn redis(&self) -> RedisCli<'a> {
        RedisCli::new(self.containers.runtime(), &self.settings.image)
    }

    fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.settings.tuning.connect_attempts,
            interval: self.settings.tuning.connect_interval(),
        }
    }

    fn wait_for_connection(&self, name: &str, password: &str) -> Result<String> {
        probe::wait_for_connection(self.containers, name, password, self.policy(), self.clock)
    }
}

/// Soft assertions: a failure is remembered and the case carries on
#[derive(Debug, Default)]
struct Checks {
    failures: Vec<String>,
}

impl Checks {
    fn check(&mut self, ok: bool, what: impl Into<String>) {
        if !ok {
            let what = what.into();
            println!("    FAILED: {}", what);
            self.failures.push(what);
        }
    }

    fn record(&mut self, result: Result<()>) {
        if let Err(e) = result {
            self.check(false, e.to_string());
        }
    }

    fn finish(self) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(CheckError::AssertionFailed(self.failures.join("; ")))
        }
    }
}

/// A run with invalid input must exit on its own with a small non-zero
/// status. Exit codes above 10 belong to the runtime or a signal, not to
/// the entrypoint refusing the input.
pub fn creation_refused(result: &TimedOutput) -> bool {
    match result {
        TimedOutput::Finished(out) => matches!(out.exit_code, Some(1..=10)),
        TimedOutput::TimedOut => false,
    }
}

fn run_container_creation_tests(h: &Harness<'_>) -> Result<()> {
    println!("  Testing image entrypoint usage");
    let mut checks = Checks::default();
    let timeout = h.settings.tuning.creation_timeout();

    for (i, password) in h.settings.tuning.invalid_passwords.iter().enumerate() {
        let name = format!("creation_{}", i);
        let spec = ContainerSpec::new().password(Some(password));
        let result = h.containers.run_bounded(&name, &spec, timeout)?;

        if let TimedOutput::TimedOut = result {
            println!(
                "    Container with REDIS_PASSWORD='{}' still running after {}s",
                password,
                timeout.as_secs()
            );
        }
        checks.check(
            creation_refused(&result),
            format!(
                "container creation with REDIS_PASSWORD='{}' should have failed",
                password
            ),
        );
    }

    checks.finish()?;
    println!("  Success!");
    println!();
    Ok(())
}

/// `ping` must grant or deny access as expected
fn assert_login_access(
    h: &Harness<'_>,
    ip: &str,
    password: &str,
    expect_granted: bool,
) -> Result<()> {
    let granted = h.redis().ping(ip, password)?;
    match (granted, expect_granted) {
        (true, true) => {
            println!("    Connection ({}) access granted as expected", password);
            Ok(())
        }
        (false, false) => {
            println!("    Connection ({}) access denied as expected", password);
            Ok(())
        }
        _ => Err(CheckError::AssertionFailed(format!(
            "Connection ({}) login assertion failed",
            password
        ))),
    }
}

/// redis-cli inside the container must reach the local server
fn assert_local_access(h: &Harness<'_>, name: &str) -> Result<()> {
    let out = h.containers.exec(name, &["bash", "-c", "redis-cli ping"])?;
    if !out.success() {
        return Err(CheckError::AssertionFailed(format!(
            "local redis-cli ping in '{}' exited with {:?}",
            name, out.exit_code
        )));
    }
    Ok(())
}

/// The server version must be visible through every way of entering the image
fn check_version_usage(h: &Harness<'_>, name: &str, command: &str, expected: &str) -> Result<()> {
    println!("  Testing the image version");
    let probes: [(String, Vec<&str>); 3] = [
        (
            format!("/bin/bash -c \"{}\"", command),
            vec!["/bin/bash", "-c", command],
        ),
        (
            format!("exec /bin/bash -c \"{}\"", command),
            vec!["/bin/bash", "-c", command],
        ),
        (
            format!("exec /bin/sh -ic \"{}\"", command),
            vec!["/bin/sh", "-ic", command],
        ),
    ];

    for (i, (label, argv)) in probes.iter().enumerate() {
        let out = if i == 0 {
            h.containers.run_oneshot(argv)?
        } else {
            h.containers.exec(name, argv)?
        };
        let text = out.combined();
        if !text.contains(expected) {
            return Err(CheckError::AssertionFailed(format!(
                "ERROR[{}] Expected '{}', got '{}'",
                label,
                expected,
                text.trim()
            )));
        }
    }
    Ok(())
}

fn check_redis_data(
    h: &Harness<'_>,
    ip: &str,
    password: &str,
    checks: &mut Checks,
) -> Result<()> {
    println!("  Testing Redis (password='{}')", password);
    let redis = h.redis();

    let set_a = redis.cmd(ip, password, &["set", "a", "1"])?;
    checks.check(set_a.success(), "set a 1");
    let set_b = redis.cmd(ip, password, &["set", "b", "2"])?;
    checks.check(set_b.success(), "set b 2");
    let get_b = redis.cmd(ip, password, &["get", "b"])?;
    checks.check(
        get_b.stdout_trimmed() == "2",
        format!("get b returned '{}', expected '2'", get_b.stdout_trimmed()),
    );

    println!("  Success!");
    println!();
    Ok(())
}

/// General checks for one container configuration
fn run_tests(
    h: &Harness<'_>,
    name: &str,
    password: Option<&str>,
    user: Option<u32>,
) -> Result<()> {
    let mut spec = ContainerSpec::new().password(password);
    if let Some(uid) = user {
        spec = spec.user(uid);
    }
    let password = password.unwrap_or("");

    h.containers.create(name, &spec)?;
    let ip = h.wait_for_connection(name, password)?;

    let mut checks = Checks::default();
    if !h.settings.skips_version_check() {
        checks.record(check_version_usage(
            h,
            name,
            "redis-server --version",
            &h.settings.version,
        ));
    }

    println!("  Testing login accesses");
    assert_login_access(h, &ip, password, true)?;
    if !password.is_empty() {
        assert_login_access(h, &ip, &format!("{}_foo", password), false)?;
    }

    checks.record(assert_local_access(h, name));
    check_redis_data(h, &ip, password, &mut checks)?;

    checks.finish()
}

/// Open up a directory tree so an arbitrary container UID can write to it
fn make_world_writable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(0o777))?;
        if path.is_dir() {
            for entry in fs::read_dir(path)? {
                make_world_writable(&entry?.path())?;
            }
        }
    }
    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

fn run_change_password_test(h: &Harness<'_>) -> Result<()> {
    let data_dir = h.containers.scratch_dir("change_password")?;
    fs::create_dir(data_dir.join("data"))?;
    make_world_writable(&data_dir)?;
    let mount = format!("{}:{}:Z", data_dir.display(), h.settings.tuning.data_mount);
    let mut checks = Checks::default();

    // Initial password, plus a key that must survive the restart
    h.containers.create(
        "testpass1",
        &ContainerSpec::new().password(Some("foo")).volume(mount.clone()),
    )?;
    let ip = h.wait_for_connection("testpass1", "foo")?;
    let redis = h.redis();
    let set = redis.cmd(&ip, "foo", &["set", "persisted", "yes"])?;
    checks.check(set.success(), "set persisted yes");
    let save = redis.cmd(&ip, "foo", &["save"])?;
    checks.check(save.success(), "save");
    h.containers.stop("testpass1")?;

    // Same volume, changed password
    h.containers.create(
        "testpass2",
        &ContainerSpec::new().password(Some("bar")).volume(mount),
    )?;
    let ip = h.wait_for_connection("testpass2", "bar")?;

    assert_login_access(h, &ip, "bar", true)?;
    assert_login_access(h, &ip, "foo", false)?;

    let get = redis.cmd(&ip, "bar", &["get", "persisted"])?;
    checks.check(
        get.stdout_trimmed() == "yes",
        format!(
            "data did not survive the restart: get persisted returned '{}'",
            get.stdout_trimmed()
        ),
    );

    checks.finish()
}

fn run_doc_test(h: &Harness<'_>) -> Result<()> {
    println!("  Testing documentation in the container image");
    let content = docs::fetch_help(h.containers)?;
    docs::check_help(&content, &h.settings.tuning.doc_terms)?;
    println!("  Success!");
    println!();
    Ok(())
}
