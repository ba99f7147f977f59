use crate::cases::{parse_test_list, TestCase};
use crate::clock::SystemClock;
use crate::config::{required, Settings, Tuning};
use crate::containers::ContainerSet;
use crate::errors::{CheckError, Result};
use crate::interrupt::Interrupt;
use crate::runtime::{args, CliRuntime, ContainerRuntime};
use crate::suite::{run_suite, SuiteReport};
use std::env;
use std::path::PathBuf;

/// Raw options as they arrive from flags and environment
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub image: Option<String>,
    pub version: Option<String>,
    pub os: Option<String>,
    pub tests: Option<String>,
    pub fail_quickly: bool,
    pub debug: bool,
    pub runtime: String,
    pub config: Option<PathBuf>,
}

/// Validate options and resolve the tuning file
pub fn settings_from(opts: RunOptions) -> Result<Settings> {
    let image = required(opts.image, "image", "IMAGE_NAME", "image")?;
    let version = required(opts.version, "version", "VERSION", "redis-version")?;
    let os = required(opts.os, "os", "OS", "os")?;

    // A list with no names in it (blank, or only separators) selects everything
    let tests = match opts.tests.as_deref().map(parse_test_list).transpose()? {
        Some(cases) if !cases.is_empty() => cases,
        _ => TestCase::all().to_vec(),
    };

    if opts.runtime.trim().is_empty() {
        return Err(CheckError::ConfigError(
            "Container runtime must not be empty".to_string(),
        ));
    }

    let tuning = Tuning::discover(opts.config.as_deref(), &env::current_dir()?)?;

    Ok(Settings {
        image,
        version,
        os,
        tests,
        fail_quickly: opts.fail_quickly,
        debug: opts.debug,
        runtime: opts.runtime,
        tuning,
    })
}

/// The image must exist locally before any container is started
pub fn ensure_image(runtime: &dyn ContainerRuntime, image: &str) -> Result<()> {
    let out = runtime.run(&args(&["image", "inspect", image]))?;
    if !out.success() {
        return Err(CheckError::ImageNotFound(image.to_string()));
    }
    Ok(())
}

/// Run the selected test set. Containers are cleaned up before the summary
/// is printed, whatever the outcome, including SIGINT/SIGTERM.
pub fn run(opts: RunOptions) -> Result<SuiteReport> {
    let settings = settings_from(opts)?;
    let interrupt = Interrupt::new();
    interrupt.install()?;
    let runtime = CliRuntime::new(settings.runtime.clone()).with_interrupt(interrupt.clone());
    tracing::debug!(
        image = %settings.image,
        runtime = %settings.runtime,
        tests = settings.tests.len(),
        "starting test run"
    );

    ensure_image(&runtime, &settings.image)?;

    let mut containers =
        ContainerSet::new(&runtime, &settings.image)?.with_interrupt(interrupt.clone());
    let report = run_suite(&settings, &containers, &SystemClock);
    if interrupt.is_set() {
        tracing::debug!("run interrupted, cleaning up");
    }
    containers.cleanup();

    report.print_summary();
    Ok(report)
}
