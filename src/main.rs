use anyhow::Context;
use clap::builder::FalseyValueParser;
use clap::Parser;
use colored::Colorize;
use redis_image_check::cli;
use redis_image_check::cli::run::RunOptions;
use redis_image_check::logging;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "redis-image-check")]
#[command(about = "Integration tests for a Redis server container image", long_about = None)]
#[command(version)]
struct Cli {
    /// Image under test
    #[arg(long, env = "IMAGE_NAME")]
    image: Option<String>,

    /// Redis version the image is expected to report
    #[arg(long = "redis-version", env = "VERSION")]
    redis_version: Option<String>,

    /// Target OS of the image (fedora skips the version check)
    #[arg(long, env = "OS")]
    os: Option<String>,

    /// Test cases to run, separated by spaces or commas (default: all)
    #[arg(long, env = "TESTS")]
    tests: Option<String>,

    /// Stop after the first failing test case
    #[arg(long, env = "FAIL_QUICKLY", value_parser = FalseyValueParser::new())]
    fail_quickly: bool,

    /// Trace every container runtime invocation
    #[arg(long, env = "DEBUG", value_parser = FalseyValueParser::new())]
    debug: bool,

    /// Container runtime CLI to drive
    #[arg(long, env = "CONTAINER_RUNTIME", default_value = "docker")]
    runtime: String,

    /// YAML file with tuning overrides
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the available test cases and exit
    #[arg(long)]
    list: bool,

    /// With --list, print JSON with descriptions
    #[arg(long, requires = "list")]
    json: bool,
}

fn run(args: Cli) -> anyhow::Result<ExitCode> {
    if args.list {
        cli::list::run(args.json).context("Failed to list test cases")?;
        return Ok(ExitCode::SUCCESS);
    }

    let report = cli::run::run(RunOptions {
        image: args.image,
        version: args.redis_version,
        os: args.os,
        tests: args.tests,
        fail_quickly: args.fail_quickly,
        debug: args.debug,
        runtime: args.runtime,
        config: args.config,
    })
    .context("Test run aborted")?;

    Ok(ExitCode::from(report.exit_code()))
}

fn main() -> ExitCode {
    let args = Cli::parse();
    logging::init(args.debug);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", format!("Error: {:#}", e).red());
            ExitCode::FAILURE
        }
    }
}
