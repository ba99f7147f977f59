// Runs the selected test cases and aggregates their results
use crate::cases::{Harness, TestCase};
use crate::clock::Clock;
use crate::config::Settings;
use crate::containers::ContainerSet;
use chrono::{DateTime, Local};
use colored::Colorize;
use std::time::Duration;

/// Label used for this suite in the summary
pub const SUITE_NAME: &str = "redis_tests";

#[derive(Debug, Clone)]
pub struct CaseResult {
    pub case: TestCase,
    pub passed: bool,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl CaseResult {
    pub fn summary_line(&self) -> String {
        format!(
            "[{}] for '{}' {} ({})",
            if self.passed { "PASSED" } else { "FAILED" },
            SUITE_NAME,
            self.case,
            format_duration(self.elapsed)
        )
    }
}

#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub image: String,
    pub started: DateTime<Local>,
    pub results: Vec<CaseResult>,
    /// Cases skipped because fail-quickly or an interrupt stopped the run
    pub skipped: Vec<TestCase>,
    /// SIGINT/SIGTERM arrived during the run
    pub interrupted: bool,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed) && self.skipped.is_empty() && !self.interrupted
    }

    pub fn failed_cases(&self) -> Vec<TestCase> {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.case)
            .collect()
    }

    /// Process exit status for this report
    pub fn exit_code(&self) -> u8 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Tests were run for image {}\n", self.image));
        out.push_str(&format!(
            "Started at {}\n",
            self.started.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str("Test cases results:\n");
        for result in &self.results {
            out.push_str(&result.summary_line());
            out.push('\n');
        }
        for case in &self.skipped {
            out.push_str(&format!("[SKIPPED] for '{}' {}\n", SUITE_NAME, case));
        }
        if self.interrupted {
            out.push_str("Run interrupted before all test cases finished.\n");
        }
        out.push_str(&format!(
            "Tests for {} {}.\n",
            self.image,
            if self.passed() { "succeeded" } else { "failed" }
        ));
        out
    }

    /// Print the summary with colored result lines
    pub fn print_summary(&self) {
        println!();
        for line in self.summary().lines() {
            if line.starts_with("[PASSED]") {
                println!("{}", line.green());
            } else if line.starts_with("[FAILED]") {
                println!("{}", line.red());
            } else if line.starts_with("[SKIPPED]") {
                println!("{}", line.yellow());
            } else {
                println!("{}", line);
            }
        }
    }
}

/// `HH:MM:SS`, hours unbounded
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Run every selected case in order. With fail-quickly the run stops at
/// the first failure and the remaining cases are reported as skipped.
pub fn run_suite(
    settings: &Settings,
    containers: &ContainerSet<'_>,
    clock: &dyn Clock,
) -> SuiteReport {
    let harness = Harness {
        settings,
        containers,
        clock,
    };
    let mut report = SuiteReport {
        image: settings.image.clone(),
        started: Local::now(),
        results: Vec::new(),
        skipped: Vec::new(),
        interrupted: false,
    };

    for (i, case) in settings.tests.iter().enumerate() {
        if containers.interrupt().is_set() {
            report.skipped = settings.tests[i..].to_vec();
            break;
        }
        println!("{}", format!("Running test {} ...", case).bold());
        let start = clock.now();
        let outcome = case.run(&harness);
        let elapsed = clock.now().duration_since(start);

        let result = match outcome {
            Ok(()) => CaseResult {
                case: *case,
                passed: true,
                elapsed,
                error: None,
            },
            Err(e) => {
                eprintln!("{}", format!("Test {} failed: {}", case, e).red());
                CaseResult {
                    case: *case,
                    passed: false,
                    elapsed,
                    error: Some(e.to_string()),
                }
            }
        };
        let failed = !result.passed;
        report.results.push(result);

        if failed && settings.fail_quickly {
            eprintln!("{}", "Stopping after first failure (fail quickly)".yellow());
            report.skipped = settings.tests[i + 1..].to_vec();
            break;
        }
    }

    report.interrupted = containers.interrupt().is_set();
    report
}
