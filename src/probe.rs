// Bounded-retry wait for a Redis container to accept connections
use crate::clock::Clock;
use crate::containers::ContainerSet;
use crate::errors::{CheckError, Result};
use crate::redis_cli::RedisCli;
use std::time::Duration;

/// Retry policy for connection polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_secs(2),
        }
    }
}

/// Poll `ping` against the named container until it answers `PONG`.
/// On give-up the container logs are printed and a timeout error returned.
/// An interrupt ends the wait between attempts. Returns the container IP on
/// success.
pub fn wait_for_connection(
    containers: &ContainerSet<'_>,
    name: &str,
    password: &str,
    policy: RetryPolicy,
    clock: &dyn Clock,
) -> Result<String> {
    let ip = containers.ip(name)?;
    let cli = RedisCli::new(containers.runtime(), containers.image());

    println!(
        "  Testing Redis connection to {} (password='{}')...",
        ip, password
    );

    for attempt in 1..=policy.attempts {
        containers.interrupt().check()?;
        println!("    Trying to connect...");
        match cli.ping(&ip, password) {
            Ok(true) => {
                println!("  Success!");
                println!();
                return Ok(ip);
            }
            Ok(false) => tracing::debug!(attempt, "no PONG yet"),
            Err(e) => tracing::debug!(attempt, error = %e, "ping failed"),
        }

        if attempt < policy.attempts {
            clock.sleep(policy.interval);
        }
    }

    println!("  Giving up: Failed to connect. Logs:");
    match containers.logs(name) {
        Ok(logs) => print!("{}", logs),
        Err(e) => eprintln!("  ⚠ Warning: Could not read logs: {}", e),
    }

    Err(CheckError::ConnectionTimeout(
        name.to_string(),
        policy.attempts,
    ))
}
