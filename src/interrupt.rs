// Ctrl-C / SIGTERM handling for a run that owns live containers
use crate::errors::{CheckError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag raised when the user asks the run to stop.
/// Long waits poll it and bail out so cleanup still gets to run.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route SIGINT and SIGTERM to this flag. A second signal while the
    /// first is still being handled exits immediately.
    pub fn install(&self) -> Result<()> {
        let flag = Arc::clone(&self.flag);
        ctrlc::set_handler(move || {
            if flag.swap(true, Ordering::SeqCst) {
                eprintln!("Interrupted again, exiting without cleanup");
                std::process::exit(130);
            }
            eprintln!("Interrupted, stopping containers...");
        })
        .map_err(|e| {
            CheckError::RuntimeError(format!("Failed to install signal handler: {}", e))
        })
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Interrupted)` once the flag is raised
    pub fn check(&self) -> Result<()> {
        if self.is_set() {
            return Err(CheckError::Interrupted);
        }
        Ok(())
    }
}
