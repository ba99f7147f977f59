// Documentation shipped inside the image
use crate::containers::ContainerSet;
use crate::errors::{CheckError, Result};
use regex::Regex;

/// Man page every image must carry at its root
pub const HELP_FILE: &str = "/help.1";

/// troff macros a man page cannot do without
const REQUIRED_MACROS: [&str; 3] = ["TH", "PP", "SH"];

/// Read the help file out of a throwaway container
pub fn fetch_help(containers: &ContainerSet<'_>) -> Result<String> {
    let script = format!("cat {}", HELP_FILE);
    let out = containers.run_oneshot(&["/bin/bash", "-c", &script])?;
    if !out.success() {
        return Err(CheckError::DocumentationError(format!(
            "Could not read {} from the image: {}",
            HELP_FILE,
            out.stderr.trim()
        )));
    }
    Ok(out.stdout)
}

/// Check that the help text mentions every term and looks like troff
pub fn check_help(content: &str, terms: &[String]) -> Result<()> {
    for term in terms {
        let re = Regex::new(term).map_err(|e| {
            CheckError::ConfigError(format!("Invalid doc term '{}': {}", term, e))
        })?;
        if !re.is_match(content) {
            return Err(CheckError::DocumentationError(format!(
                "File {} does not include '{}'.",
                HELP_FILE, term
            )));
        }
    }

    for mac in REQUIRED_MACROS {
        let prefix = format!(".{}", mac);
        if !content.lines().any(|line| line.starts_with(&prefix)) {
            return Err(CheckError::DocumentationError(format!(
                "{} is probably not in troff or groff format, since '{}' is missing.",
                HELP_FILE, mac
            )));
        }
    }

    Ok(())
}
