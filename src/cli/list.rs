use crate::cases::TestCase;
use crate::errors::{CheckError, Result};
use serde::Serialize;

#[derive(Serialize)]
struct ListEntry {
    name: &'static str,
    description: &'static str,
}

/// Render the test list, one name per line or as a JSON array
pub fn render(json: bool) -> Result<String> {
    if json {
        let entries: Vec<ListEntry> = TestCase::all()
            .iter()
            .map(|c| ListEntry {
                name: c.as_str(),
                description: c.description(),
            })
            .collect();
        return serde_json::to_string_pretty(&entries)
            .map_err(|e| CheckError::ConfigError(format!("Failed to render test list: {}", e)));
    }

    Ok(TestCase::all()
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("\n"))
}

pub fn run(json: bool) -> Result<()> {
    println!("{}", render(json)?);
    Ok(())
}
