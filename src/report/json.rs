use crate::runner::SuiteOutcome;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Write the machine-readable run outcome as pretty-printed JSON.
pub fn write_report(outcome: &SuiteOutcome, output_dir: &Path) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(outcome)?;
    let path = output_dir.join("results.json");
    std::fs::write(&path, json)?;
    Ok(path)
}
