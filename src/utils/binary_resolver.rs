use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Locate the node binary that hosts the Playwright bridge.
///
/// Resolution order: the `AUTHPROBE_NODE` override, the system PATH, nvm
/// installs, then common install locations. The error lists every path that
/// was checked.
pub fn find_node() -> Result<PathBuf> {
    let mut checked_paths = Vec::new();

    // 1. Explicit override. When set it must point at a real binary.
    if let Ok(overridden) = std::env::var("AUTHPROBE_NODE") {
        let path = PathBuf::from(&overridden);
        if path.exists() {
            return Ok(path);
        }
        bail!(
            "AUTHPROBE_NODE points to {:?}, which does not exist",
            path
        );
    }
    checked_paths.push("AUTHPROBE_NODE: (not set)".to_string());

    // 2. System PATH
    match which::which("node") {
        Ok(path) => return Ok(path),
        Err(_) => checked_paths.push("PATH: node".to_string()),
    }

    // 3. nvm installs: ~/.nvm/versions/node/<version>/bin/node
    if let Some(home) = dirs::home_dir() {
        let nvm_dir = home.join(".nvm").join("versions").join("node");
        checked_paths.push(format!("nvm: {:?}", nvm_dir));
        if let Some(node) = newest_nvm_node(&nvm_dir) {
            return Ok(node);
        }
    }

    // 4. Common install locations
    for candidate in [
        "/usr/local/bin/node",
        "/opt/homebrew/bin/node",
        "/usr/bin/node",
    ] {
        let path = PathBuf::from(candidate);
        checked_paths.push(format!("Fixed: {:?}", path));
        if path.exists() {
            return Ok(path);
        }
    }

    bail!(
        "Could not find a node binary for the Playwright bridge. Checked paths:\n{}",
        checked_paths.join("\n")
    )
}

/// Highest-versioned node under an nvm versions directory, if any.
fn newest_nvm_node(nvm_dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(nvm_dir).ok()?;
    let mut versions: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    versions.sort_by_key(|p| version_key(p));

    versions
        .into_iter()
        .rev()
        .map(|dir| dir.join("bin").join("node"))
        .find(|node| node.exists())
}

/// Numeric sort key for directory names like `v18.19.0`.
fn version_key(path: &Path) -> (u32, u32, u32) {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let mut parts = name.trim_start_matches('v').splitn(3, '.');
    let mut next = || {
        parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .unwrap_or(0)
    };
    (next(), next(), next())
}

/// Resolve the playwright package through the given node binary. Returns the
/// resolved entry path, or an error with install instructions.
pub fn check_playwright(node: &Path) -> Result<String> {
    let output = Command::new(node)
        .args(["-e", "process.stdout.write(require.resolve('playwright'))"])
        .output()
        .with_context(|| format!("Failed to run {}", node.display()))?;

    if !output.status.success() {
        bail!(
            "The playwright package is not resolvable from {}. Install it with: npm install playwright",
            node.display()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
