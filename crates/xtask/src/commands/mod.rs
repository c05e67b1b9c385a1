//! Command implementations for xtask
//!
//! Each command is a separate module that implements its own CLI args and
//! execution logic.

mod migrate;
mod validate;

pub use migrate::Migrate;
pub use validate::Validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Collects the level files under a path: a single `.json` file, or every
/// `.json` directly inside a directory, sorted for stable output.
pub(crate) fn collect_level_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let entries = std::fs::read_dir(path)
        .with_context(|| format!("reading directory {}", path.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let candidate = entry.path();
        if candidate.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(candidate);
        }
    }
    files.sort();
    Ok(files)
}
