//! Batch level re-saving.
//!
//! Loads every level file through the regular deserializer (applying the
//! sequential format migrations) and writes it back at the current format
//! version. Writes are atomic: a temp file is renamed over the original
//! only after a successful serialize.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use snakeshift_core::level;
use snakeshift_core::GameSession;

use super::collect_level_files;

/// Re-save level files at the current format version
#[derive(Parser, Debug)]
pub struct Migrate {
    /// Level file or directory of level files
    pub path: std::path::PathBuf,

    /// Report what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl Migrate {
    pub fn execute(self) -> Result<()> {
        let files = collect_level_files(&self.path)?;
        if files.is_empty() {
            anyhow::bail!("no level files under {}", self.path.display());
        }

        let mut upgraded = 0usize;
        let mut failed = 0usize;
        for file in &files {
            match migrate_file(file, self.dry_run) {
                Ok((changed, report)) => {
                    if changed {
                        upgraded += 1;
                        let verb = if self.dry_run { "would upgrade" } else { "upgraded" };
                        println!("{} {} {}", style("✓").green().bold(), verb, file.display());
                    } else {
                        println!("{} current  {}", style("·").dim(), file.display());
                    }
                    if !report.is_empty() {
                        println!(
                            "    {} {} entity(ies) and {} snake segment(s) outside the level bounds",
                            style("!").yellow().bold(),
                            report.entities,
                            report.snake_segments
                        );
                    }
                }
                Err(error) => {
                    failed += 1;
                    eprintln!(
                        "{} failed   {}: {error:#}",
                        style("✗").red().bold(),
                        file.display()
                    );
                }
            }
        }

        println!(
            "\n{} file(s), {} upgraded, {} failed",
            files.len(),
            upgraded,
            failed
        );
        if failed > 0 {
            anyhow::bail!("{failed} file(s) failed to migrate");
        }
        Ok(())
    }
}

/// Returns whether the file's contents changed (or would change), plus the
/// advisory out-of-bounds report for the loaded level.
fn migrate_file(path: &Path, dry_run: bool) -> Result<(bool, level::OutOfBoundsReport)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;

    let mut session = GameSession::new();
    level::deserialize(&mut session, &text)
        .with_context(|| format!("loading {}", path.display()))?;
    let (resaved, report) = level::save_level(&session);
    let resaved = resaved.into_string();

    if resaved == text {
        return Ok((false, report));
    }
    if dry_run {
        return Ok((true, report));
    }

    // Atomic rewrite
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &resaved)
        .with_context(|| format!("writing {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok((true, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    const V1_LEVEL: &str = r#"{
        "format": "snakeshift",
        "formatVersion": 1,
        "entities": [
            {"id": "t", "segments": [{"x": 0, "y": 0, "size": 1, "layer": 1}], "growOnNextMove": false}
        ],
        "entityTypes": ["Snake"],
        "activePlayerEntityIndex": 0
    }"#;

    #[test]
    fn migrates_a_v1_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.json");
        fs::write(&path, V1_LEVEL).unwrap();

        let (changed, report) = migrate_file(&path, false).unwrap();
        assert!(changed);
        assert!(report.is_empty());
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"formatVersion\": 6"));
        assert!(text.contains("\"width\""));

        // A second pass is a no-op.
        let (changed, _) = migrate_file(&path, false).unwrap();
        assert!(!changed);
    }

    #[test]
    fn dry_run_leaves_the_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.json");
        fs::write(&path, V1_LEVEL).unwrap();

        let (changed, _) = migrate_file(&path, true).unwrap();
        assert!(changed);
        assert_eq!(fs::read_to_string(&path).unwrap(), V1_LEVEL);
    }

    #[test]
    fn broken_files_error_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"format\": \"other\"}").unwrap();

        assert!(migrate_file(&path, false).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"format\": \"other\"}");
        assert!(!path.with_extension("json.tmp").exists());
    }
}
