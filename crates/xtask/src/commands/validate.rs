//! Batch level validation.

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use snakeshift_core::GameSession;
use snakeshift_core::level;
use snakeshift_editor::{ValidationWarning, validate_level};

use super::collect_level_files;

/// Report editor validation warnings for level files
#[derive(Parser, Debug)]
pub struct Validate {
    /// Level file or directory of level files
    pub path: std::path::PathBuf,
}

impl Validate {
    pub fn execute(self) -> Result<()> {
        let files = collect_level_files(&self.path)?;
        if files.is_empty() {
            anyhow::bail!("no level files under {}", self.path.display());
        }

        let mut total_warnings = 0usize;
        for file in &files {
            let text = fs::read_to_string(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let mut session = GameSession::new();
            if let Err(error) = level::deserialize(&mut session, &text) {
                eprintln!(
                    "{} {}: {error}",
                    style("✗").red().bold(),
                    file.display()
                );
                continue;
            }
            let warnings = validate_level(&session);
            if warnings.is_empty() {
                println!("{} {}", style("✓").green().bold(), file.display());
                continue;
            }
            total_warnings += warnings.len();
            println!(
                "{} {} ({} warning(s))",
                style("!").yellow().bold(),
                file.display(),
                warnings.len()
            );
            for warning in warnings {
                println!("    {}", describe(&warning));
            }
        }
        println!("\n{} file(s), {} warning(s)", files.len(), total_warnings);
        Ok(())
    }
}

fn describe(warning: &ValidationWarning) -> String {
    match warning {
        ValidationWarning::OutOfBounds {
            entity,
            segment_index: Some(index),
        } => format!("snake {entity} segment {index} is outside the level"),
        ValidationWarning::OutOfBounds { entity, .. } => {
            format!("entity {entity} is outside the level")
        }
        ValidationWarning::OverlappingSegments {
            snake,
            segment_index,
            other_index,
        } => format!("snake {snake} overlaps itself (segments {segment_index} and {other_index})"),
        ValidationWarning::SameLayerCollision { entity, x, y } => {
            format!("snake {entity} rests on a same-color surface at ({x}, {y})")
        }
        ValidationWarning::DuplicateCollectables { x, y } => {
            format!("multiple collectables share tile ({x}, {y})")
        }
    }
}
