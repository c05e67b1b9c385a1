//! Development tasks for snakeshift
//!
//! This binary provides level-file maintenance utilities using the
//! cargo-xtask pattern. Run with: `cargo xtask <command>`

mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Migrate, Validate};

/// Development tasks for snakeshift
#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Level-file maintenance tools for snakeshift", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Re-save level files at the current format version
    Migrate(Migrate),

    /// Report editor validation warnings for level files
    Validate(Validate),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Migrate(cmd) => cmd.execute(),
        Command::Validate(cmd) => cmd.execute(),
    }
}
