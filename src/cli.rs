use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// File-backed task board CLI.
/// Storage defaults to ~/.taskboard/board.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "tb", version, about = "Task board synchronisation CLI")]
pub struct Cli {
    /// Path to the JSON board store.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to a board variant configuration (columns, vocabulary, priority scale).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
