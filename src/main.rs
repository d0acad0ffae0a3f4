//! # tb - Task Board Synchronisation CLI
//!
//! Command-line entry point over the board engine. The engine keeps an
//! in-memory view of a remote task store consistent through drag-and-drop
//! reordering, cross-column status moves, optimistic field updates with
//! rollback, and bulk mutations across a selection.
//!
//! ## Quick Start
//!
//! ```bash
//! # Show the board
//! tb board
//!
//! # Add a task
//! tb add "Photograph Elm Street duplex" --status backlog --due "in 3d"
//!
//! # Drag a task to the head of another column
//! tb move T-3 --to inProgress --at 0
//!
//! # Set priority across a selection
//! tb bulk --id T-1 --id T-2 --id T-3 --priority high
//! ```
//!
//! Data is stored locally in `~/.taskboard/board.json` unless `--db` points
//! elsewhere; `--config` selects a board variant.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use taskboard::cli::Cli;
use taskboard::cmd::{self, Commands};
use taskboard::config::BoardConfig;
use taskboard::remote::FileStore;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Completions need no store or config.
    if let Commands::Completions { shell } = &cli.command {
        cmd::cmd_completions(*shell);
        return;
    }

    let db_path = cli.db.unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let dir = PathBuf::from(home).join(".taskboard");
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("Failed to create taskboard directory {}: {}", dir.display(), e);
            std::process::exit(1);
        }
        dir.join("board.json")
    });
    let remote = FileStore::new(db_path);

    let config = match cli.config {
        Some(path) => match BoardConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
        None => BoardConfig::default_board(),
    };

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),

        Commands::Board => cmd::cmd_board(&remote, &config),

        Commands::Move { id, to, at } => cmd::cmd_move(&remote, &config, id, to, at),

        Commands::Bulk {
            ids, status, priority, assignee, sprint, clear_sprint, labels, watchers,
        } => cmd::cmd_bulk(
            &remote, &config, ids, status, priority, assignee, sprint, clear_sprint,
            labels, watchers,
        ),

        Commands::List {
            text, statuses, priorities, assignees, labels, sprints, min_points, max_points,
        } => cmd::cmd_list(
            &remote, &config, text, statuses, priorities, assignees, labels, sprints,
            min_points, max_points,
        ),

        Commands::Add { title, desc, status, priority, due, location } =>
            cmd::cmd_add(&remote, &config, title, desc, status, priority, due, location),

        Commands::Set {
            id, title, status, priority, assignee, sprint, clear_sprint, progress,
            labels, watchers,
        } => cmd::cmd_set(
            &remote, &config, id, title, status, priority, assignee, sprint, clear_sprint,
            progress, labels, watchers,
        ),

        Commands::Delete { id } => cmd::cmd_delete(&remote, &config, id),
    }
}
