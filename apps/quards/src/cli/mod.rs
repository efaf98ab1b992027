//! # Quards CLI Module
//!
//! This module implements the CLI interface for Quards.
//!
//! ## Available Commands
//!
//! - `explore` - Seed a run and explore it breadth-first
//! - `turn` - Explore every way one turn can play out
//! - `summary` - Count the states recorded at a turn
//! - `status` - Show state and transition counts for a run
//! - `show` - Print one stored state

mod commands;

use crate::config::{DEFAULT_CONFIG_FILE, QuardsConfig};
use clap::{Parser, Subcommand};
use quards_core::{GameId, QuardsError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Quards - card game state space explorer
///
/// Enumerates every reachable state of a game, turn by turn, into a
/// persistent transition graph.
#[derive(Parser, Debug)]
#[command(name = "quards")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the state database (overrides [storage] database)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" (persistent) or "memory" (overrides [storage] backend)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// Game id; also the shuffle seed
    #[arg(short, long, global = true, default_value = "default")]
    pub game: String,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Seed the run and explore it
    Explore {
        /// Exclusive depth bound (overrides [explore] max_depth)
        #[arg(short = 'd', long)]
        max_depth: Option<u64>,

        /// First depth to explore (overrides [explore] start_depth)
        #[arg(short, long)]
        start_depth: Option<u64>,

        /// Concurrent workers (overrides [explore] workers)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Continue an existing run without re-reading the deck files
        #[arg(short, long)]
        resume: bool,
    },

    /// Explore every transition at one turn
    Turn {
        /// Turn to explore
        #[arg(short, long)]
        turn: u64,
    },

    /// Count possibilities and victories at a turn
    Summary {
        /// Turn to summarize
        #[arg(short, long)]
        turn: u64,
    },

    /// Show state and transition counts
    Status,

    /// Print a stored state
    Show {
        /// State signature
        signature: String,
    },
}

// =============================================================================
// SETTINGS
// =============================================================================

impl Cli {
    /// Load the config file and apply the global flag overrides.
    pub fn settings(&self) -> Result<QuardsConfig, QuardsError> {
        let (path, explicit) = match &self.config {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        let mut config = QuardsConfig::load(&path, explicit)?;
        if let Some(database) = &self.database {
            config.storage.database = database.clone();
        }
        if let Some(backend) = &self.backend {
            config.storage.backend = backend.clone();
        }
        Ok(config)
    }

    /// The run this invocation targets.
    pub fn game_id(&self) -> GameId {
        GameId::new(self.game.as_str())
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), QuardsError> {
    let mut config = cli.settings()?;
    let game = cli.game_id();
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Explore {
            max_depth,
            start_depth,
            workers,
            resume,
        }) => {
            if let Some(max_depth) = max_depth {
                config.explore.max_depth = max_depth;
            }
            if let Some(start_depth) = start_depth {
                config.explore.start_depth = start_depth;
            }
            if let Some(workers) = workers {
                config.explore.workers = workers;
            }
            cmd_explore(&config, game, json_mode, resume).await
        }
        Some(Commands::Turn { turn }) => cmd_turn(&config, game, json_mode, turn).await,
        Some(Commands::Summary { turn }) => cmd_summary(&config, &game, json_mode, turn),
        Some(Commands::Status) | None => cmd_status(&config, &game, json_mode),
        Some(Commands::Show { signature }) => cmd_show(&config, &game, json_mode, &signature),
    }
}
