//! # Studyloop CLI Module
//!
//! This module implements the CLI interface for Studyloop.
//!
//! ## Available Commands
//!
//! - `run-once` - Execute one full lesson run immediately
//! - `serve` - Run the daily scheduler in the foreground
//! - `status` - Show sources, cursors, links, and run history
//! - `init` - Write a starter configuration and create the folders

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use studyloop_core::StudyloopError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Studyloop - Daily Lesson Generator
///
/// Scans a folder of study material, selects today's slice under configured
/// budgets, asks a generation service for a lesson and flashcards, and
/// delivers the result. Progress commits only when a run fully succeeds.
#[derive(Parser, Debug)]
#[command(name = "studyloop")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "studyloop.toml")]
    pub config: PathBuf,

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
    /// Execute one full lesson run immediately
    RunOnce,

    /// Run the daily scheduler in the foreground
    Serve,

    /// Show sources, cursors, links, and run history
    Status,

    /// Write a starter configuration file and create the folders
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), StudyloopError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::RunOnce) => cmd_run_once(&cli.config, json_mode).await,
        Some(Commands::Serve) => cmd_serve(&cli.config).await,
        Some(Commands::Status) => cmd_status(&cli.config, json_mode),
        Some(Commands::Init { force }) => cmd_init(&cli.config, force),
        None => {
            // No subcommand - show status by default
            cmd_status(&cli.config, json_mode)
        }
    }
}
