//! # Studyloop - Daily Lesson Generator
//!
//! The main binary for the Studyloop engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                   apps/studyloop (THE BINARY)                  │
//! │                                                                │
//! │  ┌─────────┐   ┌────────────┐   ┌────────────────────────┐    │
//! │  │  CLI    │   │ Scheduler  │   │ Collaborator clients   │    │
//! │  │ (clap)  │   │ (tokio)    │   │ (reader/fetch/generate)│    │
//! │  └────┬────┘   └─────┬──────┘   └───────────┬────────────┘    │
//! │       │              │                      │                 │
//! │       └──────────────┼──────────────────────┘                 │
//! │                      ▼                                        │
//! │             ┌─────────────────┐                               │
//! │             │ studyloop-core  │                               │
//! │             │  (THE LOGIC)    │                               │
//! │             └─────────────────┘                               │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # One immediate run
//! studyloop run-once
//!
//! # Daily scheduler in the foreground
//! studyloop serve
//!
//! # Progress overview
//! studyloop status
//! ```

use clap::Parser;
use studyloop::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — STUDYLOOP_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("STUDYLOOP_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "studyloop=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Studyloop startup banner.
fn print_banner() {
    println!(
        r#"
  ███████╗████████╗██╗   ██╗██████╗ ██╗   ██╗██╗      ██████╗  ██████╗ ██████╗
  ██╔════╝╚══██╔══╝██║   ██║██╔══██╗╚██╗ ██╔╝██║     ██╔═══██╗██╔═══██╗██╔══██╗
  ███████╗   ██║   ██║   ██║██║  ██║ ╚████╔╝ ██║     ██║   ██║██║   ██║██████╔╝
  ╚════██║   ██║   ██║   ██║██║  ██║  ╚██╔╝  ██║     ██║   ██║██║   ██║██╔═══╝
  ███████║   ██║   ╚██████╔╝██████╔╝   ██║   ███████╗╚██████╔╝╚██████╔╝██║
  ╚══════╝   ╚═╝    ╚═════╝ ╚═════╝    ╚═╝   ╚══════╝ ╚═════╝  ╚═════╝ ╚═╝

  Daily Lesson Generator v{}

  Deterministic • Budgeted • Commit-on-success
"#,
        env!("CARGO_PKG_VERSION")
    );
}
