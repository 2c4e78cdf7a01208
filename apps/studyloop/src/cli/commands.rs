//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::Settings;
use crate::{run, schedule};
use std::path::Path;
use studyloop_core::{StudyloopError, load_ledger};

// =============================================================================
// RUN-ONCE COMMAND
// =============================================================================

/// Execute one full run immediately.
pub async fn cmd_run_once(config_path: &Path, json_mode: bool) -> Result<(), StudyloopError> {
    let settings = Settings::load(config_path)?;

    let report = tokio::task::spawn_blocking(move || run::run_once(&settings))
        .await
        .map_err(|e| StudyloopError::Io(format!("run task failed: {e}")))??;

    if json_mode {
        let output = serde_json::json!({
            "date": report.date_stamp,
            "units_used": report.units_used,
            "links_used": report.links_used,
            "packets": report.packet_count,
            "cards": report.card_count,
            "lesson": report.lesson_path.to_string_lossy(),
            "deck": report.deck_path.to_string_lossy(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Run complete ({})", report.date_stamp);
    println!();
    println!("Units consumed: {}", report.units_used);
    println!("Links consumed: {}", report.links_used);
    println!("Packets sent:   {}", report.packet_count);
    println!("Cards produced: {}", report.card_count);
    println!("Lesson: {}", report.lesson_path.display());
    println!("Deck:   {}", report.deck_path.display());

    Ok(())
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Run the daily scheduler in the foreground.
pub async fn cmd_serve(config_path: &Path) -> Result<(), StudyloopError> {
    let settings = Settings::load(config_path)?;

    println!("Studyloop Scheduler Starting...");
    println!();
    println!("Configuration:");
    println!("  Config:   {}", config_path.display());
    println!(
        "  Schedule: daily at {:02}:{:02} (local time)",
        settings.schedule.hour, settings.schedule.minute
    );
    println!("  Content:  {}", settings.paths.content_dir.display());
    println!("  State:    {}", settings.paths.state_file.display());
    println!("  Output:   {}", settings.paths.output_dir.display());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    schedule::serve(settings).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show sources, cursors, links, and run history.
pub fn cmd_status(config_path: &Path, json_mode: bool) -> Result<(), StudyloopError> {
    let settings = Settings::load(config_path)?;
    let ledger = load_ledger(&settings.paths.state_file)?;

    if json_mode {
        let sources: Vec<_> = ledger
            .sources
            .values()
            .map(|record| {
                serde_json::json!({
                    "id": record.id.as_str(),
                    "kind": record.kind,
                    "cursor": record.cursor,
                    "unit_count": record.unit_count,
                    "remaining": record.remaining_units(),
                })
            })
            .collect();
        let output = serde_json::json!({
            "state_file": settings.paths.state_file.to_string_lossy(),
            "sources": sources,
            "links_total": ledger.link_state.links.len(),
            "links_next_index": ledger.link_state.next_index,
            "links_remaining": ledger.link_state.remaining(),
            "runs_recorded": ledger.history.len(),
            "last_run": ledger.history.last().map(|run| run.timestamp.clone()),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Studyloop Progress Status");
    println!("=========================");
    println!("State file: {}", settings.paths.state_file.display());
    println!();
    if ledger.sources.is_empty() {
        println!("No sources tracked yet.");
    } else {
        println!("Sources:");
        for record in ledger.sources.values() {
            println!(
                "  {} [{:?}] {}/{} units consumed",
                record.id, record.kind, record.cursor, record.unit_count
            );
        }
    }
    println!();
    println!(
        "Links: {}/{} consumed ({} remaining)",
        ledger.link_state.next_index,
        ledger.link_state.links.len(),
        ledger.link_state.remaining()
    );
    println!("Runs recorded: {}", ledger.history.len());
    if let Some(last) = ledger.history.last() {
        println!("Last run:      {}", last.timestamp);
    }

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Starter configuration written by `studyloop init`.
const STARTER_CONFIG: &str = r#"# Studyloop configuration.
# All values shown are the defaults; the generation API key comes from the
# STUDYLOOP_API_KEY environment variable, never from this file.

[schedule]
hour = 7
minute = 0

[paths]
content_dir = "content"
state_file = "state/progress.json"
output_dir = "output"

[lesson]
target_words = 600
min_words = 300
max_words = 1200

[cards]
per_day = 12
min_cards = 6
max_cards = 20
review_lookback_days = 7
review_limit = 20

[ingestion]
default_pages_per_day = 6
default_links_per_day = 2
chunk_words = 400
max_total_units_per_day = 12
fetch_timeout_secs = 15
max_link_chars = 12000

[generation]
api_base = "https://api.openai.com/v1"
model = "gpt-4.1-mini"
vision_model = ""
max_source_chars = 24000
enable_document_vision = false
enable_image_vision = true
vision_max_pages_per_day = 4
vision_max_images_per_day = 4
request_timeout_secs = 180

[review]
url = "http://127.0.0.1:8765"
request_timeout_secs = 10
"#;

/// Write a starter configuration and create the working folders.
pub fn cmd_init(config_path: &Path, force: bool) -> Result<(), StudyloopError> {
    if config_path.exists() && !force {
        return Err(StudyloopError::InvalidConfig(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )));
    }
    std::fs::write(config_path, STARTER_CONFIG).map_err(|e| {
        StudyloopError::Io(format!("cannot write {}: {}", config_path.display(), e))
    })?;

    let settings = Settings::load(config_path)?;
    std::fs::create_dir_all(&settings.paths.content_dir)
        .and_then(|()| std::fs::create_dir_all(&settings.paths.output_dir))
        .map_err(|e| StudyloopError::Io(format!("cannot create folders: {e}")))?;

    println!("Wrote {}", config_path.display());
    println!("Created {}", settings.paths.content_dir.display());
    println!("Created {}", settings.paths.output_dir.display());
    println!();
    println!("Drop study material into the content folder (and optional");
    println!("reference URLs into content/links.txt), set STUDYLOOP_API_KEY,");
    println!("then try: studyloop run-once");

    Ok(())
}
