//! # Run Driver
//!
//! One full pass: registry sync → selection → packet assembly → generation →
//! delivery → progress advancement. Only the advancement step mutates
//! durable state, and only on the success path; any hard error propagates
//! out with the on-disk ledger untouched, so the next run retries from the
//! same cursors.

use crate::config::Settings;
use crate::deliver::{self, DeliveredFiles};
use crate::fetcher::HttpFetcher;
use crate::generate::{GenerationClient, SourceStat};
use crate::reader::{self, FsUnitReader};
use crate::review::{FailedCard, ReviewClient};
use crate::vision::VisionClient;
use chrono::Local;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use studyloop_core::{
    Assembler, ExternalPlan, LinkRegistry, Planner, ProgressLedger, SourceRegistry, StudyloopError,
    VisualAugmenter, advance, load_ledger, save_ledger,
};

/// What a successful run produced, for logging and CLI output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub date_stamp: String,
    pub units_used: usize,
    pub links_used: usize,
    pub packet_count: usize,
    pub card_count: usize,
    pub lesson_path: PathBuf,
    pub deck_path: PathBuf,
}

// =============================================================================
// RUN
// =============================================================================

/// Execute one complete run against the configured state file.
pub fn run_once(settings: &Settings) -> Result<RunReport, StudyloopError> {
    settings.validate()?;
    std::fs::create_dir_all(&settings.paths.content_dir).map_err(|e| {
        StudyloopError::Io(format!(
            "cannot create {}: {}",
            settings.paths.content_dir.display(),
            e
        ))
    })?;

    let mut ledger = load_ledger(&settings.paths.state_file)?;
    let reader = FsUnitReader::new(settings.ingestion.chunk_words);

    // ---- Registry sync -----------------------------------------------------
    let discovered = reader::discover_files(&settings.paths.content_dir)?;
    SourceRegistry::sync(&mut ledger.sources, &discovered, &reader);
    LinkRegistry::refresh(
        &mut ledger.link_state,
        reader::load_links(&settings.paths.content_dir),
    );
    tracing::info!(
        sources = ledger.sources.len(),
        links = ledger.link_state.links.len(),
        "registry synced"
    );

    // ---- Selection ---------------------------------------------------------
    let plan = request_plan(settings, &ledger);
    let selection = Planner::select(
        &ledger.sources,
        &ledger.link_state,
        &settings.budget(),
        plan.as_ref(),
    );
    tracing::info!(
        units = selection.total_units(),
        links = selection.links_chosen.len(),
        target_words = selection.target_word_count,
        target_cards = selection.target_card_count,
        planned = plan.is_some(),
        "selection resolved"
    );

    // ---- Packet assembly ---------------------------------------------------
    let fetcher = HttpFetcher::new(
        Duration::from_secs(settings.ingestion.fetch_timeout_secs),
        settings.ingestion.max_link_chars,
    )?;
    let augmenter = build_augmenter(settings)?;
    let packets = Assembler::assemble(
        &selection,
        &ledger.sources,
        &reader,
        &fetcher,
        augmenter.as_deref(),
        settings.vision_quotas(),
        settings.generation.max_source_chars,
    );
    if packets.is_empty() {
        return Err(StudyloopError::NoUsableContent);
    }
    tracing::info!(packets = packets.len(), "packets assembled");

    let failed_cards = fetch_failed_cards(settings);

    // ---- Generation --------------------------------------------------------
    let api_key = settings.api_key.clone().ok_or_else(|| {
        StudyloopError::InvalidConfig(format!("{} is not set", crate::config::API_KEY_ENV))
    })?;
    let client = GenerationClient::new(&settings.generation, api_key)?;
    let bundle = client
        .generate_lesson(
            &packets,
            &failed_cards,
            selection.target_word_count,
            selection.target_card_count,
        )
        .map_err(|e| StudyloopError::Generation(e.to_string()))?;
    tracing::info!(cards = bundle.cards.len(), "lesson generated");

    // ---- Delivery ----------------------------------------------------------
    let date_stamp = Local::now().format("%Y-%m-%d").to_string();
    let DeliveredFiles {
        lesson_path,
        deck_path,
    } = deliver::deliver(&settings.paths.output_dir, &date_stamp, &bundle)?;

    // ---- Advancement (success path only) -----------------------------------
    advance(&mut ledger, &selection, Local::now().to_rfc3339());
    save_ledger(&settings.paths.state_file, &ledger)?;
    tracing::info!(lesson = %lesson_path.display(), deck = %deck_path.display(), "run committed");

    Ok(RunReport {
        date_stamp,
        units_used: selection.total_units(),
        links_used: selection.links_chosen.len(),
        packet_count: packets.len(),
        card_count: bundle.cards.len(),
        lesson_path,
        deck_path,
    })
}

// =============================================================================
// COLLABORATOR WIRING
// =============================================================================

/// Request the external plan. Every failure path maps to `None`: the
/// deterministic fallback must always be able to stand alone.
fn request_plan(settings: &Settings, ledger: &ProgressLedger) -> Option<ExternalPlan> {
    let api_key = settings.api_key.as_ref()?;
    if ledger.sources.is_empty() {
        return None;
    }

    let stats: Vec<SourceStat> = ledger
        .sources
        .values()
        .map(|record| SourceStat {
            source_id: record.id.to_string(),
            kind: record.kind,
            remaining_units: record.remaining_units(),
        })
        .collect();
    let preferences = json!({
        "target_lesson_words": settings.lesson.target_words,
        "min_words": settings.lesson.min_words,
        "max_words": settings.lesson.max_words,
        "cards_per_day": settings.cards.per_day,
        "min_cards": settings.cards.min_cards,
        "max_cards": settings.cards.max_cards,
        "default_links_per_day": settings.ingestion.default_links_per_day,
        "max_total_units_per_day": settings.ingestion.max_total_units_per_day,
    });

    let client = match GenerationClient::new(&settings.generation, api_key.clone()) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "planner client unavailable, using fallback selection");
            return None;
        }
    };
    match client.plan_selection(&stats, &preferences) {
        Ok(plan) => Some(plan),
        Err(e) => {
            tracing::warn!(error = %e, "external plan degraded, using fallback selection");
            None
        }
    }
}

/// Build the visual augmenter when vision is enabled and a key exists.
fn build_augmenter(settings: &Settings) -> Result<Option<Box<dyn VisualAugmenter>>, StudyloopError> {
    let quotas = settings.vision_quotas();
    if quotas.document_pages == 0 && quotas.images == 0 {
        return Ok(None);
    }
    let Some(api_key) = settings.api_key.clone() else {
        return Ok(None);
    };
    let client = VisionClient::new(&settings.generation, settings.vision_model(), api_key)?;
    Ok(Some(Box::new(client)))
}

/// Pull reinforcement cards; degraded lookups mean an empty list.
fn fetch_failed_cards(settings: &Settings) -> Vec<FailedCard> {
    if settings.review.url.is_empty() {
        return Vec::new();
    }
    let client = match ReviewClient::new(
        settings.review.url.clone(),
        Duration::from_secs(settings.review.request_timeout_secs),
    ) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "review client unavailable");
            return Vec::new();
        }
    };
    client.recent_failed_cards(settings.cards.review_lookback_days, settings.cards.review_limit)
}
