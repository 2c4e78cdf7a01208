//! # Progress Store & Advancement
//!
//! Durable persistence of the `ProgressLedger` and the explicit advancement
//! step.
//!
//! The ledger is stored as a self-describing, pretty-printed JSON document
//! so it can be inspected and round-trips losslessly. A missing file loads
//! as an empty ledger; saving overwrites and creates parent directories as
//! needed.
//!
//! Advancement is invoked **only after** the full run (selection, assembly,
//! generation, delivery) has completed without error. A run that fails at
//! any earlier point discards the in-memory ledger, leaving the on-disk
//! record untouched: the next run re-derives the same selection from the
//! same cursors.

use crate::types::{DailySelection, ProgressLedger, RunSummary, StudyloopError};
use std::fs;
use std::path::Path;

// =============================================================================
// LOAD / SAVE
// =============================================================================

/// Load the ledger from disk. A missing file yields an empty ledger.
pub fn load_ledger(path: &Path) -> Result<ProgressLedger, StudyloopError> {
    if !path.exists() {
        return Ok(ProgressLedger::default());
    }
    let bytes = fs::read(path)
        .map_err(|e| StudyloopError::Io(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_slice(&bytes).map_err(|e| {
        StudyloopError::Deserialization(format!("invalid ledger {}: {}", path.display(), e))
    })
}

/// Save the ledger, overwriting any previous file.
pub fn save_ledger(path: &Path, ledger: &ProgressLedger) -> Result<(), StudyloopError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                StudyloopError::Io(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
    }
    let json = serde_json::to_string_pretty(ledger)
        .map_err(|e| StudyloopError::Serialization(e.to_string()))?;
    fs::write(path, json)
        .map_err(|e| StudyloopError::Io(format!("cannot write {}: {}", path.display(), e)))
}

// =============================================================================
// ADVANCEMENT
// =============================================================================

/// Commit a fully successful run into the ledger.
///
/// For each source with non-empty chosen units the cursor advances to just
/// past the highest consumed unit (skipped-but-passed units are not
/// re-delivered), clamped to `unit_count`. The link cursor advances by the
/// number of links chosen, and one immutable history entry is appended.
pub fn advance(ledger: &mut ProgressLedger, selection: &DailySelection, timestamp: impl Into<String>) {
    let mut units_by_source = std::collections::BTreeMap::new();

    for (id, units) in &selection.units_by_source {
        let Some(&highest) = units.iter().max() else {
            continue;
        };
        if let Some(record) = ledger.sources.get_mut(id) {
            record.cursor = record.unit_count.min(highest.saturating_add(1));
        }
        units_by_source.insert(id.clone(), units.len());
    }

    ledger.link_state.next_index = ledger
        .link_state
        .next_index
        .saturating_add(selection.links_chosen.len())
        .min(ledger.link_state.links.len());

    ledger.history.push(RunSummary {
        timestamp: timestamp.into(),
        units_by_source,
        links_used: selection.links_chosen.len(),
        target_word_count: selection.target_word_count,
        target_card_count: selection.target_card_count,
    });
}

// =============================================================================
// TESTS
// =============================================================================
