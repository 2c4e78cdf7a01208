//! # Source Registry
//!
//! Per-source metadata across runs: fingerprint, unit count, consumption
//! cursor. The registry detects additions, removals, and content changes.
//!
//! ## Change Detection
//!
//! - New id, or stored fingerprint differs from the current one: the file is
//!   rescanned into units, `unit_count` is recomputed, and `cursor` resets
//!   to 0. Stale progress is never reused against new content.
//! - Id and fingerprint unchanged: the record is left untouched, cursor
//!   preserved.
//! - Known ids absent from the current discovery set are removed; no
//!   orphaned cursors.
//!
//! ## Failure Policy
//!
//! A read error on one file must not abort the sync. The affected record
//! keeps its prior state (fail-soft per source) and a warning is logged.

use crate::softfail::soft_warn;
use crate::types::{SourceId, SourceRecord, UnitReader};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

// =============================================================================
// DISCOVERY INPUT
// =============================================================================

/// One file found in the content folder, as handed to `sync`.
///
/// Discovery itself (directory walking, extension filtering) is an app-layer
/// concern; the registry only consumes the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSource {
    /// Stable identity (canonical absolute path).
    pub id: SourceId,
    /// Path to read the file from.
    pub path: PathBuf,
}

impl DiscoveredSource {
    /// Create a discovery entry, deriving the id from the path.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            id: SourceId::new(path.to_string_lossy().into_owned()),
            path,
        }
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// The Source Registry holds component-exclusive write access to the
/// `sources` map of the ledger.
pub struct SourceRegistry;

impl SourceRegistry {
    /// Synchronize the registry with the current discovery set.
    ///
    /// Mutates `sources` in place per the change-detection rules above.
    pub fn sync(
        sources: &mut BTreeMap<SourceId, SourceRecord>,
        discovered: &[DiscoveredSource],
        reader: &dyn UnitReader,
    ) {
        let mut seen: BTreeSet<SourceId> = BTreeSet::new();

        for entry in discovered {
            seen.insert(entry.id.clone());

            let fingerprint = match reader.fingerprint(&entry.path) {
                Ok(f) => f,
                Err(e) => {
                    // Prior record (if any) keeps its state for this run.
                    soft_warn("registry sync (fingerprint)", &e.to_string());
                    continue;
                }
            };

            let unchanged = sources
                .get(&entry.id)
                .is_some_and(|record| record.fingerprint == fingerprint);
            if unchanged {
                continue;
            }

            match reader.read(&entry.path) {
                Ok(scanned) => {
                    sources.insert(
                        entry.id.clone(),
                        SourceRecord {
                            id: entry.id.clone(),
                            location: entry.path.to_string_lossy().into_owned(),
                            kind: scanned.kind,
                            fingerprint,
                            unit_count: scanned.units.len(),
                            cursor: 0,
                        },
                    );
                }
                Err(e) => {
                    soft_warn("registry sync (scan)", &e.to_string());
                }
            }
        }

        // Remove records whose files disappeared from the content folder.
        sources.retain(|id, _| seen.contains(id));
    }
}

// =============================================================================
// TESTS
// =============================================================================
