//! # Core Type Definitions
//!
//! This module contains all shared types for the Studyloop selection and
//! progress-tracking engine:
//! - Source identity and progress records (`SourceId`, `SourceKind`, `SourceRecord`)
//! - Link cursor state (`LinkCursorState`)
//! - The per-run selection (`DailySelection`)
//! - The durable aggregate (`ProgressLedger`, `RunSummary`)
//! - Collaborator traits (`UnitReader`, `LinkFetcher`, `VisualAugmenter`)
//! - Error types (`StudyloopError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` where used as map keys, so `BTreeMap` iteration is
//!   deterministic
//! - Never read the clock; run timestamps are passed in by the caller

use crate::softfail::Soft;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

// =============================================================================
// SOURCE IDENTITY
// =============================================================================

/// Stable identity of a study source: the canonical absolute path string.
///
/// The id survives rescans; it only changes when the file itself moves,
/// which the registry treats as a removal plus an addition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl SourceId {
    /// Create a new source id from a canonical path string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classification of a source, used only to decide the per-day allocation
/// strategy. Paginated (`Document`) sources receive priority allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Page-structured material; pages are the natural unit.
    Document,
    /// Slide-deck material; slides are the natural unit.
    Slides,
    /// Free-running text; fixed-size word chunks are the unit.
    Text,
    /// A single image; one unit whose text arrives via visual augmentation.
    Image,
}

impl SourceKind {
    /// Whether sources of this kind take part in the priority page allocation.
    #[must_use]
    pub const fn is_paginated(self) -> bool {
        matches!(self, Self::Document)
    }
}

// =============================================================================
// SOURCE UNITS & RECORDS
// =============================================================================

/// The smallest addressable slice of a source: a page, a slide, a word
/// chunk, or a whole image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Zero-based position of this unit within its source.
    pub index: usize,
    /// Extracted plain text. May be empty (e.g. an image before augmentation).
    pub text: String,
}

/// A source file as the reader sees it: its kind plus its ordered units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedSource {
    /// Allocation-strategy classification.
    pub kind: SourceKind,
    /// Ordered units, indices `0..len`.
    pub units: Vec<SourceUnit>,
}

/// Per-source progress record, exclusively owned and mutated by the
/// Source Registry.
///
/// Invariants:
/// - `cursor <= unit_count` at all times
/// - a fingerprint change resets `cursor` to 0 and recomputes `unit_count`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Stable identity (canonical absolute path).
    pub id: SourceId,
    /// Current file path.
    pub location: String,
    /// Allocation-strategy classification.
    pub kind: SourceKind,
    /// Content hash; changes iff the file bytes change.
    pub fingerprint: String,
    /// Number of addressable units as of the last scan.
    pub unit_count: usize,
    /// Next unconsumed unit index.
    pub cursor: usize,
}

impl SourceRecord {
    /// Units not yet consumed, `unit_count - cursor` (saturating).
    #[must_use]
    pub fn remaining_units(&self) -> usize {
        self.unit_count.saturating_sub(self.cursor)
    }
}

// =============================================================================
// LINK CURSOR
// =============================================================================

/// The ordered reference-link list and the single cursor into it.
///
/// The link list is authoritative each run (full replace); if it shrinks
/// below `next_index`, the cursor is clamped down to the new length.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkCursorState {
    /// Ordered reference URLs, re-read in full each run.
    pub links: Vec<String>,
    /// Next unconsumed link index, `0 <= next_index <= links.len()`.
    pub next_index: usize,
}

impl LinkCursorState {
    /// Links not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.links.len().saturating_sub(self.next_index)
    }
}

// =============================================================================
// DAILY SELECTION
// =============================================================================

/// Today's selection. Transient: recomputed every run, never persisted.
///
/// Unit indices are absolute and strictly within `[cursor, unit_count)` of
/// their source at selection time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DailySelection {
    /// Chosen absolute unit indices per source, in ascending order.
    pub units_by_source: BTreeMap<SourceId, Vec<usize>>,
    /// Chosen links, `links[next_index .. next_index + k]`.
    pub links_chosen: Vec<String>,
    /// Resolved lesson length target, within configured bounds.
    pub target_word_count: usize,
    /// Resolved flashcard count target, within configured bounds.
    pub target_card_count: usize,
}

impl DailySelection {
    /// Total units selected across all sources.
    #[must_use]
    pub fn total_units(&self) -> usize {
        self.units_by_source.values().map(Vec::len).sum()
    }
}

// =============================================================================
// PROGRESS LEDGER
// =============================================================================

/// One immutable history entry, appended after each fully successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// RFC 3339 timestamp, supplied by the caller (the core has no clock).
    pub timestamp: String,
    /// Units consumed per source in this run.
    pub units_by_source: BTreeMap<SourceId, usize>,
    /// Links consumed in this run.
    pub links_used: usize,
    /// Resolved lesson length target for this run.
    pub target_word_count: usize,
    /// Resolved flashcard count target for this run.
    pub target_card_count: usize,
}

/// The durable aggregate: all source cursors, the link cursor, and the
/// append-only run history.
///
/// Owned exclusively by the Progress Store. The rest of the system works on
/// an in-memory snapshot handed to it at the start of a run; the snapshot is
/// written back only after the run fully succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressLedger {
    /// Keyed store of per-source progress records.
    pub sources: BTreeMap<SourceId, SourceRecord>,
    /// The link list and its cursor.
    pub link_state: LinkCursorState,
    /// Append-only run history.
    pub history: Vec<RunSummary>,
}

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// Reads study sources: fingerprints bytes and splits files into ordered,
/// addressable units.
///
/// # Contract
///
/// Both operations must be deterministic for unchanged bytes. Format-specific
/// parsing is the implementor's concern; the engine only consumes the
/// resulting unit sequence.
pub trait UnitReader {
    /// Compute the content fingerprint of a file.
    fn fingerprint(&self, path: &Path) -> Result<String, StudyloopError>;

    /// Split a file into its kind and ordered units.
    fn read(&self, path: &Path) -> Result<ScannedSource, StudyloopError>;
}

/// Fetches the plain text of a reference link. Best-effort: failures and
/// timeouts degrade, they never abort a run.
pub trait LinkFetcher {
    /// Fetch and reduce a URL to plain text.
    fn fetch(&self, url: &str) -> Soft<String>;
}

/// Produces a short descriptive text for a visual unit. Best-effort and
/// quota-bounded; failures degrade to the unit's plain text.
pub trait VisualAugmenter {
    /// Describe one unit of the given source.
    fn describe(&self, path: &Path, unit_index: usize, kind: SourceKind) -> Soft<String>;
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Studyloop system.
///
/// Soft failures (one unreadable file, one dead link) are absorbed at the
/// component boundary where they occur and never surface as this type.
/// `StudyloopError` values are the *hard* errors: they propagate to the run
/// driver, which must not advance progress after seeing one.
#[derive(Debug, Error)]
pub enum StudyloopError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The configuration is missing or inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The run produced no usable content packets at all.
    #[error("No usable content found for today's lesson")]
    NoUsableContent,

    /// The generation collaborator failed.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// The delivery collaborator failed.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

// =============================================================================
// TESTS
// =============================================================================
