//! # studyloop-core
//!
//! The deterministic Daily Content Selection & Progress-Tracking Engine for
//! Studyloop - THE LOGIC.
//!
//! This crate tracks per-source consumption cursors across runs, detects
//! content changes, merges an optional externally supplied plan with a
//! deterministic fallback under resource budgets, assembles a bounded-size
//! content packet stream, and commits progress only when a run fully
//! succeeds.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is the ONLY place where progress state is mutated
//! - Has NO async, NO network, NO clock; collaborators enter through narrow
//!   traits and timestamps are supplied by the caller
//! - Iterates keyed stores in deterministic (BTreeMap) order
//! - Absorbs soft failures at the component boundary where they occur and
//!   propagates hard errors unmodified to the run driver
//!
//! ## Run Shape
//!
//! One run = registry sync → selection → packet assembly → (external
//! generation + delivery, app layer) → progress advancement. Only the last
//! step mutates durable state, and only on the success path.

// =============================================================================
// MODULES
// =============================================================================

pub mod links;
pub mod packet;
pub mod planner;
pub mod registry;
pub mod softfail;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    DailySelection, LinkCursorState, LinkFetcher, ProgressLedger, RunSummary, ScannedSource,
    SourceId, SourceKind, SourceRecord, SourceUnit, StudyloopError, UnitReader, VisualAugmenter,
};

// =============================================================================
// RE-EXPORTS: Engine Components
// =============================================================================

pub use links::LinkRegistry;
pub use packet::{Assembler, Packet, VisionQuotas};
pub use planner::{BudgetConfig, ExternalPlan, Planner, PlannedCounts, UnitProposal, clamp};
pub use registry::{DiscoveredSource, SourceRegistry};
pub use softfail::Soft;
pub use store::{advance, load_ledger, save_ledger};
