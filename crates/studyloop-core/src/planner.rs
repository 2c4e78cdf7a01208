//! # Selection Planner
//!
//! Produces today's selection: which units of which sources, how many links,
//! and the resolved lesson/card targets.
//!
//! Two planning paths feed one common resolution step:
//!
//! 1. **Deterministic fallback**, always computed first. Paginated sources
//!    share the daily page budget; with no paginated sources, one unit of the
//!    first source keeps the pipeline from starving. Reproducible from
//!    configuration and cursors alone.
//! 2. **External plan merge**, an advisory refinement. Every numeric target
//!    is re-clamped into configured bounds, per-source proposals are capped
//!    by the global unit budget, unknown ids and non-positive counts are
//!    dropped. An absent or malformed plan skips the merge entirely; the
//!    fallback stands.
//!
//! The common step translates relative unit counts into absolute index
//! ranges through each source's cursor and fills the link slice.

use crate::types::{DailySelection, LinkCursorState, SourceId, SourceRecord};
use serde::Deserialize;
use std::collections::BTreeMap;

// =============================================================================
// BUDGET CONFIGURATION
// =============================================================================

/// Budgets and bounds the planner must respect.
///
/// Callers are expected to validate `min <= max` for both target ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetConfig {
    /// Preferred lesson length in words.
    pub target_words: usize,
    /// Lower bound on the lesson length.
    pub min_words: usize,
    /// Upper bound on the lesson length.
    pub max_words: usize,
    /// Preferred flashcard count.
    pub target_cards: usize,
    /// Lower bound on the flashcard count.
    pub min_cards: usize,
    /// Upper bound on the flashcard count.
    pub max_cards: usize,
    /// Pages shared among paginated sources per day.
    pub default_pages_per_day: usize,
    /// Links consumed per day when the plan does not say otherwise.
    pub default_links_per_day: usize,
    /// Hard ceiling on units selected per day, across all sources.
    pub max_units_per_day: usize,
}

/// Clamp `value` into `[lo, hi]`.
#[must_use]
pub fn clamp(value: usize, lo: usize, hi: usize) -> usize {
    value.max(lo).min(hi)
}

/// Clamp a raw (possibly negative or oversized) external value into `[lo, hi]`.
#[must_use]
pub fn clamp_raw(value: i64, lo: usize, hi: usize) -> usize {
    if value < 0 {
        return lo;
    }
    let value = usize::try_from(value).unwrap_or(usize::MAX);
    clamp(value, lo, hi)
}

// =============================================================================
// EXTERNAL PLAN
// =============================================================================

/// One per-source proposal from the external planner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnitProposal {
    /// Source the proposal refers to; unknown ids are dropped.
    pub source_id: String,
    /// Proposed unit count; non-positive values are dropped.
    pub units: i64,
}

/// An externally supplied plan. Advisory only: every field is re-validated
/// and re-clamped before use, and the whole plan may be absent.
///
/// Raw integers are kept signed so that out-of-range suggestions clamp
/// instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ExternalPlan {
    /// Suggested lesson length in words.
    #[serde(default)]
    pub target_words: Option<i64>,
    /// Suggested flashcard count.
    #[serde(default)]
    pub target_cards: Option<i64>,
    /// Per-source unit proposals, honored in the order given.
    #[serde(default)]
    pub per_source_units: Vec<UnitProposal>,
    /// Suggested link count for today.
    #[serde(default)]
    pub links_to_use: Option<i64>,
}

// =============================================================================
// PLANNED COUNTS (intermediate form)
// =============================================================================

/// Relative allocation: unit *counts* per source, before cursor translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCounts {
    /// Units to consume per source, counted from each source's cursor.
    pub counts: BTreeMap<SourceId, usize>,
    /// Link count chosen by the plan step; `None` defers to the default.
    pub links_hint: Option<usize>,
    /// Resolved lesson length target.
    pub target_word_count: usize,
    /// Resolved flashcard count target.
    pub target_card_count: usize,
}

// =============================================================================
// PLANNER
// =============================================================================

/// The Selection Planner.
pub struct Planner;

impl Planner {
    /// Produce today's selection from the current registry state, the
    /// configured budgets, and an optional external plan.
    #[must_use]
    pub fn select(
        sources: &BTreeMap<SourceId, SourceRecord>,
        link_state: &LinkCursorState,
        config: &BudgetConfig,
        plan: Option<&ExternalPlan>,
    ) -> DailySelection {
        let mut counts = Self::fallback(sources, config);
        if let Some(plan) = plan {
            Self::merge(&mut counts, plan, sources, config);
        }
        Self::resolve(&counts, sources, link_state, config)
    }

    /// The deterministic fallback allocation.
    #[must_use]
    pub fn fallback(
        sources: &BTreeMap<SourceId, SourceRecord>,
        config: &BudgetConfig,
    ) -> PlannedCounts {
        let target_word_count = clamp(config.target_words, config.min_words, config.max_words);
        let target_card_count = clamp(config.target_cards, config.min_cards, config.max_cards);

        let mut counts: BTreeMap<SourceId, usize> = BTreeMap::new();

        // BTreeMap iteration gives stable lexicographic id order.
        let paginated: Vec<&SourceRecord> = sources
            .values()
            .filter(|record| record.kind.is_paginated())
            .collect();

        if paginated.is_empty() {
            // Never starve the pipeline: one unit from the first source.
            if let Some(first) = sources.keys().next() {
                counts.insert(first.clone(), 1);
            }
        } else {
            let per_source = (config.default_pages_per_day / paginated.len()).max(1);
            let mut used = 0usize;
            for record in paginated {
                if used >= config.max_units_per_day {
                    break;
                }
                let take = per_source.min(config.max_units_per_day - used);
                counts.insert(record.id.clone(), take);
                used += take;
            }
        }

        PlannedCounts {
            counts,
            links_hint: None,
            target_word_count,
            target_card_count,
        }
    }

    /// Merge an external plan into the fallback counts.
    ///
    /// The plan never widens budgets: targets re-clamp, proposals cap at the
    /// global unit ceiling. A merge that accepts no proposal leaves the
    /// fallback allocation in place.
    pub fn merge(
        counts: &mut PlannedCounts,
        plan: &ExternalPlan,
        sources: &BTreeMap<SourceId, SourceRecord>,
        config: &BudgetConfig,
    ) {
        if let Some(words) = plan.target_words {
            counts.target_word_count = clamp_raw(words, config.min_words, config.max_words);
        }
        if let Some(cards) = plan.target_cards {
            counts.target_card_count = clamp_raw(cards, config.min_cards, config.max_cards);
        }

        let mut accepted: BTreeMap<SourceId, usize> = BTreeMap::new();
        let mut used = 0usize;
        for proposal in &plan.per_source_units {
            if proposal.units <= 0 {
                continue;
            }
            let id = SourceId::new(proposal.source_id.clone());
            if !sources.contains_key(&id) {
                continue;
            }
            if used >= config.max_units_per_day {
                break;
            }
            let proposed = usize::try_from(proposal.units).unwrap_or(usize::MAX);
            let allowed = proposed.min(config.max_units_per_day - used);
            *accepted.entry(id).or_insert(0) += allowed;
            used += allowed;
        }
        if !accepted.is_empty() {
            counts.counts = accepted;
        }

        if let Some(links) = plan.links_to_use {
            if links > 0 {
                counts.links_hint = Some(usize::try_from(links).unwrap_or(usize::MAX));
            }
        }
    }

    /// The common final step: relative counts become absolute unit index
    /// ranges through each source's cursor, and the link slice is filled.
    #[must_use]
    pub fn resolve(
        counts: &PlannedCounts,
        sources: &BTreeMap<SourceId, SourceRecord>,
        link_state: &LinkCursorState,
        config: &BudgetConfig,
    ) -> DailySelection {
        let mut units_by_source: BTreeMap<SourceId, Vec<usize>> = BTreeMap::new();

        for (id, &count) in &counts.counts {
            let Some(record) = sources.get(id) else {
                continue;
            };
            // Hard invariant: a cursor at or past the end contributes nothing,
            // even when a shrunken source left it stranded.
            if record.cursor >= record.unit_count {
                continue;
            }
            let start = record.cursor;
            let end = record.unit_count.min(start.saturating_add(count));
            if end > start {
                units_by_source.insert(id.clone(), (start..end).collect());
            }
        }

        let take = counts
            .links_hint
            .unwrap_or(config.default_links_per_day)
            .min(link_state.remaining());
        let links_chosen = link_state
            .links
            .iter()
            .skip(link_state.next_index)
            .take(take)
            .cloned()
            .collect();

        DailySelection {
            units_by_source,
            links_chosen,
            target_word_count: counts.target_word_count,
            target_card_count: counts.target_card_count,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceKind;

    fn config() -> BudgetConfig {
        BudgetConfig {
            target_words: 600,
            min_words: 300,
            max_words: 800,
            target_cards: 12,
            min_cards: 6,
            max_cards: 20,
            default_pages_per_day: 6,
            default_links_per_day: 4,
            max_units_per_day: 5,
        }
    }

    fn record(id: &str, kind: SourceKind, unit_count: usize, cursor: usize) -> SourceRecord {
        SourceRecord {
            id: SourceId::new(id),
            location: id.to_string(),
            kind,
            fingerprint: "fp".to_string(),
            unit_count,
            cursor,
        }
    }

    fn sources(records: Vec<SourceRecord>) -> BTreeMap<SourceId, SourceRecord> {
        records.into_iter().map(|r| (r.id.clone(), r)).collect()
    }

    fn links(n: usize, next_index: usize) -> LinkCursorState {
        LinkCursorState {
            links: (0..n).map(|i| format!("https://example.org/{i}")).collect(),
            next_index,
        }
    }

    #[test]
    fn fallback_single_document_respects_daily_budget() {
        // unit_count=10, cursor=3, budget 5: fallback selects [3,4,5,6,7].
        let sources = sources(vec![record("/a.txt", SourceKind::Document, 10, 3)]);
        let selection = Planner::select(&sources, &links(0, 0), &config(), None);

        assert_eq!(
            selection.units_by_source.get(&SourceId::new("/a.txt")),
            Some(&vec![3, 4, 5, 6, 7])
        );
        assert_eq!(selection.total_units(), 5);
    }

    #[test]
    fn fallback_splits_page_budget_across_documents() {
        let mut cfg = config();
        cfg.max_units_per_day = 10;
        let sources = sources(vec![
            record("/a.txt", SourceKind::Document, 20, 0),
            record("/b.txt", SourceKind::Document, 20, 0),
        ]);

        let selection = Planner::select(&sources, &links(0, 0), &cfg, None);

        // 6 pages / 2 documents = 3 each.
        assert_eq!(
            selection.units_by_source.get(&SourceId::new("/a.txt")),
            Some(&vec![0, 1, 2])
        );
        assert_eq!(
            selection.units_by_source.get(&SourceId::new("/b.txt")),
            Some(&vec![0, 1, 2])
        );
    }

    #[test]
    fn fallback_without_documents_takes_one_unit_from_first_source() {
        let sources = sources(vec![
            record("/b.txt", SourceKind::Text, 8, 2),
            record("/a.txt", SourceKind::Text, 8, 0),
        ]);

        let selection = Planner::select(&sources, &links(0, 0), &config(), None);

        // Lexicographically first id wins, one unit from its cursor.
        assert_eq!(
            selection.units_by_source.get(&SourceId::new("/a.txt")),
            Some(&vec![0])
        );
        assert_eq!(selection.total_units(), 1);
    }

    #[test]
    fn fallback_with_no_sources_is_empty() {
        let selection = Planner::select(&BTreeMap::new(), &links(3, 0), &config(), None);
        assert!(selection.units_by_source.is_empty());
        assert_eq!(selection.links_chosen.len(), 3);
    }

    #[test]
    fn link_slice_clamps_to_remaining() {
        // 7 links, next_index=5, default 4 per day: only 2 chosen.
        let state = links(7, 5);
        let selection = Planner::select(&BTreeMap::new(), &state, &config(), None);

        assert_eq!(
            selection.links_chosen,
            vec![
                "https://example.org/5".to_string(),
                "https://example.org/6".to_string()
            ]
        );
    }

    #[test]
    fn oversized_target_clamps_instead_of_rejecting() {
        let sources = sources(vec![record("/a.txt", SourceKind::Document, 10, 0)]);
        let plan = ExternalPlan {
            target_words: Some(999_999),
            ..ExternalPlan::default()
        };

        let selection = Planner::select(&sources, &links(0, 0), &config(), Some(&plan));

        assert_eq!(selection.target_word_count, 800);
    }

    #[test]
    fn negative_target_clamps_to_minimum() {
        let plan = ExternalPlan {
            target_cards: Some(-3),
            ..ExternalPlan::default()
        };
        let selection = Planner::select(&BTreeMap::new(), &links(0, 0), &config(), Some(&plan));
        assert_eq!(selection.target_card_count, 6);
    }

    #[test]
    fn plan_proposals_cap_at_unit_budget() {
        let sources = sources(vec![
            record("/a.txt", SourceKind::Text, 50, 0),
            record("/b.txt", SourceKind::Text, 50, 0),
        ]);
        let plan = ExternalPlan {
            per_source_units: vec![
                UnitProposal {
                    source_id: "/a.txt".to_string(),
                    units: 3,
                },
                UnitProposal {
                    source_id: "/b.txt".to_string(),
                    units: 100,
                },
            ],
            ..ExternalPlan::default()
        };

        let selection = Planner::select(&sources, &links(0, 0), &config(), Some(&plan));

        assert_eq!(selection.total_units(), 5);
        assert_eq!(
            selection.units_by_source.get(&SourceId::new("/b.txt")),
            Some(&vec![0, 1])
        );
    }

    #[test]
    fn plan_drops_unknown_and_non_positive_proposals() {
        let sources = sources(vec![record("/a.txt", SourceKind::Text, 50, 0)]);
        let plan = ExternalPlan {
            per_source_units: vec![
                UnitProposal {
                    source_id: "/ghost.txt".to_string(),
                    units: 3,
                },
                UnitProposal {
                    source_id: "/a.txt".to_string(),
                    units: 0,
                },
                UnitProposal {
                    source_id: "/a.txt".to_string(),
                    units: -2,
                },
            ],
            ..ExternalPlan::default()
        };

        let selection = Planner::select(&sources, &links(0, 0), &config(), Some(&plan));

        // No proposal survived: fallback allocation (one unit) stands.
        assert_eq!(
            selection.units_by_source.get(&SourceId::new("/a.txt")),
            Some(&vec![0])
        );
    }

    #[test]
    fn plan_link_hint_overrides_default() {
        let plan = ExternalPlan {
            links_to_use: Some(1),
            ..ExternalPlan::default()
        };
        let selection = Planner::select(&BTreeMap::new(), &links(5, 0), &config(), Some(&plan));
        assert_eq!(selection.links_chosen.len(), 1);
    }

    #[test]
    fn zero_link_hint_defers_to_default() {
        let plan = ExternalPlan {
            links_to_use: Some(0),
            ..ExternalPlan::default()
        };
        let selection = Planner::select(&BTreeMap::new(), &links(5, 0), &config(), Some(&plan));
        assert_eq!(selection.links_chosen.len(), 4);
    }

    #[test]
    fn exhausted_source_contributes_nothing() {
        let sources = sources(vec![
            record("/a.txt", SourceKind::Document, 10, 10),
            // Shrunken source: cursor stranded past the new unit count.
            record("/b.txt", SourceKind::Document, 3, 7),
        ]);

        let selection = Planner::select(&sources, &links(0, 0), &config(), None);

        assert!(selection.units_by_source.is_empty());
    }

    #[test]
    fn fallback_is_deterministic() {
        let sources = sources(vec![
            record("/a.txt", SourceKind::Document, 10, 2),
            record("/b.txt", SourceKind::Text, 9, 1),
        ]);
        let state = links(6, 2);

        let first = Planner::select(&sources, &state, &config(), None);
        let second = Planner::select(&sources, &state, &config(), None);

        assert_eq!(first, second);
    }
}
