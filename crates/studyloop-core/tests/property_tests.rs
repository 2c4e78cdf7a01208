//! # Property-Based Tests
//!
//! Invariant verification using proptest:
//! - cursors stay within bounds and are non-decreasing across runs
//! - the daily unit budget always holds, external plan or not
//! - the fallback path is deterministic
//! - ledger serialization round-trips losslessly

use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeMap;
use studyloop_core::{
    BudgetConfig, DailySelection, ExternalPlan, LinkCursorState, Planner, ProgressLedger,
    RunSummary, SourceId, SourceKind, SourceRecord, UnitProposal, advance,
};

// =============================================================================
// GENERATORS
// =============================================================================

fn kind_strategy() -> impl Strategy<Value = SourceKind> {
    prop_oneof![
        Just(SourceKind::Document),
        Just(SourceKind::Slides),
        Just(SourceKind::Text),
        Just(SourceKind::Image),
    ]
}

fn record_strategy() -> impl Strategy<Value = SourceRecord> {
    ("[a-z]{1,8}", kind_strategy(), 0usize..40).prop_flat_map(|(name, kind, unit_count)| {
        (0..=unit_count).prop_map(move |cursor| {
            let id = format!("/content/{name}");
            SourceRecord {
                id: SourceId::new(id.clone()),
                location: id,
                kind,
                fingerprint: "fp".to_string(),
                unit_count,
                cursor,
            }
        })
    })
}

fn sources_strategy() -> impl Strategy<Value = BTreeMap<SourceId, SourceRecord>> {
    vec(record_strategy(), 0..8)
        .prop_map(|records| records.into_iter().map(|r| (r.id.clone(), r)).collect())
}

fn config_strategy() -> impl Strategy<Value = BudgetConfig> {
    (1usize..20, 1usize..10, 0usize..6, 1usize..15).prop_map(
        |(max_units, pages, links, cards)| BudgetConfig {
            target_words: 600,
            min_words: 300,
            max_words: 800,
            target_cards: cards,
            min_cards: 1,
            max_cards: 20,
            default_pages_per_day: pages,
            default_links_per_day: links,
            max_units_per_day: max_units,
        },
    )
}

fn plan_strategy() -> impl Strategy<Value = ExternalPlan> {
    (
        proptest::option::of(-1000i64..1_000_000),
        proptest::option::of(-1000i64..1_000_000),
        vec(("[a-z/]{1,12}", -5i64..50), 0..6),
        proptest::option::of(-5i64..20),
    )
        .prop_map(|(words, cards, proposals, links)| ExternalPlan {
            target_words: words,
            target_cards: cards,
            per_source_units: proposals
                .into_iter()
                .map(|(source_id, units)| UnitProposal { source_id, units })
                .collect(),
            links_to_use: links,
        })
}

fn link_state_strategy() -> impl Strategy<Value = LinkCursorState> {
    (0usize..12).prop_flat_map(|n| {
        (0..=n).prop_map(move |next_index| LinkCursorState {
            links: (0..n).map(|i| format!("https://example.org/{i}")).collect(),
            next_index,
        })
    })
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Selected units always lie within [cursor, unit_count) of their source.
    #[test]
    fn selected_units_respect_cursor_window(
        sources in sources_strategy(),
        link_state in link_state_strategy(),
        config in config_strategy(),
        plan in proptest::option::of(plan_strategy()),
    ) {
        let selection = Planner::select(&sources, &link_state, &config, plan.as_ref());

        for (id, units) in &selection.units_by_source {
            let record = sources.get(id).expect("selected source must exist");
            for &unit in units {
                prop_assert!(unit >= record.cursor);
                prop_assert!(unit < record.unit_count);
            }
        }
    }

    /// The daily unit budget holds on every planning path.
    #[test]
    fn unit_budget_always_holds(
        sources in sources_strategy(),
        link_state in link_state_strategy(),
        config in config_strategy(),
        plan in proptest::option::of(plan_strategy()),
    ) {
        let selection = Planner::select(&sources, &link_state, &config, plan.as_ref());
        prop_assert!(selection.total_units() <= config.max_units_per_day);
    }

    /// Resolved targets always land inside their configured bounds.
    #[test]
    fn targets_always_within_bounds(
        sources in sources_strategy(),
        link_state in link_state_strategy(),
        config in config_strategy(),
        plan in proptest::option::of(plan_strategy()),
    ) {
        let selection = Planner::select(&sources, &link_state, &config, plan.as_ref());

        prop_assert!(selection.target_word_count >= config.min_words);
        prop_assert!(selection.target_word_count <= config.max_words);
        prop_assert!(selection.target_card_count >= config.min_cards);
        prop_assert!(selection.target_card_count <= config.max_cards);
    }

    /// Without an external plan the selection is a pure function of
    /// configuration and cursors.
    #[test]
    fn fallback_selection_is_deterministic(
        sources in sources_strategy(),
        link_state in link_state_strategy(),
        config in config_strategy(),
    ) {
        let first = Planner::select(&sources, &link_state, &config, None);
        let second = Planner::select(&sources, &link_state, &config, None);
        prop_assert_eq!(first, second);
    }

    /// After advancement every cursor satisfies 0 <= cursor <= unit_count and
    /// never moved backwards.
    #[test]
    fn cursors_stay_bounded_and_monotonic(
        sources in sources_strategy(),
        link_state in link_state_strategy(),
        config in config_strategy(),
        plan in proptest::option::of(plan_strategy()),
    ) {
        let mut ledger = ProgressLedger {
            sources,
            link_state,
            history: Vec::new(),
        };
        let before: BTreeMap<SourceId, usize> = ledger
            .sources
            .iter()
            .map(|(id, r)| (id.clone(), r.cursor))
            .collect();

        let selection = Planner::select(
            &ledger.sources,
            &ledger.link_state,
            &config,
            plan.as_ref(),
        );
        advance(&mut ledger, &selection, "ts");

        for (id, record) in &ledger.sources {
            prop_assert!(record.cursor <= record.unit_count);
            prop_assert!(record.cursor >= *before.get(id).expect("known id"));
        }
        prop_assert!(ledger.link_state.next_index <= ledger.link_state.links.len());
        prop_assert_eq!(ledger.history.len(), 1);
    }

    /// save(load(x)) == x for any ledger: JSON serialization is lossless.
    #[test]
    fn ledger_roundtrip_is_lossless(
        sources in sources_strategy(),
        link_state in link_state_strategy(),
        runs in vec(("[0-9T:+-]{10,25}", 0usize..9), 0..4),
    ) {
        let ledger = ProgressLedger {
            sources,
            link_state,
            history: runs
                .into_iter()
                .map(|(timestamp, links_used)| RunSummary {
                    timestamp,
                    units_by_source: BTreeMap::new(),
                    links_used,
                    target_word_count: 600,
                    target_card_count: 12,
                })
                .collect(),
        };

        let json = serde_json::to_string(&ledger).expect("serialize");
        let restored: ProgressLedger = serde_json::from_str(&json).expect("deserialize");
        prop_assert_eq!(restored, ledger);
    }

    /// Repeated successful runs keep consuming forward without repeating a
    /// unit until the source is exhausted.
    #[test]
    fn consecutive_runs_never_repeat_units(
        unit_count in 1usize..30,
        budget in 1usize..6,
    ) {
        let id = SourceId::new("/content/a");
        let mut ledger = ProgressLedger::default();
        ledger.sources.insert(
            id.clone(),
            SourceRecord {
                id: id.clone(),
                location: "/content/a".to_string(),
                kind: SourceKind::Document,
                fingerprint: "fp".to_string(),
                unit_count,
                cursor: 0,
            },
        );
        let config = BudgetConfig {
            target_words: 600,
            min_words: 300,
            max_words: 800,
            target_cards: 12,
            min_cards: 6,
            max_cards: 20,
            default_pages_per_day: budget,
            default_links_per_day: 0,
            max_units_per_day: budget,
        };

        let mut seen: Vec<usize> = Vec::new();
        for _ in 0..40 {
            let selection = Planner::select(
                &ledger.sources,
                &ledger.link_state,
                &config,
                None,
            );
            let units = selection
                .units_by_source
                .get(&id)
                .cloned()
                .unwrap_or_default();
            for &unit in &units {
                prop_assert!(!seen.contains(&unit), "unit {} delivered twice", unit);
                seen.push(unit);
            }
            let empty = units.is_empty();
            advance(&mut ledger, &selection, "ts");
            if empty {
                break;
            }
        }
        prop_assert_eq!(seen.len(), unit_count);
    }
}

// =============================================================================
// NON-PROPERTY REGRESSIONS
// =============================================================================

/// An empty selection advanced into an empty ledger is a no-op apart from
/// the history entry.
#[test]
fn advancing_empty_selection_only_appends_history() {
    let mut ledger = ProgressLedger::default();
    advance(&mut ledger, &DailySelection::default(), "ts");

    assert!(ledger.sources.is_empty());
    assert_eq!(ledger.link_state.next_index, 0);
    assert_eq!(ledger.history.len(), 1);
}
