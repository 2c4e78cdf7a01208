//! # Packet Assembler
//!
//! Converts a `DailySelection` into bounded textual content packets ready to
//! hand to the generation collaborator.
//!
//! ## Policies
//!
//! - Unit texts are re-read through the `UnitReader` at assembly time; a
//!   source that fails to read contributes nothing (fail-soft, logged).
//! - Visual augmentation is best-effort and quota-bounded per day. An
//!   attempt counts against its quota whether or not it produced text.
//! - A failed link fetch yields an empty-text packet. The link still counts
//!   as used for cursor advancement: a dead link is not retried forever.
//! - Packets are concatenated in selection order, whitespace-empty packets
//!   are skipped, and the combined stream truncates at the configured
//!   character budget; the last packet is split if it only partially fits,
//!   everything beyond it is dropped.

use crate::softfail::soft_warn;
use crate::types::{
    DailySelection, LinkFetcher, SourceId, SourceKind, SourceRecord, UnitReader, VisualAugmenter,
};
use std::collections::BTreeMap;
use std::path::Path;

// =============================================================================
// PACKET & QUOTAS
// =============================================================================

/// One bounded piece of content for the generation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Where the text came from: a source file path or a URL.
    pub origin: String,
    /// Unit index within the origin (0 for links and whole images).
    pub unit_index: usize,
    /// The (possibly truncated) plain text.
    pub text: String,
}

/// Per-day ceilings on visual-augmentation attempts. Zero disables the
/// corresponding path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisionQuotas {
    /// Augmentation attempts for document pages.
    pub document_pages: usize,
    /// Augmentation attempts for image sources.
    pub images: usize,
}

// =============================================================================
// ASSEMBLER
// =============================================================================

/// The Packet Assembler.
pub struct Assembler;

impl Assembler {
    /// Assemble the selection into ordered, budget-bounded packets.
    #[must_use]
    pub fn assemble(
        selection: &DailySelection,
        sources: &BTreeMap<SourceId, SourceRecord>,
        reader: &dyn UnitReader,
        fetcher: &dyn LinkFetcher,
        augmenter: Option<&dyn VisualAugmenter>,
        quotas: VisionQuotas,
        max_total_chars: usize,
    ) -> Vec<Packet> {
        let mut packets = Vec::new();
        let mut pages_used = 0usize;
        let mut images_used = 0usize;

        for (id, unit_indexes) in &selection.units_by_source {
            let Some(record) = sources.get(id) else {
                continue;
            };
            let path = Path::new(&record.location);
            let scanned = match reader.read(path) {
                Ok(scanned) => scanned,
                Err(e) => {
                    soft_warn("packet assembly (read)", &e.to_string());
                    continue;
                }
            };

            for &index in unit_indexes {
                let Some(unit) = scanned.units.get(index) else {
                    continue;
                };
                let mut text = unit.text.clone();

                if let Some(augmenter) = augmenter {
                    let visual = if record.kind.is_paginated() && pages_used < quotas.document_pages
                    {
                        pages_used += 1;
                        augmenter.describe(path, index, record.kind).value()
                    } else if record.kind == SourceKind::Image && images_used < quotas.images {
                        images_used += 1;
                        augmenter.describe(path, index, record.kind).value()
                    } else {
                        None
                    };
                    if let Some(visual) = visual {
                        if !visual.is_empty() {
                            text = format!("{}\n\n[Visual Analysis]\n{}", text.trim(), visual);
                        }
                    }
                }

                packets.push(Packet {
                    origin: record.location.clone(),
                    unit_index: index,
                    text,
                });
            }
        }

        for url in &selection.links_chosen {
            // Degraded fetches still produce a packet so the link counts as
            // consumed downstream.
            let text = fetcher.fetch(url).value().unwrap_or_default();
            packets.push(Packet {
                origin: url.clone(),
                unit_index: 0,
                text,
            });
        }

        Self::bound(packets, max_total_chars)
    }

    /// Enforce the global character budget over the packet stream.
    fn bound(packets: Vec<Packet>, max_total_chars: usize) -> Vec<Packet> {
        let mut bounded = Vec::new();
        let mut used = 0usize;

        for mut packet in packets {
            let trimmed = packet.text.trim();
            if trimmed.is_empty() {
                continue;
            }
            if used >= max_total_chars {
                break;
            }
            let budget = max_total_chars - used;
            let text = truncate_chars(trimmed, budget);
            used += text.chars().count();
            packet.text = text;
            bounded.push(packet);
        }

        bounded
    }
}

/// Truncate to at most `max` characters, never splitting a code point.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::softfail::Soft;
    use crate::types::{ScannedSource, SourceUnit, StudyloopError};
    use std::cell::RefCell;

    struct StubReader {
        kind: SourceKind,
        texts: Vec<&'static str>,
    }

    impl UnitReader for StubReader {
        fn fingerprint(&self, _path: &Path) -> Result<String, StudyloopError> {
            Ok("fp".to_string())
        }

        fn read(&self, _path: &Path) -> Result<ScannedSource, StudyloopError> {
            Ok(ScannedSource {
                kind: self.kind,
                units: self
                    .texts
                    .iter()
                    .enumerate()
                    .map(|(index, text)| SourceUnit {
                        index,
                        text: (*text).to_string(),
                    })
                    .collect(),
            })
        }
    }

    struct FailingReader;

    impl UnitReader for FailingReader {
        fn fingerprint(&self, _path: &Path) -> Result<String, StudyloopError> {
            Err(StudyloopError::Io("gone".to_string()))
        }

        fn read(&self, _path: &Path) -> Result<ScannedSource, StudyloopError> {
            Err(StudyloopError::Io("gone".to_string()))
        }
    }

    struct StubFetcher {
        down: bool,
    }

    impl LinkFetcher for StubFetcher {
        fn fetch(&self, url: &str) -> Soft<String> {
            if self.down {
                Soft::Degraded
            } else {
                Soft::Value(format!("text of {url}"))
            }
        }
    }

    struct CountingAugmenter {
        calls: RefCell<usize>,
    }

    impl VisualAugmenter for CountingAugmenter {
        fn describe(&self, _path: &Path, unit_index: usize, _kind: SourceKind) -> Soft<String> {
            *self.calls.borrow_mut() += 1;
            Soft::Value(format!("diagram on unit {unit_index}"))
        }
    }

    fn record(id: &str, kind: SourceKind, unit_count: usize) -> SourceRecord {
        SourceRecord {
            id: SourceId::new(id),
            location: id.to_string(),
            kind,
            fingerprint: "fp".to_string(),
            unit_count,
            cursor: 0,
        }
    }

    fn selection_of(id: &str, units: Vec<usize>) -> DailySelection {
        let mut selection = DailySelection::default();
        selection.units_by_source.insert(SourceId::new(id), units);
        selection
    }

    #[test]
    fn assembles_units_in_selection_order() {
        let reader = StubReader {
            kind: SourceKind::Document,
            texts: vec!["page zero", "page one", "page two"],
        };
        let sources = [(SourceId::new("/a"), record("/a", SourceKind::Document, 3))]
            .into_iter()
            .collect();
        let selection = selection_of("/a", vec![1, 2]);

        let packets = Assembler::assemble(
            &selection,
            &sources,
            &reader,
            &StubFetcher { down: false },
            None,
            VisionQuotas::default(),
            10_000,
        );

        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].unit_index, 1);
        assert_eq!(packets[0].text, "page one");
        assert_eq!(packets[1].unit_index, 2);
    }

    #[test]
    fn unreadable_source_contributes_nothing() {
        let sources = [(SourceId::new("/a"), record("/a", SourceKind::Text, 3))]
            .into_iter()
            .collect();
        let selection = selection_of("/a", vec![0]);

        let packets = Assembler::assemble(
            &selection,
            &sources,
            &FailingReader,
            &StubFetcher { down: false },
            None,
            VisionQuotas::default(),
            10_000,
        );

        assert!(packets.is_empty());
    }

    #[test]
    fn dead_link_yields_no_packet_after_bounding() {
        let mut selection = DailySelection::default();
        selection.links_chosen = vec!["https://dead.example".to_string()];

        let packets = Assembler::assemble(
            &selection,
            &BTreeMap::new(),
            &StubReader {
                kind: SourceKind::Text,
                texts: vec![],
            },
            &StubFetcher { down: true },
            None,
            VisionQuotas::default(),
            10_000,
        );

        // The empty-text packet is dropped by the budget pass; cursor
        // advancement still counts the link via the selection itself.
        assert!(packets.is_empty());
    }

    #[test]
    fn live_links_follow_source_packets() {
        let reader = StubReader {
            kind: SourceKind::Text,
            texts: vec!["chunk"],
        };
        let sources = [(SourceId::new("/a"), record("/a", SourceKind::Text, 1))]
            .into_iter()
            .collect();
        let mut selection = selection_of("/a", vec![0]);
        selection.links_chosen = vec!["https://example.org/x".to_string()];

        let packets = Assembler::assemble(
            &selection,
            &sources,
            &reader,
            &StubFetcher { down: false },
            None,
            VisionQuotas::default(),
            10_000,
        );

        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1].origin, "https://example.org/x");
        assert_eq!(packets[1].text, "text of https://example.org/x");
    }

    #[test]
    fn augmentation_is_appended_and_quota_bounded() {
        let reader = StubReader {
            kind: SourceKind::Document,
            texts: vec!["page zero", "page one", "page two"],
        };
        let sources = [(SourceId::new("/a"), record("/a", SourceKind::Document, 3))]
            .into_iter()
            .collect();
        let selection = selection_of("/a", vec![0, 1, 2]);
        let augmenter = CountingAugmenter {
            calls: RefCell::new(0),
        };

        let packets = Assembler::assemble(
            &selection,
            &sources,
            &reader,
            &StubFetcher { down: false },
            Some(&augmenter),
            VisionQuotas {
                document_pages: 2,
                images: 0,
            },
            10_000,
        );

        assert_eq!(*augmenter.calls.borrow(), 2);
        assert!(packets[0].text.contains("[Visual Analysis]"));
        assert!(packets[1].text.contains("[Visual Analysis]"));
        assert!(!packets[2].text.contains("[Visual Analysis]"));
    }

    #[test]
    fn character_budget_splits_last_packet_and_drops_rest() {
        let reader = StubReader {
            kind: SourceKind::Text,
            texts: vec!["aaaaa", "bbbbb", "ccccc"],
        };
        let sources = [(SourceId::new("/a"), record("/a", SourceKind::Text, 3))]
            .into_iter()
            .collect();
        let selection = selection_of("/a", vec![0, 1, 2]);

        let packets = Assembler::assemble(
            &selection,
            &sources,
            &reader,
            &StubFetcher { down: false },
            None,
            VisionQuotas::default(),
            8,
        );

        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].text, "aaaaa");
        assert_eq!(packets[1].text, "bbb");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("héllo", 99), "héllo");
    }

    #[test]
    fn whitespace_only_packets_are_skipped() {
        let reader = StubReader {
            kind: SourceKind::Text,
            texts: vec!["   \n\t  ", "real"],
        };
        let sources = [(SourceId::new("/a"), record("/a", SourceKind::Text, 2))]
            .into_iter()
            .collect();
        let selection = selection_of("/a", vec![0, 1]);

        let packets = Assembler::assemble(
            &selection,
            &sources,
            &reader,
            &StubFetcher { down: false },
            None,
            VisionQuotas::default(),
            10_000,
        );

        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].text, "real");
    }
}
