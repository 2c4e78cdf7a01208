//! # Delivery
//!
//! Writes the generated lesson and its card deck into the output directory:
//! `lesson-YYYY-MM-DD.md` and an importable tab-separated `cards-YYYY-MM-DD.tsv`.

use crate::generate::LessonBundle;
use std::path::{Path, PathBuf};
use studyloop_core::StudyloopError;

/// Paths of the files a delivery produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredFiles {
    pub lesson_path: PathBuf,
    pub deck_path: PathBuf,
}

/// Write the lesson and deck for the given date stamp (YYYY-MM-DD).
pub fn deliver(
    output_dir: &Path,
    date_stamp: &str,
    bundle: &LessonBundle,
) -> Result<DeliveredFiles, StudyloopError> {
    std::fs::create_dir_all(output_dir).map_err(|e| {
        StudyloopError::Delivery(format!("cannot create {}: {}", output_dir.display(), e))
    })?;

    let lesson_path = output_dir.join(format!("lesson-{date_stamp}.md"));
    std::fs::write(&lesson_path, &bundle.lesson_markdown).map_err(|e| {
        StudyloopError::Delivery(format!("cannot write {}: {}", lesson_path.display(), e))
    })?;

    let deck_path = output_dir.join(format!("cards-{date_stamp}.tsv"));
    std::fs::write(&deck_path, render_deck(bundle)).map_err(|e| {
        StudyloopError::Delivery(format!("cannot write {}: {}", deck_path.display(), e))
    })?;

    Ok(DeliveredFiles {
        lesson_path,
        deck_path,
    })
}

/// Render the deck as importable TSV: header directives, then one
/// `front<TAB>back` row per card.
fn render_deck(bundle: &LessonBundle) -> String {
    let mut out = String::from("#separator:tab\n#html:false\n");
    for card in &bundle.cards {
        let front = sanitize(&card.front);
        let back = sanitize(&card.back);
        if front.is_empty() || back.is_empty() {
            continue;
        }
        out.push_str(&front);
        out.push('\t');
        out.push_str(&back);
        out.push('\n');
    }
    out
}

/// TSV fields cannot carry tabs or newlines.
fn sanitize(field: &str) -> String {
    field
        .replace(['\t', '\n', '\r'], " ")
        .trim()
        .to_string()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::Card;

    fn bundle() -> LessonBundle {
        LessonBundle {
            lesson_markdown: "# Lesson".to_string(),
            cards: vec![
                Card {
                    front: "what\tis".to_string(),
                    back: "multi\nline".to_string(),
                },
                Card {
                    front: "q2".to_string(),
                    back: "a2".to_string(),
                },
            ],
        }
    }

    #[test]
    fn deck_rows_are_sanitized() {
        let deck = render_deck(&bundle());
        let mut lines = deck.lines();
        assert_eq!(lines.next(), Some("#separator:tab"));
        assert_eq!(lines.next(), Some("#html:false"));
        assert_eq!(lines.next(), Some("what is\tmulti line"));
        assert_eq!(lines.next(), Some("q2\ta2"));
    }

    #[test]
    fn delivery_writes_both_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let files = deliver(dir.path(), "2026-08-07", &bundle()).expect("deliver");

        assert!(files.lesson_path.ends_with("lesson-2026-08-07.md"));
        assert!(files.lesson_path.exists());
        assert!(files.deck_path.exists());
    }
}
