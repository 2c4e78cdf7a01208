//! # Filesystem Unit Reader
//!
//! The bundled `UnitReader` implementation plus content-folder discovery and
//! the link manifest loader.
//!
//! ## Unit conventions
//!
//! - Plain text containing form-feed (`\x0c`) separators is page-structured:
//!   one unit per page (`document` kind).
//! - Markdown with two or more `---` separator lines is treated as a slide
//!   deck (Marp-style): one unit per slide (`slides` kind).
//! - Any other text or markdown splits into fixed-size word chunks
//!   (`text` kind).
//! - Images yield a single empty-text unit (`image` kind); their content
//!   arrives through visual augmentation at assembly time.
//!
//! PDF/DOCX and similar binary formats stay behind the `UnitReader` trait
//! for external implementations.

use std::path::{Path, PathBuf};
use studyloop_core::{DiscoveredSource, ScannedSource, SourceKind, SourceUnit, StudyloopError};

/// Extensions the discovery walk accepts.
pub const STUDY_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "png", "jpg", "jpeg", "webp"];

/// The link manifest file name inside the content folder.
pub const LINKS_MANIFEST: &str = "links.txt";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

// =============================================================================
// READER
// =============================================================================

/// Reads study files from disk: blake3 fingerprints, unit splitting per the
/// conventions above.
#[derive(Debug, Clone)]
pub struct FsUnitReader {
    chunk_words: usize,
}

impl FsUnitReader {
    /// Create a reader that chunks free-running text every `chunk_words`
    /// words.
    #[must_use]
    pub fn new(chunk_words: usize) -> Self {
        Self { chunk_words }
    }
}

impl studyloop_core::UnitReader for FsUnitReader {
    fn fingerprint(&self, path: &Path) -> Result<String, StudyloopError> {
        let bytes = std::fs::read(path)
            .map_err(|e| StudyloopError::Io(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }

    fn read(&self, path: &Path) -> Result<ScannedSource, StudyloopError> {
        let ext = extension_of(path);

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(ScannedSource {
                kind: SourceKind::Image,
                units: vec![SourceUnit {
                    index: 0,
                    text: String::new(),
                }],
            });
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| StudyloopError::Io(format!("cannot read {}: {}", path.display(), e)))?;

        if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) && count_slide_separators(&text) >= 2 {
            return Ok(ScannedSource {
                kind: SourceKind::Slides,
                units: to_units(split_slides(&text)),
            });
        }
        if text.contains('\x0c') {
            return Ok(ScannedSource {
                kind: SourceKind::Document,
                units: to_units(split_pages(&text)),
            });
        }
        Ok(ScannedSource {
            kind: SourceKind::Text,
            units: to_units(split_words(&text, self.chunk_words)),
        })
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn to_units(texts: Vec<String>) -> Vec<SourceUnit> {
    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| SourceUnit { index, text })
        .collect()
}

// =============================================================================
// SPLITTERS
// =============================================================================

/// Split on form feeds; whitespace-only pages are dropped.
fn split_pages(text: &str) -> Vec<String> {
    text.split('\x0c')
        .map(|page| page.trim().to_string())
        .filter(|page| !page.is_empty())
        .collect()
}

fn count_slide_separators(text: &str) -> usize {
    text.lines().filter(|line| line.trim() == "---").count()
}

/// Split on `---` separator lines; whitespace-only slides are dropped.
fn split_slides(text: &str) -> Vec<String> {
    let mut slides = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.trim() == "---" {
            if !current.trim().is_empty() {
                slides.push(current.trim().to_string());
            }
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.trim().is_empty() {
        slides.push(current.trim().to_string());
    }
    slides
}

/// Split into chunks of `chunk_words` whitespace-separated words.
fn split_words(text: &str, chunk_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(chunk_words.max(1))
        .map(|chunk| chunk.join(" "))
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

// =============================================================================
// DISCOVERY & LINK MANIFEST
// =============================================================================

/// Recursively discover study files under `content_dir`, sorted by path for
/// deterministic registry order. The link manifest is excluded.
pub fn discover_files(content_dir: &Path) -> Result<Vec<DiscoveredSource>, StudyloopError> {
    let mut paths = Vec::new();
    walk(content_dir, &mut paths)
        .map_err(|e| StudyloopError::Io(format!("cannot scan {}: {}", content_dir.display(), e)))?;

    paths.retain(|path| {
        let named_manifest = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().eq_ignore_ascii_case(LINKS_MANIFEST));
        !named_manifest && STUDY_EXTENSIONS.contains(&extension_of(path).as_str())
    });
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| {
            // Canonicalize for a stable identity; fall back to the raw path
            // if resolution fails mid-walk (e.g. the file just vanished).
            let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
            DiscoveredSource::new(canonical)
        })
        .collect())
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Load the ordered link manifest. Missing manifest or read errors yield an
/// empty list (fail-soft): links are optional material.
pub fn load_links(content_dir: &Path) -> Vec<String> {
    let manifest = content_dir.join(LINKS_MANIFEST);
    let Ok(raw) = std::fs::read_to_string(&manifest) else {
        return Vec::new();
    };
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
