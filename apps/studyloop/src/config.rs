//! # Settings
//!
//! TOML-backed application configuration. Every tunable has a serde default
//! so a partial file works; the generation API key is never read from the
//! file, only from the `STUDYLOOP_API_KEY` environment variable.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use studyloop_core::{BudgetConfig, StudyloopError, VisionQuotas};

/// Environment variable holding the generation-service API key.
pub const API_KEY_ENV: &str = "STUDYLOOP_API_KEY";

// =============================================================================
// SETTINGS SECTIONS
// =============================================================================

/// Daily trigger time (local clock).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Hour of day, 0-23.
    pub hour: u32,
    /// Minute, 0-59.
    pub minute: u32,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self { hour: 7, minute: 0 }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Folder scanned for study material and the `links.txt` manifest.
    pub content_dir: PathBuf,
    /// The progress ledger file.
    pub state_file: PathBuf,
    /// Where lessons and card decks are delivered.
    pub output_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            state_file: PathBuf::from("state/progress.json"),
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Lesson length preferences.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LessonSettings {
    pub target_words: usize,
    pub min_words: usize,
    pub max_words: usize,
}

impl Default for LessonSettings {
    fn default() -> Self {
        Self {
            target_words: 600,
            min_words: 300,
            max_words: 1200,
        }
    }
}

/// Flashcard preferences, including the reinforcement lookback.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CardSettings {
    pub per_day: usize,
    pub min_cards: usize,
    pub max_cards: usize,
    /// How many days back to look for failed review cards.
    pub review_lookback_days: usize,
    /// Upper bound on failed cards fed into generation.
    pub review_limit: usize,
}

impl Default for CardSettings {
    fn default() -> Self {
        Self {
            per_day: 12,
            min_cards: 6,
            max_cards: 20,
            review_lookback_days: 7,
            review_limit: 20,
        }
    }
}

/// Consumption budgets and unit-splitting parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    /// Pages shared among paginated sources per day.
    pub default_pages_per_day: usize,
    /// Links consumed per day unless the plan says otherwise.
    pub default_links_per_day: usize,
    /// Words per chunk when splitting free-running text.
    pub chunk_words: usize,
    /// Hard ceiling on units selected per day.
    pub max_total_units_per_day: usize,
    /// Seconds before a link fetch is abandoned.
    pub fetch_timeout_secs: u64,
    /// Character cap applied to each fetched link.
    pub max_link_chars: usize,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            default_pages_per_day: 6,
            default_links_per_day: 2,
            chunk_words: 400,
            max_total_units_per_day: 12,
            fetch_timeout_secs: 15,
            max_link_chars: 12_000,
        }
    }
}

/// Generation-service client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Base URL of an OpenAI-compatible API.
    pub api_base: String,
    pub model: String,
    /// Model for visual analysis; empty falls back to `model`.
    pub vision_model: String,
    /// Global character budget for the assembled packet stream.
    pub max_source_chars: usize,
    pub enable_document_vision: bool,
    pub enable_image_vision: bool,
    pub vision_max_pages_per_day: usize,
    pub vision_max_images_per_day: usize,
    /// Seconds before a generation request is abandoned.
    pub request_timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-mini".to_string(),
            vision_model: String::new(),
            max_source_chars: 24_000,
            enable_document_vision: false,
            enable_image_vision: true,
            vision_max_pages_per_day: 4,
            vision_max_images_per_day: 4,
            request_timeout_secs: 180,
        }
    }
}

/// Review-deck (failed cards) client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReviewSettings {
    /// AnkiConnect-compatible endpoint; empty disables the lookup.
    pub url: String,
    /// Seconds before a review request is abandoned.
    pub request_timeout_secs: u64,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8765".to_string(),
            request_timeout_secs: 10,
        }
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Full application settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub schedule: ScheduleSettings,
    pub paths: PathSettings,
    pub lesson: LessonSettings,
    pub cards: CardSettings,
    pub ingestion: IngestionSettings,
    pub generation: GenerationSettings,
    pub review: ReviewSettings,

    /// Generation API key, environment-only.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Settings {
    /// Load settings from a TOML file. A missing file yields defaults so
    /// that `status` and `init` work before any configuration exists.
    pub fn load(path: &Path) -> Result<Self, StudyloopError> {
        let mut settings = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                StudyloopError::Io(format!("cannot read {}: {}", path.display(), e))
            })?;
            toml::from_str::<Self>(&raw).map_err(|e| {
                StudyloopError::InvalidConfig(format!("{}: {}", path.display(), e))
            })?
        } else {
            tracing::debug!(config = %path.display(), "config file missing, using defaults");
            Self::default()
        };
        settings.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        settings.validate()?;
        Ok(settings)
    }

    /// Reject inconsistent or unusable values before a run starts.
    pub fn validate(&self) -> Result<(), StudyloopError> {
        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            return Err(StudyloopError::InvalidConfig(
                "schedule hour/minute out of range".to_string(),
            ));
        }
        if self.lesson.min_words > self.lesson.max_words {
            return Err(StudyloopError::InvalidConfig(
                "lesson.min_words exceeds lesson.max_words".to_string(),
            ));
        }
        if self.cards.min_cards > self.cards.max_cards {
            return Err(StudyloopError::InvalidConfig(
                "cards.min_cards exceeds cards.max_cards".to_string(),
            ));
        }
        if self.ingestion.chunk_words == 0 {
            return Err(StudyloopError::InvalidConfig(
                "ingestion.chunk_words must be at least 1".to_string(),
            ));
        }
        if self.ingestion.max_total_units_per_day == 0 {
            return Err(StudyloopError::InvalidConfig(
                "ingestion.max_total_units_per_day must be at least 1".to_string(),
            ));
        }
        if self.paths.content_dir.as_os_str().is_empty()
            || self.paths.output_dir.as_os_str().is_empty()
            || self.paths.state_file.as_os_str().is_empty()
        {
            return Err(StudyloopError::InvalidConfig(
                "paths.content_dir, paths.state_file and paths.output_dir are required".to_string(),
            ));
        }
        Ok(())
    }

    /// Budgets handed to the selection planner.
    #[must_use]
    pub fn budget(&self) -> BudgetConfig {
        BudgetConfig {
            target_words: self.lesson.target_words,
            min_words: self.lesson.min_words,
            max_words: self.lesson.max_words,
            target_cards: self.cards.per_day,
            min_cards: self.cards.min_cards,
            max_cards: self.cards.max_cards,
            default_pages_per_day: self.ingestion.default_pages_per_day,
            default_links_per_day: self.ingestion.default_links_per_day,
            max_units_per_day: self.ingestion.max_total_units_per_day,
        }
    }

    /// Per-day visual-augmentation quotas; disabled paths are zero.
    #[must_use]
    pub fn vision_quotas(&self) -> VisionQuotas {
        VisionQuotas {
            document_pages: if self.generation.enable_document_vision {
                self.generation.vision_max_pages_per_day
            } else {
                0
            },
            images: if self.generation.enable_image_vision {
                self.generation.vision_max_images_per_day
            } else {
                0
            },
        }
    }

    /// The model used for visual analysis.
    #[must_use]
    pub fn vision_model(&self) -> &str {
        if self.generation.vision_model.is_empty() {
            &self.generation.model
        } else {
            &self.generation.vision_model
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
