//! # Generation Client
//!
//! JSON-schema constrained client for an OpenAI-compatible chat-completions
//! API. It serves two collaborator contracts:
//!
//! - `plan_selection`: the optional external planner. Callers treat any
//!   error as "no plan" and fall back to the deterministic selection.
//! - `generate_lesson`: the mandatory lesson + flashcard generation. An
//!   empty lesson or an empty card list is a generation failure, which the
//!   run driver converts into a hard error (no progress advancement).

use crate::config::GenerationSettings;
use crate::http::{self, ClientError};
use crate::review::FailedCard;
use serde_json::{Value, json};
use std::time::Duration;
use studyloop_core::{ExternalPlan, Packet, SourceKind, StudyloopError};

// =============================================================================
// REQUEST / RESPONSE TYPES
// =============================================================================

/// One flashcard.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Card {
    pub front: String,
    pub back: String,
}

/// The generated lesson plus its cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonBundle {
    pub lesson_markdown: String,
    pub cards: Vec<Card>,
}

/// Per-source statistics handed to the external planner.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SourceStat {
    pub source_id: String,
    pub kind: SourceKind,
    pub remaining_units: usize,
}

// =============================================================================
// CLIENT
// =============================================================================

/// Client for the generation service.
pub struct GenerationClient {
    http: reqwest::blocking::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GenerationClient {
    /// Create a client; requires the environment-supplied API key.
    pub fn new(settings: &GenerationSettings, api_key: String) -> Result<Self, StudyloopError> {
        Ok(Self {
            http: http::blocking_client(Duration::from_secs(settings.request_timeout_secs))?,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: settings.model.clone(),
        })
    }

    /// One schema-constrained completion: returns the parsed JSON payload
    /// the model produced.
    fn json_schema_request(
        &self,
        system_prompt: &str,
        user_payload: &Value,
        schema_name: &str,
        schema: Value,
    ) -> Result<Value, ClientError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_payload.to_string() },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "strict": true,
                    "schema": schema,
                },
            },
        });

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| ClientError::ConnectionFailed(format!("{}: {e}", self.api_base)))?;
        let payload = http::handle_json_response(resp)?;

        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::ParseError("response has no message content".to_string()))?;
        serde_json::from_str(content)
            .map_err(|e| ClientError::ParseError(format!("model emitted invalid JSON: {e}")))
    }

    // =========================================================================
    // EXTERNAL PLANNER
    // =========================================================================

    /// Ask the service how to spend today's budgets.
    ///
    /// The result is advisory; the selection planner re-clamps every field.
    pub fn plan_selection(
        &self,
        source_stats: &[SourceStat],
        preferences: &Value,
    ) -> Result<ExternalPlan, ClientError> {
        let schema = json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "target_words": { "type": "integer" },
                "target_cards": { "type": "integer" },
                "per_source_units": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "source_id": { "type": "string" },
                            "units": { "type": "integer" },
                        },
                        "required": ["source_id", "units"],
                    },
                },
                "links_to_use": { "type": "integer" },
            },
            "required": ["target_words", "target_cards", "per_source_units", "links_to_use"],
        });

        let payload = json!({
            "source_stats": source_stats,
            "preferences": preferences,
        });

        let plan = self.json_schema_request(
            "You are a study-load planner. Return valid JSON only.",
            &payload,
            "plan",
            schema,
        )?;
        serde_json::from_value(plan).map_err(|e| ClientError::ParseError(e.to_string()))
    }

    // =========================================================================
    // LESSON GENERATION
    // =========================================================================

    /// Generate the lesson and its flashcards from the assembled packets.
    pub fn generate_lesson(
        &self,
        packets: &[Packet],
        failed_cards: &[FailedCard],
        target_words: usize,
        target_cards: usize,
    ) -> Result<LessonBundle, ClientError> {
        let schema = json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "lesson_markdown": { "type": "string" },
                "cards": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "front": { "type": "string" },
                            "back": { "type": "string" },
                        },
                        "required": ["front", "back"],
                    },
                },
            },
            "required": ["lesson_markdown", "cards"],
        });

        let source_packets: Vec<Value> = packets
            .iter()
            .map(|packet| {
                json!({
                    "source": packet.origin,
                    "unit_index": packet.unit_index,
                    "text": packet.text,
                })
            })
            .collect();

        let payload = json!({
            "student_goal": "Understand today's study material and correct recent mistakes",
            "lesson_source_text": source_packets,
            "recent_failures": failed_cards,
            "teaching_instructions": [
                "Teach the main material from the sources.",
                "Explicitly re-teach the failed items.",
                "Create example sentences using failed items in new contexts.",
                "Make reinforcement feel like part of the lesson, not a separate drill.",
            ],
            "constraints": {
                "target_words": target_words,
                "target_cards": target_cards,
            },
        });

        let data = self.json_schema_request(
            "You are an instructional designer. Return valid JSON only.",
            &payload,
            "lesson",
            schema,
        )?;
        parse_lesson_bundle(&data, target_cards)
    }
}

/// Validate and shape the raw lesson payload.
fn parse_lesson_bundle(data: &Value, target_cards: usize) -> Result<LessonBundle, ClientError> {
    let lesson_markdown = data
        .get("lesson_markdown")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    if lesson_markdown.is_empty() {
        return Err(ClientError::ParseError(
            "model response missing lesson content".to_string(),
        ));
    }

    let mut cards: Vec<Card> = data
        .get("cards")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
        .iter()
        .filter_map(|card| serde_json::from_value::<Card>(card.clone()).ok())
        .filter(|card| !card.front.trim().is_empty() && !card.back.trim().is_empty())
        .collect();
    if cards.is_empty() {
        return Err(ClientError::ParseError(
            "model response missing flashcards".to_string(),
        ));
    }
    cards.truncate(target_cards);

    Ok(LessonBundle {
        lesson_markdown,
        cards,
    })
}

// =============================================================================
// TESTS
// =============================================================================
