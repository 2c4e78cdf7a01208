//! # Review Deck Client
//!
//! Pulls recently-failed flashcards from an AnkiConnect-compatible endpoint
//! so the generated lesson can re-teach them. Entirely best-effort: every
//! failure path yields an empty list and the lesson simply gets no
//! reinforcement material.

use crate::http::{self, ClientError};
use serde_json::{Value, json};
use std::time::Duration;
use studyloop_core::StudyloopError;

/// One failed card, front and back text.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FailedCard {
    pub front: String,
    pub back: String,
}

// =============================================================================
// CLIENT
// =============================================================================

/// JSON-RPC client for an AnkiConnect-compatible review service.
pub struct ReviewClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl ReviewClient {
    /// Create a client for the given endpoint.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StudyloopError> {
        Ok(Self {
            http: http::blocking_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    /// One AnkiConnect invocation: `{action, version, params}` in,
    /// `{result, error}` out.
    fn invoke(&self, action: &str, params: Value) -> Result<Value, ClientError> {
        let body = json!({
            "action": action,
            "version": 6,
            "params": params,
        });
        let resp = self
            .http
            .post(&self.base_url)
            .json(&body)
            .send()
            .map_err(|e| ClientError::ConnectionFailed(format!("{}: {e}", self.base_url)))?;
        let payload = http::handle_json_response(resp)?;
        if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
            return Err(ClientError::ServerError(200, error.to_string()));
        }
        Ok(payload.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Cards rated "Again" within the lookback window, capped at `limit`.
    ///
    /// Fail-soft: any error returns an empty list.
    pub fn recent_failed_cards(&self, lookback_days: usize, limit: usize) -> Vec<FailedCard> {
        match self.try_recent_failed_cards(lookback_days, limit) {
            Ok(cards) => cards,
            Err(e) => {
                tracing::warn!(error = %e, "review lookup degraded, no reinforcement cards");
                Vec::new()
            }
        }
    }

    fn try_recent_failed_cards(
        &self,
        lookback_days: usize,
        limit: usize,
    ) -> Result<Vec<FailedCard>, ClientError> {
        // rated:N:1 = rated "Again" (failed recall) within the last N days.
        let query = format!("rated:{lookback_days}:1");
        let card_ids = self.invoke("findCards", json!({ "query": query }))?;
        let card_ids: Vec<Value> = card_ids
            .as_array()
            .map(|ids| ids.iter().take(limit.saturating_mul(2)).cloned().collect())
            .unwrap_or_default();
        if card_ids.is_empty() {
            return Ok(Vec::new());
        }

        let infos = self.invoke("cardsInfo", json!({ "cards": card_ids }))?;
        let mut cards = Vec::new();
        for info in infos.as_array().map(Vec::as_slice).unwrap_or(&[]) {
            let Some(fields) = info.get("fields").and_then(Value::as_object) else {
                continue;
            };
            let values: Vec<String> = fields
                .values()
                .filter_map(|field| field.get("value").and_then(Value::as_str))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .collect();

            let front = values.first().cloned().unwrap_or_default();
            let back = values.get(1).cloned().unwrap_or_default();
            if !front.is_empty() || !back.is_empty() {
                cards.push(FailedCard { front, back });
            }
            if cards.len() >= limit {
                break;
            }
        }
        Ok(cards)
    }
}
