//! # Link Text Fetcher
//!
//! Fetches reference links and reduces the HTML to plain text. Best-effort:
//! any failure (connection, status, decoding) degrades to an empty packet
//! rather than aborting the run.

use crate::http::{self, ClientError};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use studyloop_core::{LinkFetcher, Soft, StudyloopError};

static SCRIPT_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)>")
        .expect("valid pattern")
});
static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid pattern"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid pattern"));

// =============================================================================
// FETCHER
// =============================================================================

/// HTTP link fetcher with a hard character cap per page.
pub struct HttpFetcher {
    http: reqwest::blocking::Client,
    max_chars: usize,
}

impl HttpFetcher {
    /// Create a fetcher with the given per-request timeout and page cap.
    pub fn new(timeout: Duration, max_chars: usize) -> Result<Self, StudyloopError> {
        Ok(Self {
            http: http::blocking_client(timeout)?,
            max_chars,
        })
    }

    fn get_text(&self, url: &str) -> Result<String, ClientError> {
        let resp = self
            .http
            .get(url)
            .send()
            .map_err(|e| ClientError::ConnectionFailed(format!("{url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::ServerError(status.as_u16(), url.to_string()));
        }
        let body = resp
            .text()
            .map_err(|e| ClientError::ParseError(e.to_string()))?;
        let mut text = html_to_text(&body);
        if text.chars().count() > self.max_chars {
            text = text.chars().take(self.max_chars).collect();
        }
        Ok(text)
    }
}

impl LinkFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Soft<String> {
        match self.get_text(url) {
            Ok(text) => Soft::Value(text),
            Err(e) => {
                tracing::warn!(url, error = %e, "link fetch degraded");
                Soft::Degraded
            }
        }
    }
}

// =============================================================================
// HTML REDUCTION
// =============================================================================

/// Reduce an HTML document to whitespace-normalized plain text.
pub fn html_to_text(html: &str) -> String {
    let without_blocks = SCRIPT_BLOCKS.replace_all(html, " ");
    let without_tags = TAGS.replace_all(&without_blocks, " ");
    let decoded = decode_entities(&without_tags);
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

// =============================================================================
// TESTS
// =============================================================================
