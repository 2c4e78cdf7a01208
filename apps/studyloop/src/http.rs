//! # HTTP Client Plumbing
//!
//! Shared error taxonomy and client construction for the collaborator
//! clients (generation, vision, review, link fetching). All clients are
//! blocking (the run executes on a blocking task) and every request is
//! bounded by a client-level timeout.

use std::time::Duration;
use studyloop_core::StudyloopError;

/// Errors from the HTTP client layer.
#[derive(Debug)]
pub enum ClientError {
    /// Cannot reach the remote service.
    ConnectionFailed(String),
    /// 401 Unauthorized - invalid or missing API key.
    Unauthorized,
    /// 429 Too Many Requests.
    RateLimited,
    /// The service returned a non-success status.
    ServerError(u16, String),
    /// Failed to parse the response body.
    ParseError(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionFailed(url) => write!(f, "Cannot connect to {url}"),
            Self::Unauthorized => write!(f, "Unauthorized: invalid or missing API key"),
            Self::RateLimited => write!(f, "Rate limited: too many requests"),
            Self::ServerError(status, msg) => write!(f, "Server error ({status}): {msg}"),
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

/// Build a blocking client with the given request timeout.
pub fn blocking_client(timeout: Duration) -> Result<reqwest::blocking::Client, StudyloopError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("studyloop/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| StudyloopError::Io(format!("cannot build HTTP client: {e}")))
}

/// Map a response to JSON, surfacing the standard status-code taxonomy.
pub fn handle_json_response(
    resp: reqwest::blocking::Response,
) -> Result<serde_json::Value, ClientError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized);
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ClientError::RateLimited);
    }
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(ClientError::ServerError(status.as_u16(), body));
    }
    resp.json::<serde_json::Value>()
        .map_err(|e| ClientError::ParseError(e.to_string()))
}
