//! Error types shared across the analysis pipeline.

use crate::models::AgentType;
use std::time::Duration;

/// Failures surfaced by a text-generation backend.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("request failed: {0}")]
    Request(String),

    #[error("model API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("client configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Classify a transport error the way the CLI reports it.
    pub fn from_reqwest(err: reqwest::Error, endpoint: &str, timeout_seconds: u64) -> Self {
        if err.is_timeout() {
            LlmError::Timeout {
                after: Duration::from_secs(timeout_seconds),
            }
        } else if err.is_connect() {
            LlmError::Request(format!("cannot connect to {endpoint}"))
        } else if err.is_decode() {
            LlmError::MalformedResponse(err.to_string())
        } else {
            LlmError::Request(err.to_string())
        }
    }
}

/// Fatal failures of a whole orchestration run.
///
/// Per-agent failures never show up here; they become degraded results.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("agent task join error: {detail}")]
    TaskJoin { detail: String },

    #[error("no result was collected for agent {agent}")]
    MissingResult { agent: AgentType },
}

/// Failures of the narrative report generator.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("unknown report type: {0}")]
    InvalidReportType(String),

    #[error("invalid report data: {0}")]
    InvalidData(String),

    #[error("report generation failed: {0}")]
    Generation(#[from] LlmError),
}

/// Result type for orchestration operations.
pub type OrchestrationResult<T> = std::result::Result<T, OrchestrationError>;
