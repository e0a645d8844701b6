//! The structured text-generation capability consumed by the agents.

use crate::error::LlmError;
use crate::llm::{ollama::OllamaClient, openai::OpenAiClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Which backend serves generation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Local Ollama server (default)
    #[default]
    Ollama,
    /// OpenAI or any compatible chat-completions endpoint
    Openai,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Ollama => "http://localhost:11434",
            Provider::Openai => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Ollama => "llama3.2:latest",
            Provider::Openai => "gpt-4o-mini",
        }
    }
}

/// Shape the caller expects the generated text to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Free-form text (markdown reports).
    Text,
    /// A single JSON object; backends are asked to enforce it.
    Json,
}

/// One generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Who is asking (agent or report type), for logs.
    pub label: String,
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub shape: ResponseShape,
}

impl GenerationRequest {
    /// A JSON-object request with no system message.
    pub fn json(label: impl Into<String>, prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            label: label.into(),
            system: None,
            prompt: prompt.into(),
            temperature,
            shape: ResponseShape::Json,
        }
    }

    /// A free-text request with a system role description.
    pub fn text(
        label: impl Into<String>,
        system: impl Into<String>,
        prompt: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            label: label.into(),
            system: Some(system.into()),
            prompt: prompt.into(),
            temperature,
            shape: ResponseShape::Text,
        }
    }
}

/// Structured text generation. Implementations must tolerate concurrent calls.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `request`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;

    /// Model identifier, recorded in report metadata.
    fn model_name(&self) -> &str;
}

/// Message in a chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Build the system + user message list for a request.
    pub fn for_request(request: &GenerationRequest) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });
        messages
    }
}

/// Empty completions become `{}` for JSON requests so callers always get an object.
pub fn normalize_content(shape: ResponseShape, content: Option<String>) -> String {
    match (shape, content) {
        (ResponseShape::Json, None) => "{}".to_string(),
        (ResponseShape::Json, Some(c)) if c.trim().is_empty() => "{}".to_string(),
        (_, Some(c)) => c,
        (ResponseShape::Text, None) => String::new(),
    }
}

/// Everything needed to construct a backend client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub timeout_seconds: u64,
    pub api_key: Option<String>,
}

/// Build the process-wide client for the configured provider.
pub fn build_client(config: &ClientConfig) -> Result<Arc<dyn TextGenerator>, LlmError> {
    info!(
        "Using {:?} model {} at {}",
        config.provider, config.model, config.base_url
    );

    let client: Arc<dyn TextGenerator> = match config.provider {
        Provider::Ollama => Arc::new(OllamaClient::new(
            &config.base_url,
            &config.model,
            config.timeout_seconds,
        )?),
        Provider::Openai => {
            let api_key = config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    LlmError::Config("an API key is required for the openai provider".to_string())
                })?;
            Arc::new(OpenAiClient::new(
                &config.base_url,
                &config.model,
                &api_key,
                config.timeout_seconds,
            )?)
        }
    };

    Ok(client)
}
