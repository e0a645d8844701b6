//! OpenAI-compatible chat-completions backend.

use crate::error::LlmError;
use crate::llm::client::{normalize_content, ChatMessage, GenerationRequest, ResponseShape, TextGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for `POST {base_url}/chat/completions`.
pub struct OpenAiClient {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout_seconds: u64,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout_seconds: u64,
    ) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| LlmError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            timeout_seconds,
        })
    }

    fn build_request<'a>(&'a self, request: &GenerationRequest) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            messages: ChatMessage::for_request(request),
            temperature: request.temperature,
            response_format: match request.shape {
                ResponseShape::Json => Some(ResponseFormat { kind: "json_object" }),
                ResponseShape::Text => None,
            },
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request(request);

        debug!("Sending {} request to {}", request.label, url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(e, &self.base_url, self.timeout_seconds))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            LlmError::MalformedResponse(format!("failed to parse completion response: {e}"))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::MalformedResponse("completion has no choices".to_string()))?
            .message
            .content;

        Ok(normalize_content(request.shape, content))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiClient {
        OpenAiClient::new("https://api.openai.com/v1/", "gpt-4o-mini", "sk-test", 30).unwrap()
    }

    #[test]
    fn test_json_request_sets_response_format() {
        let client = client();
        let request = GenerationRequest::json("compliance", "Check compliance.", 0.1);

        let value = serde_json::to_value(client.build_request(&request)).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(client.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_text_request_has_no_response_format() {
        let client = client();
        let request = GenerationRequest::text("tax_filing", "You are a tax pro.", "File.", 0.1);

        let value = serde_json::to_value(client.build_request(&request)).unwrap();
        assert!(value.get("response_format").is_none());
        assert_eq!(value["messages"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_parse_completion_with_null_content() {
        let parsed: CompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#)
                .unwrap();
        let content = parsed.choices.into_iter().next().unwrap().message.content;
        assert_eq!(normalize_content(ResponseShape::Json, content), "{}");
    }
}
