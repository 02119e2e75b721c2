//! Primary generation backend client
//!
//! One `POST` per prompt with `prompt` and `max_new_tokens` as query
//! parameters and no body. The backend answers `{ "response": "..." }`.

use super::{LlmError, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const DEFAULT_MAX_NEW_TOKENS: u32 = 256;

/// HTTP client for the primary generation endpoint
pub struct HttpGenerationClient {
    client: Client,
    endpoint: String,
    max_new_tokens: u32,
}

impl HttpGenerationClient {
    pub fn new(client: Client, endpoint: impl Into<String>, max_new_tokens: u32) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            max_new_tokens,
        }
    }

    fn parse_body(body: &str) -> Result<String, LlmError> {
        let parsed: GenerationResponse = serde_json::from_str(body).map_err(|e| {
            LlmError::invalid_payload(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        match parsed.response {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(LlmError::invalid_payload(
                "Response payload has no `response` text",
            )),
        }
    }
}

#[async_trait]
impl TextGenerator for HttpGenerationClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let max_new_tokens = self.max_new_tokens.to_string();
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("prompt", prompt), ("max_new_tokens", max_new_tokens.as_str())])
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(LlmError::from_response(
                status.as_u16(),
                &headers,
                format!("Generation failed with HTTP {status}: {body}"),
            ));
        }

        Self::parse_body(&body)
    }

    fn name(&self) -> &str {
        "generation"
    }
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    response: Option<String>,
}
