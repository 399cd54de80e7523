//! Gemini `generateContent` client.
//!
//! Sends one prompt with `responseMimeType: application/json` and a
//! `responseSchema`, and returns the candidate text. No retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::PlannerConfig;
use crate::llm::{LlmError, PlanModel, StructuredRequest};

/// Upper bound on error-body text carried into error messages.
const MAX_ERROR_MESSAGE_CHARS: usize = 500;

pub struct GeminiClient {
    model: String,
    api_key: HeaderValue,
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl GeminiClient {
    /// Build a client from resolved configuration. Performs no network I/O.
    ///
    /// A missing, blank or unsendable API key fails here, before any
    /// request exists.
    pub fn from_config(config: &PlannerConfig) -> Result<Self, LlmError> {
        let key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(LlmError::MissingApiKey)?;
        let mut api_key = HeaderValue::from_str(key).map_err(|_| LlmError::InvalidApiKey)?;
        api_key.set_sensitive(true);

        let timeout = config.request_timeout();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::ClientBuild)?;

        debug!(model = %config.model, base_url = %config.base_url, "gemini client ready");

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            timeout,
            http,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl PlanModel for GeminiClient {
    async fn generate_json(&self, request: &StructuredRequest) -> Result<String, LlmError> {
        let url = self.endpoint();
        debug!(%url, prompt = %format!("<prompt len={}>", request.prompt.len()), "generateContent");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.clone())
            .json(&build_request_body(request))
            .send()
            .await
            .map_err(|e| LlmError::from_transport(e, self.timeout))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::from_transport(e, self.timeout))?;

        if !(200..300).contains(&status) {
            debug!(status, "generateContent failed");
            return Err(LlmError::from_status(status, error_message(&body)));
        }

        let envelope: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::InvalidEnvelope(e.to_string()))?;
        extract_text(envelope)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Request body for `generateContent`.
fn build_request_body(request: &StructuredRequest) -> serde_json::Value {
    json!({
        "contents": [
            {"role": "user", "parts": [{"text": request.prompt}]}
        ],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": request.schema,
            "temperature": request.temperature,
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Concatenate the text parts of the first candidate.
fn extract_text(envelope: GenerateContentResponse) -> Result<String, LlmError> {
    let Some(candidate) = envelope.candidates.into_iter().next() else {
        let reason = envelope
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("prompt blocked: {r}"))
            .unwrap_or_else(|| "no candidates".to_owned());
        return Err(LlmError::EmptyResponse { reason });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = match candidate.finish_reason {
            Some(r) => format!("finish reason: {r}"),
            None => "empty candidate".to_owned(),
        };
        return Err(LlmError::EmptyResponse { reason });
    }

    Ok(text)
}

/// Pull `error.message` out of a Google API error body, falling back to the
/// (truncated) raw body.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/message"))
        .and_then(|m| m.as_str())
        .unwrap_or(body);
    message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
}
