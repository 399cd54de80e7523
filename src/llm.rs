//! LLM capability: "given a prompt and a target schema, return text
//! purporting to be JSON matching that schema, or fail".

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PlanError;

/// Temperature recommended for plan generation: low, for stable reasoning.
pub const DEFAULT_TEMPERATURE: f32 = 0.4;

/// One schema-constrained generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRequest {
    pub prompt: String,
    /// Output shape, already in the provider's schema dialect.
    pub schema: Value,
    pub temperature: f32,
}

/// Stateless structured-output model. Each call is independent.
#[async_trait]
pub trait PlanModel: Send + Sync {
    /// Send `request` and return the model's raw response text.
    async fn generate_json(&self, request: &StructuredRequest) -> Result<String, LlmError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM API key is not configured. Is GEMINI_API_KEY (or GOALPLAN_API_KEY) set?")]
    MissingApiKey,

    #[error("LLM API key contains characters that cannot be sent in an HTTP header")]
    InvalidApiKey,

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("LLM endpoint unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("LLM request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("LLM API rejected the credential (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("LLM API rejected the request configuration (HTTP {status}): {message}")]
    BadRequest { status: u16, message: String },

    #[error("LLM quota or rate limit exhausted (HTTP 429): {message}")]
    RateLimited { message: String },

    #[error("LLM service error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("LLM returned no text ({reason})")]
    EmptyResponse { reason: String },

    #[error("unreadable LLM response envelope: {0}")]
    InvalidEnvelope(String),

    #[error("LLM HTTP error: {0}")]
    Http(#[source] reqwest::Error),
}

impl LlmError {
    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => LlmError::Unauthorized { status, message },
            429 => LlmError::RateLimited { message },
            400..=499 => LlmError::BadRequest { status, message },
            _ => LlmError::Server { status, message },
        }
    }

    /// Map a transport-level reqwest failure.
    pub fn from_transport(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            LlmError::Timeout(timeout)
        } else if error.is_connect() {
            LlmError::Unreachable(error)
        } else {
            LlmError::Http(error)
        }
    }
}

/// Capability failures are classified once, here.
///
/// Credential, endpoint and deadline problems mean the service is not
/// deployable as configured. Quota, model-side and empty answers mean the
/// model did not produce a plan.
impl From<LlmError> for PlanError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::MissingApiKey
            | LlmError::InvalidApiKey
            | LlmError::ClientBuild(_)
            | LlmError::Unreachable(_)
            | LlmError::Timeout(_)
            | LlmError::Unauthorized { .. }
            | LlmError::BadRequest { .. } => PlanError::config(e.to_string()),
            LlmError::RateLimited { .. }
            | LlmError::Server { .. }
            | LlmError::EmptyResponse { .. } => PlanError::generation(e.to_string(), None),
            LlmError::InvalidEnvelope(_) | LlmError::Http(_) => {
                PlanError::unexpected(e.to_string())
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn status_codes_classify_by_cause() {
        let kind = |status| PlanError::from(LlmError::from_status(status, "m".into())).kind();

        assert_eq!(kind(401), ErrorKind::Configuration);
        assert_eq!(kind(403), ErrorKind::Configuration);
        assert_eq!(kind(400), ErrorKind::Configuration);
        assert_eq!(kind(404), ErrorKind::Configuration);
        assert_eq!(kind(429), ErrorKind::Generation);
        assert_eq!(kind(500), ErrorKind::Generation);
        assert_eq!(kind(503), ErrorKind::Generation);
    }

    #[test]
    fn missing_key_and_timeout_are_configuration_errors() {
        let err = PlanError::from(LlmError::MissingApiKey);
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("GEMINI_API_KEY"), "got: {err}");

        let err = PlanError::from(LlmError::Timeout(Duration::from_secs(30)));
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("30s"), "got: {err}");
    }

    #[test]
    fn empty_response_is_generation_error_without_raw_text() {
        let err = PlanError::from(LlmError::EmptyResponse {
            reason: "prompt blocked: SAFETY".to_owned(),
        });
        assert_eq!(err.kind(), ErrorKind::Generation);
        assert_eq!(err.raw_response(), None);
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn unreadable_envelope_is_unexpected() {
        let err = PlanError::from(LlmError::InvalidEnvelope("expected value".to_owned()));
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }
}
