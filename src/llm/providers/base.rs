use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::error::TokobotError;


#[derive(Error, Debug)]
pub enum LlmProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP 429 from the provider. Callers map this to a user-facing
    /// "service unavailable", never retry it blindly.
    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    /// HTTP 401/403: the API key is missing, wrong, or revoked.
    #[error("Provider authentication failed: {0}")]
    Auth(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<LlmProviderError> for TokobotError {
    fn from(e: LlmProviderError) -> Self {
        match e {
            LlmProviderError::RateLimited(msg) => TokobotError::ServiceUnavailable(msg),
            LlmProviderError::Auth(msg) => TokobotError::Misconfigured(msg),
            other => TokobotError::Classification(other.to_string()),
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmMetadata {
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_prompt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_completion: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_total: Option<u32>,
    #[serde(default)]
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_error: Option<String>,
}


/// One chat-completion call against some hosted or local model.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_format: Option<&str>,
    ) -> Result<(String, LlmMetadata), LlmProviderError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}

#[async_trait]
impl LlmProvider for Arc<dyn LlmProvider> {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_format: Option<&str>,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        (**self).generate(system_prompt, user_prompt, response_format).await
    }

    fn provider_name(&self) -> &str {
        (**self).provider_name()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_maps_to_service_unavailable() {
        let err: TokobotError = LlmProviderError::RateLimited("429".to_string()).into();
        assert!(matches!(err, TokobotError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_auth_maps_to_misconfigured() {
        let err: TokobotError = LlmProviderError::Auth("bad key".to_string()).into();
        assert!(matches!(err, TokobotError::Misconfigured(_)));
    }

    #[test]
    fn test_other_errors_map_to_classification() {
        let err: TokobotError = LlmProviderError::Provider("no choices".to_string()).into();
        assert!(matches!(err, TokobotError::Classification(_)));
    }
}
