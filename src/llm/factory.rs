use std::sync::Arc;

use super::providers::base::LlmProvider;
use super::providers::fallback::LlmProviderWithFallback;
use super::providers::ollama::OllamaProvider;
use super::providers::openai::OpenAiProvider;
use crate::core::config::TokobotConfig;
use crate::DEFAULT_OLLAMA_URL;


pub struct LlmProviderFactory;

impl LlmProviderFactory {
    #[must_use]
    pub fn create(
        provider: &str,
        model: &str,
        api_key: Option<&str>,
        base_url: Option<&str>,
        temperature: f64,
    ) -> Arc<dyn LlmProvider> {
        match provider {
            "openai" => Arc::new(OpenAiProvider::new(
                api_key.unwrap_or_default().to_string(),
                model.to_string(),
                base_url.map(String::from),
                temperature,
            )),
            "ollama" => Arc::new(OllamaProvider::new(
                base_url.unwrap_or(DEFAULT_OLLAMA_URL).to_string(),
                model.to_string(),
                temperature,
            )),
            _ => panic!("Unknown provider: {provider}. Supported: openai, ollama"),
        }
    }

    /// The full stack the orchestrator wants: hosted primary, local
    /// fallback tier per the config.
    #[must_use]
    pub fn from_config(config: &TokobotConfig) -> Arc<dyn LlmProvider> {
        let primary = Self::create(
            &config.llm_provider,
            &config.llm_model,
            config.llm_api_key.as_deref(),
            config.llm_base_url.as_deref(),
            config.llm_temperature,
        );
        Arc::new(LlmProviderWithFallback::new(
            primary,
            config.llm_fallback_enabled,
            Some(config.llm_fallback_url.clone()),
            Some(config.llm_fallback_model.clone()),
            config.llm_temperature,
        ))
    }
}
