use serde::{Deserialize, Serialize};

use crate::core::state::Language;


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokobotConfig {
    // Primary LLM provider
    pub llm_provider: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_temperature: f64,

    // Local fallback tier
    pub llm_fallback_enabled: bool,
    pub llm_fallback_url: String,
    pub llm_fallback_model: String,

    // Bounded timeouts for capability calls
    pub classifier_timeout_secs: u64,
    pub reformulator_timeout_secs: u64,

    // Classification cache
    pub classification_cache_size: usize,
    pub classification_cache_ttl_secs: u64,

    // Search request parameters
    pub search_limit: usize,
    pub search_mode: String,

    // Languages the dialogue engine will serve
    pub supported_languages: Vec<Language>,
    /// Which language attribute synonyms canonicalize toward ("white" ->
    /// "putih" when Indonesian).
    pub canonical_attribute_language: Language,
}

impl TokobotConfig {
    pub fn new() -> Self {
        Self {
            llm_provider: "openai".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            llm_api_key: None,
            llm_base_url: None,
            llm_temperature: 0.2,

            llm_fallback_enabled: true,
            llm_fallback_url: "http://localhost:11434".to_string(),
            llm_fallback_model: "llama3.2".to_string(),

            classifier_timeout_secs: 8,
            reformulator_timeout_secs: 8,

            classification_cache_size: 1000,
            classification_cache_ttl_secs: 300,

            search_limit: 10,
            search_mode: "auto".to_string(),

            supported_languages: vec![Language::Id, Language::En],
            canonical_attribute_language: Language::Id,
        }
    }


    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Ok(provider) = std::env::var("TOKOBOT_LLM_PROVIDER") {
            config.llm_provider = provider;
        }
        if let Ok(model) = std::env::var("TOKOBOT_LLM_MODEL") {
            config.llm_model = model;
        }
        if let Ok(key) = std::env::var("TOKOBOT_LLM_API_KEY") {
            config.llm_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("TOKOBOT_LLM_BASE_URL") {
            config.llm_base_url = Some(url);
        }
        if let Ok(enabled) = std::env::var("TOKOBOT_LLM_FALLBACK_ENABLED") {
            config.llm_fallback_enabled = enabled != "0" && enabled.to_lowercase() != "false";
        }
        if let Ok(url) = std::env::var("TOKOBOT_LLM_FALLBACK_URL") {
            config.llm_fallback_url = url;
        }
        if let Ok(model) = std::env::var("TOKOBOT_LLM_FALLBACK_MODEL") {
            config.llm_fallback_model = model;
        }
        if let Ok(secs) = std::env::var("TOKOBOT_CLASSIFIER_TIMEOUT") {
            if let Ok(secs) = secs.parse() {
                config.classifier_timeout_secs = secs;
            }
        }
        if let Ok(secs) = std::env::var("TOKOBOT_REFORMULATOR_TIMEOUT") {
            if let Ok(secs) = secs.parse() {
                config.reformulator_timeout_secs = secs;
            }
        }
        if let Ok(limit) = std::env::var("TOKOBOT_SEARCH_LIMIT") {
            if let Ok(limit) = limit.parse() {
                config.search_limit = limit;
            }
        }

        config
    }
}

impl Default for TokobotConfig {
    fn default() -> Self {
        Self::new()
    }
}
