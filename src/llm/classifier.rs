use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::providers::base::LlmProvider;
use crate::core::cache::ClassificationCache;
use crate::core::error::{Result, TokobotError};
use crate::core::state::Filters;
use crate::dialogue::intent::{Classifier, ClassifyContext, Intent, IntentLabel};
use crate::utils::safe_truncate_ellipsis;


/// Wire shape the model is asked to produce. Lenient on purpose: every
/// field except `intent` and `language` may be missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireIntent {
    intent: String,
    #[serde(default)]
    search_query: Option<String>,
    #[serde(default)]
    filters: Filters,
    language: String,
    #[serde(default)]
    faq_topic: Option<String>,
}


/// Intent extraction over an [`LlmProvider`], with a TTL cache so the
/// same utterance against the same conversation context never pays for a
/// second remote call.
pub struct LlmClassifier<P: LlmProvider> {
    provider: P,
    cache: ClassificationCache<Intent>,
}

impl<P: LlmProvider> LlmClassifier<P> {
    pub fn new(provider: P, cache_size: usize, cache_ttl_secs: u64) -> Self {
        Self {
            provider,
            cache: ClassificationCache::new(cache_size, cache_ttl_secs),
        }
    }

    fn cache_key(message: &str, context: &ClassifyContext) -> String {
        let last_intent = context.last_intent.map(|i| i.to_string());
        ClassificationCache::<Intent>::make_key(
            message,
            &[
                context.current_category.as_deref(),
                context.last_query.as_deref(),
                last_intent.as_deref(),
                context.last_faq_topic.as_deref(),
            ],
        )
    }

    fn build_system_prompt() -> String {
        String::from(
            r#"You are an intent classifier for a bilingual (Indonesian/English) furniture shopping assistant.

Classify the user message and output JSON with this structure:
{
  "intent": "greeting|help|search|product_info|faq_info|filter_clear|reset|unknown",
  "search_query": "the product query with lead-in phrases removed, or null",
  "filters": {
    "category": "furniture category if mentioned",
    "color": "color if mentioned",
    "material": "material if mentioned",
    "brand": "brand if mentioned",
    "priceMin": 0,
    "priceMax": 0
  },
  "language": "id|en (or the actual language code if neither)",
  "faq_topic": "location|hours|payment|delivery, only for faq_info"
}

Omit filter keys that are not mentioned. Use the conversation context to resolve short follow-ups: a bare attribute like "putih" continues the previous search. Classify a plain "yes"-style reply with no other content as "unknown"."#,
        )
    }

    fn build_user_prompt(message: &str, context: &ClassifyContext) -> String {
        let mut prompt = format!("Message: {message}\n");
        if let Some(category) = &context.current_category {
            prompt.push_str(&format!("Current category: {category}\n"));
        }
        if let Some(last_query) = &context.last_query {
            prompt.push_str(&format!("Last search query: {last_query}\n"));
        }
        if let Some(last_intent) = context.last_intent {
            prompt.push_str(&format!("Last intent: {last_intent}\n"));
        }
        if let Some(topic) = &context.last_faq_topic {
            prompt.push_str(&format!("Last FAQ topic: {topic}\n"));
        }
        if !context.active_filters.is_empty() {
            if let Ok(filters) = serde_json::to_string(&context.active_filters) {
                prompt.push_str(&format!("Active filters: {filters}\n"));
            }
        }
        prompt
    }

    fn parse(response: &str) -> Result<Intent> {
        let cleaned = strip_code_fences(response);
        let wire: WireIntent = serde_json::from_str(cleaned)
            .map_err(|e| TokobotError::Classification(format!("unparseable intent: {e}")))?;

        let label = wire
            .intent
            .parse::<IntentLabel>()
            .unwrap_or(IntentLabel::Unknown);

        Ok(Intent {
            label,
            search_query: wire.search_query.filter(|q| !q.trim().is_empty()),
            filters: wire.filters,
            language: wire.language,
            faq_topic: wire.faq_topic.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn cache_stats(&self) -> crate::core::cache::CacheStats {
        self.cache.stats()
    }
}

/// The smaller local models like to wrap JSON in markdown fences.
fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

#[async_trait]
impl<P: LlmProvider> Classifier for LlmClassifier<P> {
    async fn extract(&self, message: &str, context: &ClassifyContext) -> Result<Intent> {
        let key = Self::cache_key(message, context);
        if let Some(cached) = self.cache.get(&key) {
            debug!(
                "Classification cache hit for '{}'",
                safe_truncate_ellipsis(message, 50)
            );
            return Ok(cached);
        }

        let system_prompt = Self::build_system_prompt();
        let user_prompt = Self::build_user_prompt(message, context);

        let (response, metadata) = self
            .provider
            .generate(&system_prompt, &user_prompt, Some("json_object"))
            .await?;

        let intent = Self::parse(&response).inspect_err(|e| {
            warn!(
                "Classifier response from {} was unusable: {}",
                metadata.provider, e
            );
        })?;

        debug!(
            "Classified '{}' -> {} ({})",
            safe_truncate_ellipsis(message, 50),
            intent.label,
            intent.language
        );
        self.cache.set(&key, intent.clone());
        Ok(intent)
    }
}
