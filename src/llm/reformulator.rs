use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::providers::base::{LlmProvider, LlmProviderError};
use crate::core::error::{Result, TokobotError};
use crate::dialogue::intent::{DetectedAttributes, ReformulatedQuery};
use crate::dialogue::reformulate::{ReformulateContext, Reformulator};
use crate::utils::safe_truncate_ellipsis;


#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireReformulation {
    query: String,
    #[serde(rename = "isContinuation", default)]
    is_continuation: bool,
    #[serde(rename = "isNewSearch", default)]
    is_new_search: bool,
    #[serde(rename = "detectedAttributes", alias = "detected", default)]
    detected: DetectedAttributes,
}


/// Tier-2 reformulation over an [`LlmProvider`], consulted only for the
/// messages the rule path could not settle.
pub struct LlmReformulator<P: LlmProvider> {
    provider: P,
}

impl<P: LlmProvider> LlmReformulator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    fn build_system_prompt() -> String {
        String::from(
            r#"You reformulate search queries for a bilingual (Indonesian/English) furniture shopping assistant.

Given the user message and the current search context, decide whether the message continues the current search or starts a new one, and produce the clean query to run.

Output JSON with this structure:
{
  "query": "the search query to run",
  "isContinuation": true,
  "isNewSearch": false,
  "detectedAttributes": {
    "category": "furniture category if mentioned",
    "color": "color if mentioned",
    "material": "material if mentioned",
    "price": "price descriptor if mentioned"
  }
}

Rules:
- A continuation keeps the base query and merges the newly mentioned attributes into it.
- A new search replaces the base query entirely.
- A newly mentioned attribute replaces an earlier one of the same kind; attributes of other kinds are kept.
- Omit attribute keys that are not mentioned.
- Exactly one of isContinuation and isNewSearch may be true; both false means pass the message through unchanged."#,
        )
    }

    fn build_user_prompt(message: &str, context: &ReformulateContext) -> String {
        let mut prompt = format!(
            "Message: {message}\nBase query: {}\nLanguage: {}\n",
            context.base_query, context.language
        );
        if let Some(last) = &context.last_search_query {
            prompt.push_str(&format!("Last search query: {last}\n"));
        }
        if !context.active_filters.is_empty() {
            if let Ok(filters) = serde_json::to_string(&context.active_filters) {
                prompt.push_str(&format!("Active filters: {filters}\n"));
            }
        }
        prompt
    }
}

#[async_trait]
impl<P: LlmProvider> Reformulator for LlmReformulator<P> {
    async fn reformulate(
        &self,
        message: &str,
        context: &ReformulateContext,
    ) -> Result<ReformulatedQuery> {
        let system_prompt = Self::build_system_prompt();
        let user_prompt = Self::build_user_prompt(message, context);

        let (response, _metadata) = self
            .provider
            .generate(&system_prompt, &user_prompt, Some("json_object"))
            .await
            .map_err(|e| match e {
                LlmProviderError::RateLimited(m) => TokobotError::ServiceUnavailable(m),
                LlmProviderError::Auth(m) => TokobotError::Misconfigured(m),
                other => TokobotError::Reformulation(other.to_string()),
            })?;

        let wire: WireReformulation = serde_json::from_str(response.trim())
            .map_err(|e| TokobotError::Reformulation(format!("unparseable reformulation: {e}")))?;

        debug!(
            "Remote reformulation: '{}' -> '{}' (continuation={}, new={})",
            safe_truncate_ellipsis(message, 50),
            wire.query,
            wire.is_continuation,
            wire.is_new_search
        );

        Ok(ReformulatedQuery {
            query: wire.query,
            is_continuation: wire.is_continuation,
            is_new_search: wire.is_new_search,
            detected: wire.detected,
        })
    }
}
