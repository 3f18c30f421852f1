use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::Result;
use crate::core::lexicon::{self, AttributeKind};
use crate::core::state::{Filters, Language};
use crate::dialogue::intent::{DetectedAttributes, ReformulatedQuery};


/// Context handed to the tier-2 reformulation service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReformulateContext {
    pub base_query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_search_query: Option<String>,
    #[serde(default)]
    pub active_filters: Filters,
    pub language: Language,
}

/// External reformulation capability, consulted only when the rule path
/// is inconclusive.
#[async_trait]
pub trait Reformulator: Send + Sync {
    async fn reformulate(
        &self,
        message: &str,
        context: &ReformulateContext,
    ) -> Result<ReformulatedQuery>;
}


/// Two-tier query reformulator. Tier 1 is a deterministic rule path and
/// is authoritative whenever it produces a definite answer; tier 2 is the
/// external service. Nothing past this layer ever sees a reformulation
/// failure — the worst case is the raw message passed through.
pub struct QueryReformulator {
    remote: Option<Arc<dyn Reformulator>>,
    remote_timeout: Duration,
    canonical_language: Language,
}

impl QueryReformulator {
    pub fn new(
        remote: Option<Arc<dyn Reformulator>>,
        remote_timeout: Duration,
        canonical_language: Language,
    ) -> Self {
        Self {
            remote,
            remote_timeout,
            canonical_language,
        }
    }

    pub fn deterministic_only(canonical_language: Language) -> Self {
        Self::new(None, Duration::from_secs(5), canonical_language)
    }

    /// Tier 1. `None` means the rules were inconclusive and tier 2 should
    /// be consulted. Attribute merging builds on the episode's last
    /// reformulated query when one exists, so attributes established in
    /// earlier turns survive unless this turn replaces their kind.
    pub fn reformulate_deterministic(
        &self,
        message: &str,
        base_query: &str,
        last_search_query: Option<&str>,
    ) -> Option<ReformulatedQuery> {
        let message = message.trim();
        let base_lower = base_query.trim().to_lowercase();

        // Explicit trigger naming a different category: the episode is over.
        if lexicon::has_new_search_trigger(message) {
            if let Some(category) = lexicon::find_category(message) {
                if !lexicon::has_term(&base_lower, category) {
                    return Some(ReformulatedQuery {
                        query: message.to_string(),
                        is_continuation: false,
                        is_new_search: true,
                        detected: DetectedAttributes {
                            category: Some(category.to_string()),
                            ..DetectedAttributes::default()
                        },
                    });
                }
            }
        }

        let detected = self.detect_attributes(message);
        let meaningful = lexicon::meaningful_word_count(message);

        if !detected.is_empty() && meaningful <= 2 && !base_lower.is_empty() {
            let source = last_search_query
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_lowercase)
                .unwrap_or_else(|| base_lower.clone());
            return Some(self.merge_into_base(&source, detected));
        }

        if base_lower.is_empty() {
            // First-ever query for the thread.
            return Some(ReformulatedQuery::passthrough(message));
        }

        None
    }

    /// Full resolution: tier 1, then tier 2, then raw passthrough.
    pub async fn reformulate(
        &self,
        message: &str,
        context: &ReformulateContext,
    ) -> ReformulatedQuery {
        if let Some(result) = self.reformulate_deterministic(
            message,
            &context.base_query,
            context.last_search_query.as_deref(),
        ) {
            debug!("Deterministic reformulation: '{}' -> '{}'", message, result.query);
            return result;
        }

        if let Some(remote) = &self.remote {
            match tokio::time::timeout(self.remote_timeout, remote.reformulate(message, context))
                .await
            {
                Ok(Ok(result)) => return result,
                Ok(Err(e)) => {
                    warn!("Remote reformulation failed, passing message through: {e}");
                }
                Err(_) => {
                    warn!(
                        "Remote reformulation timed out after {:?}, passing message through",
                        self.remote_timeout
                    );
                }
            }
        }

        ReformulatedQuery::passthrough(message)
    }

    fn detect_attributes(&self, message: &str) -> DetectedAttributes {
        DetectedAttributes {
            category: lexicon::find_category(message).map(str::to_string),
            color: lexicon::find_color(message)
                .map(|entry| entry.canonical(self.canonical_language).to_string()),
            material: lexicon::find_material(message)
                .map(|entry| entry.canonical(self.canonical_language).to_string()),
            price: lexicon::find_price_term(message).map(str::to_string),
        }
    }

    /// Rebuild the query: strip from the source only the attribute kinds
    /// re-mentioned this turn, strip lead-in filler, then append this
    /// turn's attributes in fixed order. Attributes set in earlier turns
    /// and not re-mentioned stay put.
    fn merge_into_base(&self, source_lower: &str, detected: DetectedAttributes) -> ReformulatedQuery {
        let mut kinds = Vec::new();
        if detected.category.is_some() {
            kinds.push(AttributeKind::Category);
        }
        if detected.color.is_some() {
            kinds.push(AttributeKind::Color);
        }
        if detected.material.is_some() {
            kinds.push(AttributeKind::Material);
        }
        if detected.price.is_some() {
            kinds.push(AttributeKind::Price);
        }

        let stripped = lexicon::strip_attribute_terms(source_lower, &kinds);
        let cleaned = lexicon::strip_lead_in(&stripped);

        let mut parts: Vec<&str> = Vec::new();
        if !cleaned.is_empty() {
            parts.push(&cleaned);
        }
        if let Some(category) = &detected.category {
            parts.push(category);
        }
        if let Some(color) = &detected.color {
            parts.push(color);
        }
        if let Some(material) = &detected.material {
            parts.push(material);
        }
        if let Some(price) = &detected.price {
            parts.push(price);
        }

        ReformulatedQuery {
            query: parts.join(" "),
            is_continuation: true,
            is_new_search: false,
            detected,
        }
    }
}
