use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::core::error::Result;
use crate::core::state::Filters;


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IntentLabel {
    Greeting,
    Help,
    Search,
    ProductInfo,
    FaqInfo,
    FilterClear,
    Reset,
    Unknown,
}


/// What one utterance resolved to. Ephemeral; only `last_intent` and
/// `last_faq_topic` survive the turn, via the state store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub label: IntentLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(default)]
    pub filters: Filters,
    /// Raw detected language tag ("id", "en", or anything a classifier
    /// reports); the gate rejects unsupported tags.
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faq_topic: Option<String>,
}

impl Intent {
    pub fn new(label: IntentLabel, language: impl Into<String>) -> Self {
        Self {
            label,
            search_query: None,
            filters: Filters::default(),
            language: language.into(),
            faq_topic: None,
        }
    }
}


/// Context handed to the classifier so it can resolve elliptical turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifyContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_category: Option<String>,
    #[serde(default)]
    pub active_filters: Filters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_intent: Option<IntentLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_faq_topic: Option<String>,
}


/// Intent classifier capability. May fail or time out; the orchestrator
/// always has the deterministic fallback ready.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn extract(&self, message: &str, context: &ClassifyContext) -> Result<Intent>;
}


/// Attributes detected in a single turn, in the fixed append order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

impl DetectedAttributes {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.color.is_none()
            && self.material.is_none()
            && self.price.is_none()
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReformulatedQuery {
    pub query: String,
    pub is_continuation: bool,
    pub is_new_search: bool,
    #[serde(default)]
    pub detected: DetectedAttributes,
}

impl ReformulatedQuery {
    /// Raw passthrough: neither continuation nor new search.
    pub fn passthrough(message: &str) -> Self {
        Self {
            query: message.trim().to_string(),
            is_continuation: false,
            is_new_search: false,
            detected: DetectedAttributes::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_label_wire_names() {
        assert_eq!(IntentLabel::ProductInfo.to_string(), "product_info");
        assert_eq!(IntentLabel::FaqInfo.to_string(), "faq_info");
        assert_eq!(
            "filter_clear".parse::<IntentLabel>().unwrap(),
            IntentLabel::FilterClear
        );
        let json = serde_json::to_value(IntentLabel::Greeting).unwrap();
        assert_eq!(json, "greeting");
    }

    #[test]
    fn test_passthrough_flags() {
        let reformulated = ReformulatedQuery::passthrough("  sofa murah ");
        assert_eq!(reformulated.query, "sofa murah");
        assert!(!reformulated.is_continuation);
        assert!(!reformulated.is_new_search);
        assert!(reformulated.detected.is_empty());
    }
}
