pub mod templates;

pub use templates::TemplateResponseGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::state::{Filters, Language};
use crate::dialogue::intent::IntentLabel;
use crate::search::Product;


/// Everything the narrative layer may want to mention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseContext {
    pub language: Language,
    pub has_products: bool,
    pub product_count: usize,
    pub products: Vec<Product>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_filters: Option<Filters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faq_topic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Narrative {
    pub intro: String,
    pub follow_up: String,
}


/// Narrative-text generator. The engine composes the facts; this turns
/// them into user-facing sentences. A failure here is never fatal — the
/// orchestrator falls back to the built-in templates.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, context: &ResponseContext) -> Result<Narrative>;
}
