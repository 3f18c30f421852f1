use tracing::debug;

use crate::core::lexicon;
use crate::core::state::Language;
use crate::dialogue::intent::{Intent, IntentLabel};
use crate::utils::safe_truncate_ellipsis;


/// Rule-based intent extraction, used whenever the classifier capability
/// is absent, fails, or times out. Checks run in a fixed order; the
/// default is a search.
pub struct FallbackClassifier {
    canonical_language: Language,
}

impl FallbackClassifier {
    pub fn new(canonical_language: Language) -> Self {
        Self { canonical_language }
    }

    pub fn extract(&self, message: &str, last_query: Option<&str>) -> Intent {
        let language = lexicon::detect_language(message);
        let label = self.classify(message);
        debug!(
            "Fallback classification: '{}' -> {} ({})",
            safe_truncate_ellipsis(message, 50),
            label,
            language
        );

        let mut intent = Intent::new(label, language.as_str());

        if label == IntentLabel::FaqInfo {
            intent.faq_topic = lexicon::find_faq_topic(message).map(str::to_string);
        }

        if label != IntentLabel::Search {
            return intent;
        }

        let mut query = lexicon::strip_lead_in(message);

        if let Some(color) = lexicon::find_color(message) {
            intent.filters.color = Some(color.canonical(self.canonical_language).to_string());
        }
        if let Some(material) = lexicon::find_material(message) {
            intent.filters.material = Some(material.canonical(self.canonical_language).to_string());
        }
        if let Some(category) = lexicon::find_category(message) {
            intent.filters.category = Some(category.to_string());
        }

        // A bare attribute mention continues the previous query.
        let attribute_only = intent.filters.category.is_none()
            && (intent.filters.color.is_some() || intent.filters.material.is_some())
            && lexicon::meaningful_word_count(&query) <= 2;
        if attribute_only {
            if let Some(last) = last_query.filter(|q| !q.trim().is_empty()) {
                query = format!("{} {}", last.trim(), query);
            }
        }

        intent.search_query = Some(query);
        intent
    }

    fn classify(&self, message: &str) -> IntentLabel {
        if lexicon::is_greeting(message) {
            IntentLabel::Greeting
        } else if lexicon::is_help_request(message) {
            IntentLabel::Help
        } else if lexicon::find_faq_topic(message).is_some() {
            IntentLabel::FaqInfo
        } else if lexicon::is_filter_clear(message) {
            IntentLabel::FilterClear
        } else if lexicon::is_reset(message) {
            IntentLabel::Reset
        } else if lexicon::is_affirmative(message) {
            IntentLabel::Unknown
        } else {
            IntentLabel::Search
        }
    }
}
