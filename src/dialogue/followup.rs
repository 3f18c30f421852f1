use tracing::debug;

use crate::core::lexicon;
use crate::core::state::ConversationState;
use crate::dialogue::intent::{Intent, IntentLabel};


/// Resolves short affirmative replies ("iya", "ok") into a concrete
/// intent using what the previous turn established. Anything that is not
/// a bare affirmative, or that already classified to something known,
/// passes through untouched.
pub struct FollowUpResolver;

impl FollowUpResolver {
    pub fn resolve(message: &str, intent: Intent, state: &ConversationState) -> Intent {
        if intent.label != IntentLabel::Unknown || !lexicon::is_affirmative(message) {
            return intent;
        }

        let resolved = Self::resolve_from_context(state);
        debug!(
            "Affirmative follow-up '{}' resolved to {} (last_intent={:?}, topic={:?}, results={})",
            message, resolved.0, state.last_intent, state.last_faq_topic, state.search.result_count
        );

        let mut intent = intent;
        intent.label = resolved.0;
        intent.faq_topic = resolved.1;
        intent
    }

    /// The resolution table, evaluated in order.
    fn resolve_from_context(state: &ConversationState) -> (IntentLabel, Option<String>) {
        match (state.last_intent, state.last_faq_topic.as_deref()) {
            (Some(IntentLabel::FaqInfo), Some("location")) => {
                (IntentLabel::FaqInfo, Some("hours".to_string()))
            }
            (Some(IntentLabel::Search), _) if state.search.result_count > 0 => {
                (IntentLabel::ProductInfo, None)
            }
            (Some(IntentLabel::FaqInfo), _) => (IntentLabel::Help, None),
            _ => (IntentLabel::Help, None),
        }
    }
}
