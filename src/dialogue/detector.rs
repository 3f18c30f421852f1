use tracing::debug;

use crate::core::lexicon;
use crate::dialogue::intent::Intent;


/// Decides whether an utterance starts a new search episode or refines
/// the current one. The rules run in a fixed order and the first match
/// wins; ambiguity resolves toward continuation so accumulated state is
/// never discarded on a guess.
pub struct NewSearchDetector;

enum Verdict {
    NewSearch(&'static str),
    Continuation(&'static str),
}

impl NewSearchDetector {
    pub fn is_new_search(message: &str, base_query: &str, intent: Option<&Intent>) -> bool {
        let verdict = Self::evaluate(message, base_query, intent);
        match verdict {
            Verdict::NewSearch(rule) => {
                debug!("New search ({rule}): '{message}' vs base '{base_query}'");
                true
            }
            Verdict::Continuation(rule) => {
                debug!("Continuation ({rule}): '{message}' vs base '{base_query}'");
                false
            }
        }
    }

    fn evaluate(message: &str, base_query: &str, intent: Option<&Intent>) -> Verdict {
        let base_lower = base_query.to_lowercase();

        // 1. A category word the base query does not mention.
        if let Some(category) = lexicon::find_category(message) {
            if !lexicon::has_term(&base_lower, category) {
                return Verdict::NewSearch("category not in base");
            }
        }

        // 2. Classifier-extracted category differing textually from the base.
        if let Some(category) = intent.and_then(|i| i.filters.category.as_deref()) {
            if !category.trim().is_empty() && !lexicon::has_term(&base_lower, &category.to_lowercase())
            {
                return Verdict::NewSearch("extracted category differs");
            }
        }

        // 3. Explicit trigger phrase ("cari X", "show me", ...).
        if lexicon::has_new_search_trigger(message) {
            return Verdict::NewSearch("trigger phrase");
        }

        // 4. Bare attribute mention refines the current episode.
        if lexicon::find_color(message).is_some()
            || lexicon::find_material(message).is_some()
            || lexicon::find_price_term(message).is_some()
        {
            return Verdict::Continuation("attribute mention");
        }

        // 5. Default.
        Verdict::Continuation("default")
    }
}
