use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::core::config::TokobotConfig;
use crate::core::error::Result;
use crate::core::state::{
    ConversationState, Filters, Language, MessageRole, StateCommand, StateStore,
};
use crate::dialogue::detector::NewSearchDetector;
use crate::dialogue::fallback::FallbackClassifier;
use crate::dialogue::followup::FollowUpResolver;
use crate::dialogue::intent::{Classifier, ClassifyContext, Intent, IntentLabel, ReformulatedQuery};
use crate::dialogue::reformulate::{QueryReformulator, ReformulateContext};
use crate::respond::{templates, Narrative, ResponseContext, ResponseGenerator, TemplateResponseGenerator};
use crate::search::{Product, SearchMode, SearchService, SearchType};
use crate::utils::safe_truncate_ellipsis;


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMeta {
    pub has_products: bool,
    pub search_type: SearchType,
    pub product_count: usize,
    pub intent: IntentLabel,
    pub detected_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantReply {
    pub intro: String,
    pub products: Vec<Product>,
    pub follow_up: String,
    pub meta: ReplyMeta,
}

impl AssistantReply {
    fn without_products(narrative: Narrative, intent: IntentLabel, language: &str) -> Self {
        Self {
            intro: narrative.intro,
            products: Vec::new(),
            follow_up: narrative.follow_up,
            meta: ReplyMeta {
                has_products: false,
                search_type: SearchType::None,
                product_count: 0,
                intent,
                detected_language: language.to_string(),
            },
        }
    }
}


/// Per-message state machine. Each stage either advances or returns a
/// terminal reply; every external capability call has a deterministic
/// branch it can degrade to, except product search, whose failures the
/// caller must see.
pub struct Orchestrator {
    store: Arc<dyn StateStore>,
    classifier: Option<Arc<dyn Classifier>>,
    reformulator: QueryReformulator,
    search: Arc<dyn SearchService>,
    responder: Arc<dyn ResponseGenerator>,
    fallback: FallbackClassifier,
    config: TokobotConfig,
    thread_locks: parking_lot::Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn StateStore>,
        classifier: Option<Arc<dyn Classifier>>,
        reformulator: QueryReformulator,
        search: Arc<dyn SearchService>,
        responder: Arc<dyn ResponseGenerator>,
        config: TokobotConfig,
    ) -> Self {
        let fallback = FallbackClassifier::new(config.canonical_attribute_language);
        Self {
            store,
            classifier,
            reformulator,
            search,
            responder,
            fallback,
            config,
            thread_locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Process one user message for one conversation thread. Messages for
    /// the same thread serialize; unrelated threads run concurrently.
    pub async fn process_message(&self, thread_id: &str, message: &str) -> Result<AssistantReply> {
        let lock = self.thread_lock(thread_id);
        let _guard = lock.lock().await;

        info!(
            "Processing message for thread {}: '{}'",
            thread_id,
            safe_truncate_ellipsis(message, 80)
        );

        // 1. StateLookup
        let state = self.store.get_or_create(thread_id).await?;

        // 2. IntentResolution
        let intent = self.resolve_intent(message, &state).await;
        let intent = FollowUpResolver::resolve(message, intent, &state);

        // 3. LanguageGate
        let Some(language) = Language::parse(&intent.language)
            .filter(|l| self.config.supported_languages.contains(l))
        else {
            warn!(
                "Unsupported language '{}' for thread {}",
                intent.language, thread_id
            );
            self.log_user_message(thread_id, message).await?;
            let narrative = templates::refusal();
            return Ok(AssistantReply::without_products(
                narrative,
                intent.label,
                &intent.language,
            ));
        };
        self.store
            .update(thread_id, StateCommand::SetLanguage(language))
            .await?;

        // 4. SpecialIntent
        if let Some(reply) = self
            .handle_special_intent(thread_id, message, &intent, language, &state)
            .await?
        {
            return Ok(reply);
        }

        // 5. BaseQueryDetermination
        let mut base_query = if !state.search.base_query.trim().is_empty() {
            state.search.base_query.clone()
        } else if let Some(query) = intent.search_query.as_ref().filter(|q| !q.trim().is_empty()) {
            query.clone()
        } else {
            message.trim().to_string()
        };

        // 6. NewSearchCheck
        let is_new_search = NewSearchDetector::is_new_search(message, &base_query, Some(&intent));
        if is_new_search {
            base_query = intent
                .search_query
                .clone()
                .filter(|q| !q.trim().is_empty())
                .unwrap_or_else(|| message.trim().to_string());
            debug!("Base query reset to '{}'", base_query);
        }

        // 7. Reformulation
        let reformulated = if is_new_search {
            ReformulatedQuery {
                query: base_query.clone(),
                is_continuation: false,
                is_new_search: true,
                detected: Default::default(),
            }
        } else if intent.label == IntentLabel::FilterClear {
            // re-run the current episode, constraints gone
            ReformulatedQuery {
                query: base_query.clone(),
                is_continuation: true,
                is_new_search: false,
                detected: Default::default(),
            }
        } else {
            let context = ReformulateContext {
                base_query: base_query.clone(),
                last_search_query: Some(state.search.query.clone())
                    .filter(|q| !q.is_empty()),
                active_filters: state.filters.clone(),
                language,
            };
            self.reformulator.reformulate(message, &context).await
        };

        // 8. FilterMerge
        if intent.label == IntentLabel::FilterClear {
            self.store
                .update(thread_id, StateCommand::ClearFilters)
                .await?;
        }
        let mut merged = self.store.get_or_create(thread_id).await?;
        for update in intent.filters.to_updates() {
            merged = self
                .store
                .update(thread_id, StateCommand::SetFilter(update))
                .await?;
        }
        let filters = merged.filters.clone();

        // 9. SearchDispatch — failures propagate, results are the contract.
        let mode = self
            .config
            .search_mode
            .parse::<SearchMode>()
            .unwrap_or_default();
        let response = self
            .search
            .search(&reformulated.query, &filters, self.config.search_limit, mode)
            .await?;

        // 10. StateUpdate
        self.store
            .update(
                thread_id,
                StateCommand::SetSearch {
                    query: reformulated.query.clone(),
                    base_query: Some(base_query.clone()),
                    results: response.products.clone(),
                    search_type: response.search_type,
                },
            )
            .await?;
        self.store
            .update(
                thread_id,
                StateCommand::SetLastIntent {
                    intent: IntentLabel::Search,
                    faq_topic: None,
                },
            )
            .await?;
        self.log_user_message(thread_id, message).await?;

        // 11. ResponseAssembly
        let context = ResponseContext {
            language,
            has_products: !response.products.is_empty(),
            product_count: response.count,
            products: response.products.clone(),
            search_query: Some(reformulated.query.clone()),
            active_filters: Some(filters),
            intent: Some(IntentLabel::Search),
            faq_topic: None,
        };
        let narrative = self.narrative(&context).await;
        self.log_assistant_message(thread_id, &narrative).await?;

        Ok(AssistantReply {
            intro: narrative.intro,
            products: response.products,
            follow_up: narrative.follow_up,
            meta: ReplyMeta {
                has_products: response.count > 0,
                search_type: response.search_type,
                product_count: response.count,
                intent: IntentLabel::Search,
                detected_language: intent.language,
            },
        })
    }

    async fn resolve_intent(&self, message: &str, state: &ConversationState) -> Intent {
        let last_query = Some(state.search.query.as_str()).filter(|q| !q.is_empty());
        let Some(classifier) = &self.classifier else {
            return self.fallback.extract(message, last_query);
        };

        let context = ClassifyContext {
            current_category: state.filters.category.clone(),
            active_filters: state.filters.clone(),
            last_query: last_query.map(str::to_string),
            last_intent: state.last_intent,
            last_faq_topic: state.last_faq_topic.clone(),
        };
        let timeout = Duration::from_secs(self.config.classifier_timeout_secs);
        match tokio::time::timeout(timeout, classifier.extract(message, &context)).await {
            Ok(Ok(intent)) => intent,
            Ok(Err(e)) => {
                warn!("Classifier failed, using deterministic fallback: {e}");
                self.fallback.extract(message, last_query)
            }
            Err(_) => {
                warn!("Classifier timed out after {timeout:?}, using deterministic fallback");
                self.fallback.extract(message, last_query)
            }
        }
    }

    /// Terminal handling for intents that never reach search. Returns
    /// `None` when the pipeline should continue toward a search.
    async fn handle_special_intent(
        &self,
        thread_id: &str,
        message: &str,
        intent: &Intent,
        language: Language,
        state: &ConversationState,
    ) -> Result<Option<AssistantReply>> {
        // an unknown that no follow-up rule claimed gets the help text
        let label = match intent.label {
            IntentLabel::Unknown => IntentLabel::Help,
            other => other,
        };

        match label {
            IntentLabel::Reset => {
                self.store.delete(thread_id).await?;
                let context = ResponseContext {
                    language,
                    has_products: false,
                    product_count: 0,
                    products: vec![],
                    search_query: None,
                    active_filters: None,
                    intent: Some(IntentLabel::Reset),
                    faq_topic: None,
                };
                let narrative = self.narrative(&context).await;
                Ok(Some(AssistantReply::without_products(
                    narrative,
                    IntentLabel::Reset,
                    &intent.language,
                )))
            }
            IntentLabel::Greeting | IntentLabel::Help | IntentLabel::FaqInfo => {
                let context = ResponseContext {
                    language,
                    has_products: false,
                    product_count: 0,
                    products: vec![],
                    search_query: None,
                    active_filters: Some(state.filters.clone()),
                    intent: Some(label),
                    faq_topic: intent.faq_topic.clone(),
                };
                let narrative = self.narrative(&context).await;
                self.store
                    .update(
                        thread_id,
                        StateCommand::SetLastIntent {
                            intent: label,
                            faq_topic: intent.faq_topic.clone(),
                        },
                    )
                    .await?;
                self.log_user_message(thread_id, message).await?;
                self.log_assistant_message(thread_id, &narrative).await?;
                Ok(Some(AssistantReply::without_products(
                    narrative,
                    label,
                    &intent.language,
                )))
            }
            IntentLabel::ProductInfo => {
                // re-surface the most recent result set, no new search
                let products = state.search.results.clone();
                let context = ResponseContext {
                    language,
                    has_products: !products.is_empty(),
                    product_count: products.len(),
                    products: products.clone(),
                    search_query: Some(state.search.query.clone()),
                    active_filters: Some(state.filters.clone()),
                    intent: Some(IntentLabel::ProductInfo),
                    faq_topic: None,
                };
                let narrative = self.narrative(&context).await;
                self.store
                    .update(
                        thread_id,
                        StateCommand::SetLastIntent {
                            intent: IntentLabel::ProductInfo,
                            faq_topic: None,
                        },
                    )
                    .await?;
                self.log_user_message(thread_id, message).await?;
                self.log_assistant_message(thread_id, &narrative).await?;
                Ok(Some(AssistantReply {
                    intro: narrative.intro,
                    follow_up: narrative.follow_up,
                    meta: ReplyMeta {
                        has_products: !products.is_empty(),
                        search_type: state.search.search_type,
                        product_count: products.len(),
                        intent: IntentLabel::ProductInfo,
                        detected_language: intent.language.clone(),
                    },
                    products,
                }))
            }
            _ => Ok(None),
        }
    }

    async fn narrative(&self, context: &ResponseContext) -> Narrative {
        match self.responder.generate(context).await {
            Ok(narrative) => narrative,
            Err(e) => {
                warn!("Response generator failed, using built-in templates: {e}");
                TemplateResponseGenerator::render(context)
            }
        }
    }

    async fn log_user_message(&self, thread_id: &str, content: &str) -> Result<()> {
        self.store
            .update(
                thread_id,
                StateCommand::AddMessage {
                    role: MessageRole::User,
                    content: content.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    async fn log_assistant_message(&self, thread_id: &str, narrative: &Narrative) -> Result<()> {
        self.store
            .update(
                thread_id,
                StateCommand::AddMessage {
                    role: MessageRole::Assistant,
                    content: format!("{} {}", narrative.intro, narrative.follow_up),
                },
            )
            .await?;
        Ok(())
    }

    fn thread_lock(&self, thread_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.thread_locks.lock();
        Arc::clone(
            locks
                .entry(thread_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    pub fn state_store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::core::error::TokobotError;
    use crate::core::state::InMemoryStateStore;
    use crate::search::SearchResponse;

    struct CountingSearch {
        calls: AtomicUsize,
        last_query: Mutex<Option<String>>,
        last_filters: Mutex<Option<Filters>>,
        results: usize,
    }

    impl CountingSearch {
        fn new(results: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_query: Mutex::new(None),
                last_filters: Mutex::new(None),
                results,
            }
        }

        fn products(&self) -> Vec<Product> {
            (0..self.results)
                .map(|i| Product {
                    id: format!("p{i}"),
                    name: format!("Product {i}"),
                    ..Product::default()
                })
                .collect()
        }
    }

    #[async_trait]
    impl SearchService for CountingSearch {
        async fn search(
            &self,
            query: &str,
            filters: &Filters,
            _n: usize,
            _mode: SearchMode,
        ) -> Result<SearchResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_query.lock() = Some(query.to_string());
            *self.last_filters.lock() = Some(filters.clone());
            let products = self.products();
            Ok(SearchResponse {
                count: products.len(),
                search_type: if products.is_empty() {
                    SearchType::None
                } else {
                    SearchType::Text
                },
                products,
            })
        }
    }

    struct FailingSearch;

    #[async_trait]
    impl SearchService for FailingSearch {
        async fn search(
            &self,
            _query: &str,
            _filters: &Filters,
            _n: usize,
            _mode: SearchMode,
        ) -> Result<SearchResponse> {
            Err(TokobotError::Search("backend unreachable".to_string()))
        }
    }

    struct FixedLanguageClassifier {
        language: &'static str,
    }

    #[async_trait]
    impl Classifier for FixedLanguageClassifier {
        async fn extract(&self, _message: &str, _context: &ClassifyContext) -> Result<Intent> {
            Ok(Intent::new(IntentLabel::Search, self.language))
        }
    }

    struct BrokenClassifier;

    #[async_trait]
    impl Classifier for BrokenClassifier {
        async fn extract(&self, _message: &str, _context: &ClassifyContext) -> Result<Intent> {
            Err(TokobotError::Classification("llm down".to_string()))
        }
    }

    fn orchestrator_with(
        search: Arc<dyn SearchService>,
        classifier: Option<Arc<dyn Classifier>>,
    ) -> Orchestrator {
        let config = TokobotConfig::default();
        Orchestrator::new(
            Arc::new(InMemoryStateStore::new()),
            classifier,
            QueryReformulator::deterministic_only(config.canonical_attribute_language),
            search,
            Arc::new(TemplateResponseGenerator::new()),
            config,
        )
    }

    #[tokio::test]
    async fn test_greeting_never_invokes_search() {
        let search = Arc::new(CountingSearch::new(5));
        let orchestrator = orchestrator_with(search.clone(), None);

        let reply = orchestrator.process_message("t1", "halo").await.unwrap();

        assert_eq!(reply.meta.intent, IntentLabel::Greeting);
        assert!(reply.products.is_empty());
        assert!(!reply.meta.has_products);
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_first_search_sets_base_query() {
        let search = Arc::new(CountingSearch::new(2));
        let orchestrator = orchestrator_with(search.clone(), None);

        let reply = orchestrator
            .process_message("t1", "saya mau cari sofa")
            .await
            .unwrap();

        assert_eq!(reply.meta.intent, IntentLabel::Search);
        assert_eq!(reply.meta.product_count, 2);
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);

        let state = orchestrator.store.get("t1").await.unwrap().unwrap();
        assert_eq!(state.search.base_query, "sofa");
        assert_eq!(state.search.result_count, 2);
        assert_eq!(state.last_intent, Some(IntentLabel::Search));
        assert_eq!(state.language, Language::Id);
    }

    #[tokio::test]
    async fn test_continuation_refines_query_and_accumulates_filters() {
        let search = Arc::new(CountingSearch::new(2));
        let orchestrator = orchestrator_with(search.clone(), None);

        orchestrator
            .process_message("t1", "saya mau cari sofa")
            .await
            .unwrap();
        orchestrator.process_message("t1", "putih").await.unwrap();

        assert_eq!(
            search.last_query.lock().as_deref(),
            Some("sofa putih")
        );
        let state = orchestrator.store.get("t1").await.unwrap().unwrap();
        assert_eq!(state.search.base_query, "sofa");
        assert_eq!(state.filters.color.as_deref(), Some("putih"));

        // material joins, color survives
        orchestrator.process_message("t1", "yang kayu").await.unwrap();
        assert_eq!(
            search.last_query.lock().as_deref(),
            Some("sofa putih kayu")
        );
        let state = orchestrator.store.get("t1").await.unwrap().unwrap();
        assert_eq!(state.filters.color.as_deref(), Some("putih"));
        assert_eq!(state.filters.material.as_deref(), Some("kayu"));
    }

    #[tokio::test]
    async fn test_category_change_resets_base_query() {
        let search = Arc::new(CountingSearch::new(1));
        let orchestrator = orchestrator_with(search.clone(), None);

        orchestrator
            .process_message("t1", "saya mau cari sofa")
            .await
            .unwrap();
        orchestrator
            .process_message("t1", "ada meja kayu")
            .await
            .unwrap();

        let state = orchestrator.store.get("t1").await.unwrap().unwrap();
        assert_eq!(state.search.base_query, "meja kayu");
        assert_eq!(search.last_query.lock().as_deref(), Some("meja kayu"));
    }

    #[tokio::test]
    async fn test_affirmative_after_search_reuses_results() {
        let search = Arc::new(CountingSearch::new(3));
        let orchestrator = orchestrator_with(search.clone(), None);

        orchestrator
            .process_message("t1", "saya mau cari sofa")
            .await
            .unwrap();
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);

        let reply = orchestrator.process_message("t1", "iya").await.unwrap();

        assert_eq!(reply.meta.intent, IntentLabel::ProductInfo);
        assert_eq!(reply.products.len(), 3);
        // no second search call
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_filter_clear_empties_filter_map() {
        let search = Arc::new(CountingSearch::new(2));
        let orchestrator = orchestrator_with(search.clone(), None);

        orchestrator
            .process_message("t1", "saya mau cari sofa")
            .await
            .unwrap();
        orchestrator.process_message("t1", "putih").await.unwrap();
        let state = orchestrator.store.get("t1").await.unwrap().unwrap();
        assert!(!state.filters.is_empty());

        orchestrator
            .process_message("t1", "hapus filter")
            .await
            .unwrap();
        let state = orchestrator.store.get("t1").await.unwrap().unwrap();
        assert!(state.filters.is_empty());
        // the episode itself survives
        assert_eq!(state.search.base_query, "sofa");
    }

    #[tokio::test]
    async fn test_unsupported_language_is_refused_without_search() {
        let search = Arc::new(CountingSearch::new(2));
        let classifier = Arc::new(FixedLanguageClassifier { language: "fr" });
        let orchestrator = orchestrator_with(search.clone(), Some(classifier));

        let reply = orchestrator
            .process_message("t1", "je cherche un canapé")
            .await
            .unwrap();

        assert_eq!(reply.meta.detected_language, "fr");
        assert!(reply.products.is_empty());
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
        // the user message is still logged
        let state = orchestrator.store.get("t1").await.unwrap().unwrap();
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_search_failure_propagates() {
        let orchestrator = orchestrator_with(Arc::new(FailingSearch), None);

        let result = orchestrator.process_message("t1", "saya mau cari sofa").await;
        assert!(matches!(result, Err(TokobotError::Search(_))));
    }

    #[tokio::test]
    async fn test_classifier_failure_degrades_to_fallback() {
        let search = Arc::new(CountingSearch::new(1));
        let orchestrator = orchestrator_with(search.clone(), Some(Arc::new(BrokenClassifier)));

        let reply = orchestrator.process_message("t1", "halo").await.unwrap();

        // deterministic fallback still recognizes the greeting
        assert_eq!(reply.meta.intent, IntentLabel::Greeting);
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reset_deletes_thread_state() {
        let search = Arc::new(CountingSearch::new(2));
        let orchestrator = orchestrator_with(search.clone(), None);

        orchestrator
            .process_message("t1", "saya mau cari sofa")
            .await
            .unwrap();
        assert!(orchestrator.store.get("t1").await.unwrap().is_some());

        let reply = orchestrator
            .process_message("t1", "mulai ulang")
            .await
            .unwrap();
        assert_eq!(reply.meta.intent, IntentLabel::Reset);
        assert!(orchestrator.store.get("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_faq_reply_records_topic_for_followup() {
        let search = Arc::new(CountingSearch::new(0));
        let orchestrator = orchestrator_with(search.clone(), None);

        let reply = orchestrator
            .process_message("t1", "toko ada dimana?")
            .await
            .unwrap();
        assert_eq!(reply.meta.intent, IntentLabel::FaqInfo);

        let state = orchestrator.store.get("t1").await.unwrap().unwrap();
        assert_eq!(state.last_faq_topic.as_deref(), Some("location"));

        // affirmative follow-up now resolves to opening hours
        let reply = orchestrator.process_message("t1", "iya").await.unwrap();
        assert_eq!(reply.meta.intent, IntentLabel::FaqInfo);
        assert!(reply.intro.contains("09.00") || reply.intro.contains("9 AM"));
    }

    #[tokio::test]
    async fn test_result_count_invariant_after_search() {
        let search = Arc::new(CountingSearch::new(7));
        let orchestrator = orchestrator_with(search.clone(), None);

        orchestrator
            .process_message("t1", "saya mau cari kursi")
            .await
            .unwrap();
        let state = orchestrator.store.get("t1").await.unwrap().unwrap();
        assert_eq!(state.search.result_count, state.search.results.len());
        assert_eq!(state.search.result_count, 7);
    }
}
