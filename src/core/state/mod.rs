pub mod store;

pub use store::{InMemoryStateStore, StateStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dialogue::intent::IntentLabel;
use crate::search::{Product, SearchType};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Id,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Id => "id",
            Language::En => "en",
        }
    }

    /// Parse a classifier-reported language tag. Anything unknown is kept
    /// out of the type so the language gate can reject it.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "id" | "in" | "indonesian" => Some(Language::Id),
            "en" | "english" => Some(Language::En),
            _ => None,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Id
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}


/// Accumulated structured search constraints for a thread. A missing key
/// means "no constraint"; zero is a legitimate explicit price bound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(rename = "priceMin", default, skip_serializing_if = "Option::is_none")]
    pub price_min: Option<u64>,
    #[serde(rename = "priceMax", default, skip_serializing_if = "Option::is_none")]
    pub price_max: Option<u64>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.color.is_none()
            && self.material.is_none()
            && self.brand.is_none()
            && self.price_min.is_none()
            && self.price_max.is_none()
    }

    /// The set of single-field updates this partial filter map carries.
    pub fn to_updates(&self) -> Vec<FilterUpdate> {
        let mut updates = Vec::new();
        if let Some(v) = &self.category {
            updates.push(FilterUpdate::Category(v.clone()));
        }
        if let Some(v) = &self.color {
            updates.push(FilterUpdate::Color(v.clone()));
        }
        if let Some(v) = &self.material {
            updates.push(FilterUpdate::Material(v.clone()));
        }
        if let Some(v) = &self.brand {
            updates.push(FilterUpdate::Brand(v.clone()));
        }
        if let Some(v) = self.price_min {
            updates.push(FilterUpdate::PriceMin(v));
        }
        if let Some(v) = self.price_max {
            updates.push(FilterUpdate::PriceMax(v));
        }
        updates
    }
}


/// A single filter-field overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterUpdate {
    Category(String),
    Color(String),
    Material(String),
    Brand(String),
    PriceMin(u64),
    PriceMax(u64),
}


#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchState {
    pub query: String,
    pub base_query: String,
    pub results: Vec<Product>,
    pub result_count: usize,
    pub search_type: SearchType,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}


/// Per-thread conversation record. Created lazily on first message,
/// mutated only through [`StateCommand`]s, deleted only by reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(rename = "threadId")]
    pub thread_id: String,
    pub language: Language,
    pub filters: Filters,
    pub search: SearchState,
    #[serde(rename = "lastIntent", default, skip_serializing_if = "Option::is_none")]
    pub last_intent: Option<IntentLabel>,
    #[serde(rename = "lastFaqTopic", default, skip_serializing_if = "Option::is_none")]
    pub last_faq_topic: Option<String>,
    pub messages: Vec<ChatMessage>,
}

impl ConversationState {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            language: Language::default(),
            filters: Filters::default(),
            search: SearchState::default(),
            last_intent: None,
            last_faq_topic: None,
            messages: Vec::new(),
        }
    }
}


/// Tagged update commands. Every mutation of a [`ConversationState`] goes
/// through [`apply`], which keeps the resultCount invariant in one place.
#[derive(Debug, Clone)]
pub enum StateCommand {
    SetLanguage(Language),
    SetFilter(FilterUpdate),
    ClearFilters,
    SetSearch {
        query: String,
        base_query: Option<String>,
        results: Vec<Product>,
        search_type: SearchType,
    },
    SetBaseQuery(String),
    SetLastIntent {
        intent: IntentLabel,
        faq_topic: Option<String>,
    },
    AddMessage {
        role: MessageRole,
        content: String,
    },
}


/// Pure reducer: one command in, the next state out.
pub fn apply(mut state: ConversationState, command: StateCommand) -> ConversationState {
    match command {
        StateCommand::SetLanguage(language) => {
            state.language = language;
        }
        StateCommand::SetFilter(update) => match update {
            FilterUpdate::Category(v) => state.filters.category = Some(v),
            FilterUpdate::Color(v) => state.filters.color = Some(v),
            FilterUpdate::Material(v) => state.filters.material = Some(v),
            FilterUpdate::Brand(v) => state.filters.brand = Some(v),
            FilterUpdate::PriceMin(v) => state.filters.price_min = Some(v),
            FilterUpdate::PriceMax(v) => state.filters.price_max = Some(v),
        },
        StateCommand::ClearFilters => {
            state.filters = Filters::default();
        }
        StateCommand::SetSearch {
            query,
            base_query,
            results,
            search_type,
        } => {
            state.search.query = query;
            if let Some(base) = base_query {
                state.search.base_query = base;
            }
            state.search.result_count = results.len();
            state.search.results = results;
            state.search.search_type = search_type;
        }
        StateCommand::SetBaseQuery(base) => {
            state.search.base_query = base;
        }
        StateCommand::SetLastIntent { intent, faq_topic } => {
            state.last_intent = Some(intent);
            state.last_faq_topic = faq_topic;
        }
        StateCommand::AddMessage { role, content } => {
            state.messages.push(ChatMessage {
                role,
                content,
                timestamp: Utc::now(),
            });
        }
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, name: &str) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            ..Product::default()
        }
    }

    #[test]
    fn test_set_search_keeps_result_count_invariant() {
        let state = ConversationState::new("t1");
        let state = apply(
            state,
            StateCommand::SetSearch {
                query: "sofa putih".to_string(),
                base_query: Some("sofa".to_string()),
                results: vec![product("p1", "Sofa Andora"), product("p2", "Sofa Bella")],
                search_type: SearchType::Vector,
            },
        );
        assert_eq!(state.search.result_count, state.search.results.len());
        assert_eq!(state.search.result_count, 2);
        assert_eq!(state.search.base_query, "sofa");
    }

    #[test]
    fn test_set_search_without_base_query_keeps_previous() {
        let mut state = ConversationState::new("t1");
        state.search.base_query = "sofa".to_string();
        let state = apply(
            state,
            StateCommand::SetSearch {
                query: "sofa putih".to_string(),
                base_query: None,
                results: vec![],
                search_type: SearchType::Text,
            },
        );
        assert_eq!(state.search.base_query, "sofa");
        assert_eq!(state.search.result_count, 0);
    }

    #[test]
    fn test_set_base_query_leaves_rest_of_search_untouched() {
        let mut state = ConversationState::new("t1");
        state.search.query = "sofa putih".to_string();
        state.search.results = vec![product("p1", "Sofa Andora")];
        state.search.result_count = 1;
        let state = apply(state, StateCommand::SetBaseQuery("meja".to_string()));
        assert_eq!(state.search.base_query, "meja");
        assert_eq!(state.search.query, "sofa putih");
        assert_eq!(state.search.result_count, 1);
    }

    #[test]
    fn test_filters_accumulate_and_clear() {
        let state = ConversationState::new("t1");
        let state = apply(
            state,
            StateCommand::SetFilter(FilterUpdate::Color("putih".to_string())),
        );
        let state = apply(
            state,
            StateCommand::SetFilter(FilterUpdate::Material("kayu".to_string())),
        );
        assert_eq!(state.filters.color.as_deref(), Some("putih"));
        assert_eq!(state.filters.material.as_deref(), Some("kayu"));

        let state = apply(state, StateCommand::ClearFilters);
        assert!(state.filters.is_empty());
    }

    #[test]
    fn test_zero_price_is_an_explicit_value() {
        let state = ConversationState::new("t1");
        let state = apply(state, StateCommand::SetFilter(FilterUpdate::PriceMin(0)));
        assert_eq!(state.filters.price_min, Some(0));
        assert!(!state.filters.is_empty());
    }

    #[test]
    fn test_add_message_appends_in_order() {
        let state = ConversationState::new("t1");
        let state = apply(
            state,
            StateCommand::AddMessage {
                role: MessageRole::User,
                content: "halo".to_string(),
            },
        );
        let state = apply(
            state,
            StateCommand::AddMessage {
                role: MessageRole::Assistant,
                content: "Halo! Ada yang bisa dibantu?".to_string(),
            },
        );
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].role, MessageRole::User);
        assert_eq!(state.messages[1].role, MessageRole::Assistant);
    }

    #[test]
    fn test_filters_wire_names() {
        let mut filters = Filters::default();
        filters.price_min = Some(100_000);
        filters.category = Some("sofa".to_string());
        let json = serde_json::to_value(&filters).unwrap();
        assert_eq!(json["priceMin"], 100_000);
        assert_eq!(json["category"], "sofa");
        assert!(json.get("color").is_none());
    }

    #[test]
    fn test_search_state_wire_names() {
        let state = SearchState {
            query: "sofa putih".to_string(),
            base_query: "sofa".to_string(),
            results: vec![],
            result_count: 0,
            search_type: SearchType::None,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["baseQuery"], "sofa");
        assert_eq!(json["resultCount"], 0);
        assert_eq!(json["searchType"], "none");
    }
}
