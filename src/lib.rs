#![allow(dead_code)]
#![allow(unused_imports)]

pub mod core;
pub mod dialogue;
pub mod llm;
pub mod respond;
pub mod search;
pub mod utils;

pub use utils::{safe_truncate, safe_truncate_ellipsis};

pub use core::config::TokobotConfig;
pub use core::error::{Result, TokobotError};
pub use core::state::{ConversationState, InMemoryStateStore, Language, StateStore};
pub use dialogue::{AssistantReply, Orchestrator, QueryReformulator};
pub use llm::{LlmClassifier, LlmProviderFactory, LlmReformulator};
pub use respond::TemplateResponseGenerator;
pub use search::{InMemorySearchService, SearchService};

/// Default URL for the local Ollama fallback tier.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default hosted model for classification and tier-2 reformulation.
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Products requested per search.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Classification cache entries.
pub const DEFAULT_CACHE_SIZE: usize = 1000;

/// Classification cache TTL, seconds.
pub const DEFAULT_CACHE_TTL: u64 = 300;
