use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::core::error::Result;
use crate::core::state::{apply, ConversationState, StateCommand};


/// Keyed conversation-state store. Implementations must apply `update`
/// calls for one thread atomically and in issuance order; different
/// threads are independent.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get_or_create(&self, thread_id: &str) -> Result<ConversationState>;

    async fn get(&self, thread_id: &str) -> Result<Option<ConversationState>>;

    async fn update(&self, thread_id: &str, command: StateCommand) -> Result<ConversationState>;

    async fn delete(&self, thread_id: &str) -> Result<()>;
}


/// In-memory store. Each thread gets its own mutex so updates for one
/// conversation serialize while unrelated conversations never contend.
pub struct InMemoryStateStore {
    threads: RwLock<HashMap<String, Arc<Mutex<ConversationState>>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
        }
    }

    fn entry(&self, thread_id: &str) -> Arc<Mutex<ConversationState>> {
        if let Some(entry) = self.threads.read().get(thread_id) {
            return Arc::clone(entry);
        }
        let mut threads = self.threads.write();
        Arc::clone(
            threads
                .entry(thread_id.to_string())
                .or_insert_with(|| {
                    debug!("Creating conversation state for thread {}", thread_id);
                    Arc::new(Mutex::new(ConversationState::new(thread_id)))
                }),
        )
    }

    pub fn thread_count(&self) -> usize {
        self.threads.read().len()
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get_or_create(&self, thread_id: &str) -> Result<ConversationState> {
        Ok(self.entry(thread_id).lock().clone())
    }

    async fn get(&self, thread_id: &str) -> Result<Option<ConversationState>> {
        Ok(self
            .threads
            .read()
            .get(thread_id)
            .map(|entry| entry.lock().clone()))
    }

    async fn update(&self, thread_id: &str, command: StateCommand) -> Result<ConversationState> {
        let entry = self.entry(thread_id);
        let mut state = entry.lock();
        *state = apply(state.clone(), command);
        Ok(state.clone())
    }

    async fn delete(&self, thread_id: &str) -> Result<()> {
        self.threads.write().remove(thread_id);
        debug!("Deleted conversation state for thread {}", thread_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::{FilterUpdate, Language, MessageRole};

    #[tokio::test]
    async fn test_get_or_create_is_lazy_and_idempotent() {
        let store = InMemoryStateStore::new();
        assert_eq!(store.thread_count(), 0);

        let state = store.get_or_create("t1").await.unwrap();
        assert_eq!(state.thread_id, "t1");
        assert!(state.filters.is_empty());
        assert_eq!(store.thread_count(), 1);

        store.get_or_create("t1").await.unwrap();
        assert_eq!(store.thread_count(), 1);
    }

    #[tokio::test]
    async fn test_get_absent_thread() {
        let store = InMemoryStateStore::new();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_returns_new_state() {
        let store = InMemoryStateStore::new();
        let state = store
            .update("t1", StateCommand::SetLanguage(Language::En))
            .await
            .unwrap();
        assert_eq!(state.language, Language::En);

        let fetched = store.get("t1").await.unwrap().unwrap();
        assert_eq!(fetched.language, Language::En);
    }

    #[tokio::test]
    async fn test_delete_removes_state() {
        let store = InMemoryStateStore::new();
        store.get_or_create("t1").await.unwrap();
        store.delete("t1").await.unwrap();
        assert!(store.get("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_threads_are_independent() {
        let store = InMemoryStateStore::new();
        store
            .update("t1", StateCommand::SetFilter(FilterUpdate::Color("putih".into())))
            .await
            .unwrap();
        let other = store.get_or_create("t2").await.unwrap();
        assert!(other.filters.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_updates_same_thread_lose_nothing() {
        let store = Arc::new(InMemoryStateStore::new());
        let mut handles = Vec::new();
        for i in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .update(
                        "t1",
                        StateCommand::AddMessage {
                            role: MessageRole::User,
                            content: format!("message {i}"),
                        },
                    )
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let state = store.get("t1").await.unwrap().unwrap();
        assert_eq!(state.messages.len(), 50);
    }
}
