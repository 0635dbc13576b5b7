//! Conversation history storage and per-conversation turn serialization.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use apex_core::domain::message::Message;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conversation store unavailable: {0}")]
    Unavailable(String),
}

/// Ordered, append-only message histories keyed by conversation key.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Appends all `messages` to `key` as one unit.
    async fn append(&self, key: &str, messages: Vec<Message>) -> Result<(), StoreError>;
    async fn read(&self, key: &str) -> Result<Vec<Message>, StoreError>;
    /// Removes `key`. Returns whether anything was stored under it.
    async fn clear(&self, key: &str) -> Result<bool, StoreError>;
    /// Number of stored conversations.
    async fn len(&self) -> Result<usize, StoreError>;

    /// The last `limit` messages of `key`, oldest first.
    async fn recent(&self, key: &str, limit: usize) -> Result<Vec<Message>, StoreError> {
        let mut history = self.read(key).await?;
        let skip = history.len().saturating_sub(limit);
        Ok(history.split_off(skip))
    }
}

struct Conversation {
    messages: Vec<Message>,
    touched: u64,
}

#[derive(Default)]
struct LruState {
    conversations: HashMap<String, Conversation>,
    recency: BTreeMap<u64, String>,
    tick: u64,
}

impl LruState {
    fn touch(&mut self, key: &str) {
        self.tick += 1;
        let tick = self.tick;
        if let Some(conversation) = self.conversations.get_mut(key) {
            self.recency.remove(&conversation.touched);
            conversation.touched = tick;
            self.recency.insert(tick, key.to_string());
        }
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.recency.pop_first()?;
        self.conversations.remove(&key);
        Some(key)
    }
}

/// Process-memory store bounded to `capacity` conversations.
///
/// Reads and appends refresh a conversation's recency; creating a conversation
/// beyond capacity evicts the least recently used one.
pub struct InMemoryConversationStore {
    capacity: usize,
    state: Mutex<LruState>,
}

impl InMemoryConversationStore {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), state: Mutex::new(LruState::default()) }
    }

    fn state(&self) -> Result<MutexGuard<'_, LruState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Unavailable("state lock poisoned".to_string()))
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, key: &str, messages: Vec<Message>) -> Result<(), StoreError> {
        let mut state = self.state()?;
        if !state.conversations.contains_key(key) {
            while state.conversations.len() >= self.capacity {
                if state.evict_oldest().is_none() {
                    break;
                }
            }
            state
                .conversations
                .insert(key.to_string(), Conversation { messages: Vec::new(), touched: 0 });
        }
        state.touch(key);
        if let Some(conversation) = state.conversations.get_mut(key) {
            conversation.messages.extend(messages);
        }
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Vec<Message>, StoreError> {
        let mut state = self.state()?;
        state.touch(key);
        Ok(state
            .conversations
            .get(key)
            .map(|conversation| conversation.messages.clone())
            .unwrap_or_default())
    }

    async fn clear(&self, key: &str) -> Result<bool, StoreError> {
        let mut state = self.state()?;
        match state.conversations.remove(key) {
            Some(conversation) => {
                state.recency.remove(&conversation.touched);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.state()?.conversations.len())
    }
}

/// One async mutex per conversation key, created on demand. A slot is removed
/// once no holder or waiter leases it, including waiters that were cancelled.
#[derive(Default)]
pub struct TurnLocks {
    slots: Mutex<HashMap<String, Slot>>,
}

struct Slot {
    lock: Arc<tokio::sync::Mutex<()>>,
    leases: usize,
}

impl TurnLocks {
    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn acquire(&self, key: &str) -> TurnGuard<'_> {
        let lock = {
            let mut slots = self.slots();
            let slot = slots
                .entry(key.to_string())
                .or_insert_with(|| Slot { lock: Arc::default(), leases: 0 });
            slot.leases += 1;
            Arc::clone(&slot.lock)
        };
        let lease = SlotLease { locks: self, key: key.to_string() };
        let guard = lock.lock_owned().await;
        TurnGuard { _guard: guard, _lease: lease }
    }

    /// Keys that currently have a holder or waiter.
    pub fn active(&self) -> usize {
        self.slots().len()
    }
}

struct SlotLease<'a> {
    locks: &'a TurnLocks,
    key: String,
}

impl Drop for SlotLease<'_> {
    fn drop(&mut self) {
        let mut slots = self.locks.slots();
        let Some(slot) = slots.get_mut(&self.key) else {
            return;
        };
        slot.leases = slot.leases.saturating_sub(1);
        if slot.leases == 0 {
            slots.remove(&self.key);
        }
    }
}

/// Fields drop in order: the mutex is released before the lease is returned.
pub struct TurnGuard<'a> {
    _guard: OwnedMutexGuard<()>,
    _lease: SlotLease<'a>,
}
