//! Per-conversation state.
//!
//! The [`ConversationStore`] records, for each [`ConversationKey`], which
//! handler (if any) is armed to receive that conversation's next event.
//!
//! # Locking
//!
//! Every key has its own async mutex. The map that holds those mutexes is
//! guarded by a short-lived synchronous lock that is never held across an
//! await, so work on one conversation never blocks another. A key's entry is
//! dropped again once it is idle and nobody else is waiting on it, so idle
//! conversations cost no memory.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;

use parley_core::ConversationKey;

/// The handler armed for a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmedHandler {
    name: Arc<str>,
    armed_at: Instant,
    last_active: Instant,
    missed_turns: u32,
}

impl ArmedHandler {
    fn new(name: Arc<str>) -> Self {
        let now = Instant::now();
        Self {
            name,
            armed_at: now,
            last_active: now,
            missed_turns: 0,
        }
    }

    /// Returns the armed handler's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns when the handler was armed.
    pub fn armed_at(&self) -> Instant {
        self.armed_at
    }

    /// Returns when the conversation last saw an event.
    pub fn last_active(&self) -> Instant {
        self.last_active
    }

    /// Returns the number of consecutive armed invocations that left the
    /// conversation untouched.
    pub fn missed_turns(&self) -> u32 {
        self.missed_turns
    }
}

/// The state of one conversation.
#[derive(Debug, Default)]
pub struct ConversationSlot {
    armed: Option<ArmedHandler>,
}

impl ConversationSlot {
    /// Returns the armed handler, if any.
    pub fn armed(&self) -> Option<&ArmedHandler> {
        self.armed.as_ref()
    }

    /// Returns `true` if no handler is armed.
    pub fn is_idle(&self) -> bool {
        self.armed.is_none()
    }

    /// Arms `name`, replacing whatever was armed before.
    pub fn arm(&mut self, name: Arc<str>) {
        self.armed = Some(ArmedHandler::new(name));
    }

    /// Returns the conversation to idle, yielding what was armed.
    pub fn disarm(&mut self) -> Option<ArmedHandler> {
        self.armed.take()
    }

    /// Records an armed invocation that did not change state and returns
    /// the updated count.
    pub(crate) fn record_missed_turn(&mut self) -> u32 {
        match self.armed.as_mut() {
            Some(armed) => {
                armed.missed_turns += 1;
                armed.last_active = Instant::now();
                armed.missed_turns
            }
            None => 0,
        }
    }
}

type SharedSlot = Arc<AsyncMutex<ConversationSlot>>;

/// Holds the state of every active conversation.
#[derive(Debug, Default)]
pub struct ConversationStore {
    slots: parking_lot::Mutex<HashMap<ConversationKey, SharedSlot>>,
}

impl ConversationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the conversation `key`, waiting for any in-flight work on it.
    ///
    /// The returned guard is the only way to read or change the
    /// conversation until it is dropped.
    pub async fn lock(&self, key: &ConversationKey) -> SlotGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        SlotGuard {
            store: self,
            key: key.clone(),
            guard: slot.lock_owned().await,
        }
    }

    /// Returns the name of the handler armed for `key`, if any.
    pub async fn armed(&self, key: &ConversationKey) -> Option<String> {
        self.lock(key)
            .await
            .armed()
            .map(|armed| armed.name().to_string())
    }

    /// Forces `key` back to idle. Returns `true` if a handler was armed.
    pub async fn reset(&self, key: &ConversationKey) -> bool {
        self.lock(key).await.disarm().is_some()
    }

    /// Returns the number of keys that are armed or currently being worked on.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Returns `true` if no conversation is active.
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Called with the slot still locked by `guard`.
    fn release(&self, key: &ConversationKey, guard: &OwnedMutexGuard<ConversationSlot>) {
        let mut slots = self.slots.lock();
        // Only the map and the releasing guard hold the slot: nobody is waiting.
        if guard.is_idle() && Arc::strong_count(OwnedMutexGuard::mutex(guard)) == 2 {
            slots.remove(key);
        }
    }
}

/// Exclusive access to one conversation's state.
pub struct SlotGuard<'a> {
    store: &'a ConversationStore,
    key: ConversationKey,
    guard: OwnedMutexGuard<ConversationSlot>,
}

impl SlotGuard<'_> {
    /// Returns the key this guard locks.
    pub fn key(&self) -> &ConversationKey {
        &self.key
    }
}

impl Deref for SlotGuard<'_> {
    type Target = ConversationSlot;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for SlotGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.store.release(&self.key, &self.guard);
    }
}

impl std::fmt::Debug for SlotGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotGuard")
            .field("key", &self.key)
            .field("slot", &*self.guard)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn key(user: &str) -> ConversationKey {
        ConversationKey::new("C1", user)
    }

    #[tokio::test]
    async fn test_idle_keys_are_released() {
        let store = ConversationStore::new();
        {
            let slot = store.lock(&key("U1")).await;
            assert!(slot.is_idle());
            assert_eq!(store.len(), 1);
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_armed_keys_are_retained() {
        let store = ConversationStore::new();
        store.lock(&key("U1")).await.arm(Arc::from("helpQuestion"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.armed(&key("U1")).await.as_deref(), Some("helpQuestion"));
        assert_eq!(store.armed(&key("U2")).await, None);

        assert!(store.reset(&key("U1")).await);
        assert!(!store.reset(&key("U1")).await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_keys_do_not_block_each_other() {
        let store = ConversationStore::new();
        let _held = store.lock(&key("U1")).await;

        let other = tokio::time::timeout(Duration::from_millis(100), store.lock(&key("U2"))).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let store = Arc::new(ConversationStore::new());
        let held = store.lock(&key("U1")).await;

        let waiting = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.lock(&key("U1")).await.is_idle() })
        };

        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());

        drop(held);
        assert!(waiting.await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missed_turns_touch_activity() {
        let store = ConversationStore::new();
        let mut slot = store.lock(&key("U1")).await;
        slot.arm(Arc::from("loop"));
        let armed_at = slot.armed().unwrap().armed_at();

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(slot.record_missed_turn(), 1);
        assert_eq!(slot.record_missed_turn(), 2);

        let armed = slot.armed().unwrap();
        assert_eq!(armed.armed_at(), armed_at);
        assert!(armed.last_active() > armed_at);
    }
}
