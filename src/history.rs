//! In-memory conversation storage, keyed by session id.
//!
//! Sessions are created implicitly on first use and live for the process
//! lifetime. Each session's message list sits behind its own async mutex so
//! a whole chat turn (append user message, call provider, append assistant
//! message) can run as one atomic read-modify-write; concurrent turns on the
//! same session serialize instead of interleaving.

use crate::io_struct::Message;
use dashmap::DashMap;
use rand::RngCore;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        let mut rng = rand::rng();
        let mut bytes = [0u8; 16];
        rng.fill_bytes(&mut bytes);
        let hex_string: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        Self(format!("sess_{}", hex_string))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub type SessionHandle = Arc<Mutex<Vec<Message>>>;

#[derive(Clone, Default)]
pub struct ConversationStore {
    inner: Arc<DashMap<SessionId, SessionHandle>>,
    max_history: Option<usize>,
}

impl ConversationStore {
    pub fn new(max_history: Option<usize>) -> Self {
        ConversationStore {
            inner: Arc::new(DashMap::new()),
            max_history,
        }
    }

    /// Handle to the session's message list, creating the session if unseen.
    /// Lock it to mutate the list atomically across an await point.
    pub fn session(&self, id: &SessionId) -> SessionHandle {
        self.inner.entry(id.clone()).or_default().clone()
    }

    /// Snapshot of the session history; empty for unseen sessions
    pub async fn history(&self, id: &SessionId) -> Vec<Message> {
        let handle = self.inner.get(id).map(|entry| entry.value().clone());
        match handle {
            Some(handle) => handle.lock().await.clone(),
            None => Vec::new(),
        }
    }

    pub async fn append(&self, id: &SessionId, message: Message) {
        let handle = self.session(id);
        let mut messages = handle.lock().await;
        self.append_locked(&mut messages, message);
    }

    /// Tail insert into an already locked session. A message whose id is
    /// already present replaces the stored copy in place, so a streaming
    /// assistant message can be updated progressively before finalization.
    pub fn append_locked(&self, messages: &mut Vec<Message>, message: Message) {
        if let Some(existing) = messages.iter_mut().find(|m| m.id == message.id) {
            *existing = message;
            return;
        }
        messages.push(message);
        if let Some(max) = self.max_history {
            if messages.len() > max {
                let overflow = messages.len() - max;
                messages.drain(..overflow);
            }
        }
    }

    /// (session count, total stored messages), for the periodic log line
    pub async fn stats(&self) -> (usize, usize) {
        let handles: Vec<SessionHandle> = self
            .inner
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        let sessions = handles.len();
        let mut total = 0;
        for handle in handles {
            total += handle.lock().await.len();
        }
        (sessions, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_struct::Role;

    #[tokio::test]
    async fn test_unseen_session_has_empty_history() {
        let store = ConversationStore::new(None);
        let history = store.history(&SessionId::from("nope")).await;
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = ConversationStore::new(None);
        let id = SessionId::from("s1");
        store.append(&id, Message::user("one")).await;
        store.append(&id, Message::assistant("two")).await;
        store.append(&id, Message::user("three")).await;
        let history = store.history(&id).await;
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_append_replaces_same_identity_in_place() {
        let store = ConversationStore::new(None);
        let id = SessionId::from("s1");
        store.append(&id, Message::user("question")).await;
        let mut draft = Message::assistant("partial");
        store.append(&id, draft.clone()).await;
        draft.content = "partial answer, finalized".to_string();
        store.append(&id, draft).await;

        let history = store.history(&id).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "partial answer, finalized");
    }

    #[tokio::test]
    async fn test_trim_drops_oldest_messages() {
        let store = ConversationStore::new(Some(4));
        let id = SessionId::from("s1");
        for i in 0..6 {
            store.append(&id, Message::user(format!("m{}", i))).await;
        }
        let history = store.history(&id).await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "m2");
        assert_eq!(history[3].content, "m5");
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = ConversationStore::new(None);
        store.append(&SessionId::from("a"), Message::user("hi")).await;
        assert_eq!(store.history(&SessionId::from("a")).await.len(), 1);
        assert_eq!(store.history(&SessionId::from("b")).await.len(), 0);
    }

    #[tokio::test]
    async fn test_stats_counts_sessions_and_messages() {
        let store = ConversationStore::new(None);
        store.append(&SessionId::from("a"), Message::user("1")).await;
        store.append(&SessionId::from("a"), Message::assistant("2")).await;
        store.append(&SessionId::from("b"), Message::user("3")).await;
        assert_eq!(store.stats().await, (2, 3));
    }

    #[test]
    fn test_generated_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
