//! In-memory session store: session_id → conversation history.
//!
//! Sessions are not durable. The store map is read-mostly; each session is
//! wrapped in its own mutex so concurrent messages for the same session are
//! serialized while different sessions proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::catalog::ToolInvocation;
use crate::observability::AgentEvent;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One conversation turn. Assistant turns may carry the tool call that
/// produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolInvocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_result_summary: Option<String>,
}

impl Turn {
    /// A user turn with the given text.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            created_at: Utc::now(),
            tool_call: None,
            tool_result_summary: None,
        }
    }

    /// An assistant turn with the given text.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            created_at: Utc::now(),
            tool_call: None,
            tool_result_summary: None,
        }
    }
}

/// One conversation: history plus metadata.
#[derive(Debug)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    /// Alternating user/assistant turns, newest last.
    pub history: Vec<Turn>,
}

struct SessionSlot {
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

/// Store of live sessions with TTL + soft-cap eviction.
pub struct SessionStore {
    inner: RwLock<HashMap<String, SessionSlot>>,
    ttl: Duration,
    soft_cap: usize,
}

impl SessionStore {
    /// Create a store with the given inactivity TTL and soft cap.
    #[must_use]
    pub fn new(ttl_secs: u64, soft_cap: usize) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_secs.max(1)),
            soft_cap: soft_cap.max(1),
        }
    }

    /// Fetch a session, creating it on first use. Unknown ids are never an
    /// error. Touches the session for eviction bookkeeping.
    pub async fn get_or_create(&self, session_id: &str, user_id: &str) -> Arc<Mutex<Session>> {
        let mut guard = self.inner.write().await;
        if let Some(slot) = guard.get_mut(session_id) {
            slot.last_seen = Instant::now();
            return Arc::clone(&slot.session);
        }
        self.evict_locked(&mut guard);
        let session = Arc::new(Mutex::new(Session {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
            history: Vec::new(),
        }));
        guard.insert(
            session_id.to_string(),
            SessionSlot {
                session: Arc::clone(&session),
                last_seen: Instant::now(),
            },
        );
        tracing::debug!(
            event = AgentEvent::SessionCreated.as_str(),
            session_id,
            user_id,
            live_sessions = guard.len(),
            "session created"
        );
        session
    }

    /// Drop one session.
    pub async fn clear(&self, session_id: &str) {
        let removed = self.inner.write().await.remove(session_id).is_some();
        if removed {
            tracing::debug!(
                event = AgentEvent::SessionCleared.as_str(),
                session_id,
                "session cleared"
            );
        }
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Snapshot of one session's history, if the session exists.
    pub async fn history(&self, session_id: &str) -> Option<Vec<Turn>> {
        let slot = {
            let guard = self.inner.read().await;
            guard.get(session_id).map(|slot| Arc::clone(&slot.session))
        };
        match slot {
            Some(session) => Some(session.lock().await.history.clone()),
            None => None,
        }
    }

    /// Drop sessions idle past the TTL, then evict oldest past the soft cap.
    fn evict_locked(&self, guard: &mut HashMap<String, SessionSlot>) {
        let now = Instant::now();
        let before = guard.len();
        guard.retain(|_, slot| now.duration_since(slot.last_seen) < self.ttl);
        while guard.len() >= self.soft_cap {
            let oldest = guard
                .iter()
                .min_by_key(|(_, slot)| slot.last_seen)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    guard.remove(&id);
                }
                None => break,
            }
        }
        let evicted = before.saturating_sub(guard.len());
        if evicted > 0 {
            tracing::debug!(
                event = AgentEvent::SessionEvicted.as_str(),
                evicted,
                live_sessions = guard.len(),
                "idle or excess sessions evicted"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_session_is_created_not_an_error() {
        let store = SessionStore::new(60, 10);
        let session = store.get_or_create("s1", "u1").await;
        assert_eq!(session.lock().await.history.len(), 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn same_id_returns_the_same_session() {
        let store = SessionStore::new(60, 10);
        let first = store.get_or_create("s1", "u1").await;
        first.lock().await.history.push(Turn::user("안녕"));
        let second = store.get_or_create("s1", "u1").await;
        assert_eq!(second.lock().await.history.len(), 1);
    }

    #[tokio::test]
    async fn soft_cap_evicts_oldest_session() {
        let store = SessionStore::new(3_600, 2);
        store.get_or_create("s1", "u").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.get_or_create("s2", "u").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.get_or_create("s3", "u").await;
        assert!(store.len().await <= 2);
        assert!(store.history("s3").await.is_some());
        assert!(store.history("s1").await.is_none());
    }

    #[tokio::test]
    async fn clear_removes_the_session() {
        let store = SessionStore::new(60, 10);
        store.get_or_create("s1", "u1").await;
        store.clear("s1").await;
        assert_eq!(store.len().await, 0);
    }
}
