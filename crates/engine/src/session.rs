//! Per-session memory
//!
//! Sessions are in-memory only: they live until the process exits or the
//! store explicitly removes them. That is the whole persistence contract.
//! Each session sits behind its own async mutex, so concurrent queries in
//! different sessions run in parallel while queries within one session are
//! serialized (one in-flight request per session).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crag_core::{Turn, TurnRole};

/// Reserved context key that routes to the typed `name` field
const NAME_KEY: &str = "name";

/// Small per-conversation memory distinct from message history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    /// Remembered display name
    pub name: Option<String>,
    /// Unknown keys are preserved as-is for forward compatibility
    #[serde(default, flatten)]
    pub extra: HashMap<String, String>,
}

impl SessionContext {
    /// Shallow merge of updates into this context
    pub fn merge(&mut self, updates: &HashMap<String, String>) {
        for (key, value) in updates {
            if key == NAME_KEY {
                self.name = Some(value.clone());
            } else {
                self.extra.insert(key.clone(), value.clone());
            }
        }
    }
}

/// One conversation: ordered turns plus context
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub turns: Vec<Turn>,
    pub context: SessionContext,
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            turns: Vec::new(),
            context: SessionContext::default(),
            created_at: Utc::now(),
        }
    }

    /// Last `n` turns rendered as `role: text` prompt lines
    pub fn recent_history(&self, n: usize) -> Vec<String> {
        let start = self.turns.len().saturating_sub(n);
        self.turns[start..]
            .iter()
            .map(|turn| turn.as_prompt_line())
            .collect()
    }

    /// Append one user/assistant exchange
    pub fn record_exchange(&mut self, user_text: &str, assistant: Turn) {
        debug_assert_eq!(assistant.role, TurnRole::Assistant);
        self.turns.push(Turn::user(user_text));
        self.turns.push(assistant);
    }
}

/// In-memory session store keyed by opaque session id
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<Mutex<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a session, creating it on first interaction
    pub fn get_or_create(&self, session_id: &str) -> Arc<Mutex<Session>> {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(session_id))))
            .clone()
    }

    /// Whether a session exists
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Drop a session and everything it remembered
    pub fn remove(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_is_stable() {
        let store = SessionStore::new();
        let first = store.get_or_create("s1");
        first.lock().await.context.name = Some("Priya".to_string());

        let second = store.get_or_create("s1");
        assert_eq!(second.lock().await.context.name.as_deref(), Some("Priya"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_merge_routes_name_and_preserves_unknown_keys() {
        let mut context = SessionContext::default();
        let mut updates = HashMap::new();
        updates.insert("name".to_string(), "Sam".to_string());
        updates.insert("team".to_string(), "legal".to_string());

        context.merge(&updates);

        assert_eq!(context.name.as_deref(), Some("Sam"));
        assert_eq!(context.extra.get("team").map(String::as_str), Some("legal"));

        // A later merge overwrites shallowly without dropping other keys
        let mut more = HashMap::new();
        more.insert("name".to_string(), "Samuel".to_string());
        context.merge(&more);
        assert_eq!(context.name.as_deref(), Some("Samuel"));
        assert_eq!(context.extra.len(), 1);
    }

    #[tokio::test]
    async fn test_recent_history_takes_last_turns() {
        let store = SessionStore::new();
        let session = store.get_or_create("s1");
        {
            let mut guard = session.lock().await;
            for i in 0..5 {
                guard.record_exchange(
                    &format!("question {}", i),
                    Turn::assistant(format!("answer {}", i), Vec::new()),
                );
            }
        }

        let history = session.lock().await.recent_history(3);
        assert_eq!(history.len(), 3);
        assert_eq!(history[2], "assistant: answer 4");
    }

    #[tokio::test]
    async fn test_remove_forgets_everything() {
        let store = SessionStore::new();
        store.get_or_create("s1");
        assert!(store.contains("s1"));

        store.remove("s1");
        assert!(!store.contains("s1"));
        assert!(store.is_empty());
    }
}
