//! In-memory per-session state.
//!
//! Each session sits behind its own mutex so concurrent queries on one
//! session id apply their updates one at a time; different sessions never
//! contend beyond the brief map lookup.

use crate::types::SessionInfo;
use chrono::{DateTime, Utc};
use learnpath_prompt::Flow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// One recorded query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionQuery {
    pub message: String,
    pub intent: Flow,
    pub at: DateTime<Utc>,
}

/// State kept for a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    /// Last generated roadmap; overwritten by each roadmap query
    pub roadmap: Option<Value>,
    pub queries: Vec<SessionQuery>,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, session_id: &str) -> Arc<Mutex<Session>> {
        if let Some(session) = self.sessions.read().await.get(session_id) {
            return session.clone();
        }

        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Record a query and, for roadmap results, replace the stored roadmap.
    pub async fn record(&self, session_id: &str, message: &str, intent: Flow, roadmap: Option<Value>) {
        let session = self.entry(session_id).await;
        let mut session = session.lock().await;

        session.queries.push(SessionQuery {
            message: message.to_string(),
            intent,
            at: Utc::now(),
        });
        if intent == Flow::Roadmap {
            session.roadmap = roadmap;
        }
    }

    /// Copy of a session's state.
    pub async fn get(&self, session_id: &str) -> Option<Session> {
        let session = self.sessions.read().await.get(session_id).cloned()?;
        let session = session.lock().await;
        Some(session.clone())
    }

    pub async fn info(&self, session_id: &str) -> SessionInfo {
        match self.get(session_id).await {
            Some(session) => SessionInfo {
                session_id: session_id.to_string(),
                exists: true,
                query_count: session.queries.len(),
                has_roadmap: session.roadmap.is_some(),
            },
            None => SessionInfo {
                session_id: session_id.to_string(),
                exists: false,
                query_count: 0,
                has_roadmap: false,
            },
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_unknown_session() {
        let store = SessionStore::new();
        let info = store.info("nope").await;
        assert!(!info.exists);
        assert_eq!(info.query_count, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_roadmap_is_last_write_wins() {
        let store = SessionStore::new();
        store.record("s", "first roadmap", Flow::Roadmap, Some(json!({"v": 1}))).await;
        store.record("s", "a question", Flow::Answer, None).await;
        store.record("s", "second roadmap", Flow::Roadmap, Some(json!({"v": 2}))).await;

        let session = store.get("s").await.unwrap();
        assert_eq!(session.roadmap, Some(json!({"v": 2})));
        assert_eq!(session.queries.len(), 3);

        let info = store.info("s").await;
        assert!(info.exists && info.has_roadmap);
        assert_eq!(info.query_count, 3);
    }

    #[tokio::test]
    async fn test_concurrent_records_on_one_session() {
        let store = Arc::new(SessionStore::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .record("shared", &format!("q{}", i), Flow::Answer, None)
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.info("shared").await.query_count, 16);
        assert_eq!(store.len().await, 1);
    }
}
