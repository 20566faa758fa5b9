//! In-memory session records: conversation turns and uploaded document chunks.
//!
//! Sessions live only in process memory and are evicted after an inactivity
//! window by a background sweeper.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::models::{ChatMessage, DocumentChunk, DocumentInfo};
use crate::rag::{self, RetrievedChunk};

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub turns: Vec<ChatMessage>,
    pub documents: Vec<DocumentInfo>,
    pub chunks: Vec<DocumentChunk>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            turns: Vec::new(),
            documents: Vec::new(),
            chunks: Vec::new(),
            created_at: now,
            last_active: now,
        }
    }
}

/// What `GET /session/{id}` reports
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub exists: bool,
    /// Number of stored document chunks
    pub count: usize,
    pub created_at: Option<DateTime<Utc>>,
    pub last_active: Option<DateTime<Utc>>,
    pub documents: Vec<DocumentInfo>,
    pub turns: usize,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    max_history_turns: usize,
}

impl SessionStore {
    pub fn new(max_history_turns: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_history_turns,
        }
    }

    /// Resolve a client-supplied session id, creating the record if needed.
    /// A missing or blank id gets a fresh UUID.
    pub fn get_or_create(&self, session_id: Option<&str>) -> String {
        let id = match session_id.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        let mut sessions = self.sessions.write();
        sessions
            .entry(id.clone())
            .and_modify(|s| s.last_active = Utc::now())
            .or_insert_with(|| {
                tracing::debug!("Created session {id}");
                Session::new(id.clone())
            });
        id
    }

    pub fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        self.sessions
            .read()
            .get(session_id)
            .map(|s| s.turns.clone())
            .unwrap_or_default()
    }

    /// Record a user/assistant exchange, keeping only the most recent turns.
    pub fn append_exchange(&self, session_id: &str, user: &str, assistant: &str) {
        let mut sessions = self.sessions.write();
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string()));

        session.turns.push(ChatMessage::user(user));
        session.turns.push(ChatMessage::assistant(assistant));
        if session.turns.len() > self.max_history_turns {
            let excess = session.turns.len() - self.max_history_turns;
            session.turns.drain(..excess);
        }
        session.last_active = Utc::now();
    }

    /// Attach the chunks of one uploaded document. Returns the number added.
    pub fn add_chunks(&self, session_id: &str, filename: &str, chunks: Vec<DocumentChunk>) -> usize {
        if chunks.is_empty() {
            return 0;
        }

        let added = chunks.len();
        let mut sessions = self.sessions.write();
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string()));

        session.chunks.extend(chunks);
        session.documents.push(DocumentInfo {
            filename: filename.to_string(),
            uploaded_at: Utc::now(),
            chunks: added,
        });
        session.last_active = Utc::now();
        added
    }

    pub fn has_documents(&self, session_id: &str) -> bool {
        self.sessions
            .read()
            .get(session_id)
            .is_some_and(|s| !s.chunks.is_empty())
    }

    /// Top-k chunks of a session for a query. Unknown sessions yield nothing.
    pub fn search(
        &self,
        session_id: &str,
        query: &str,
        query_embedding: Option<&[f32]>,
        k: usize,
    ) -> Vec<RetrievedChunk> {
        let sessions = self.sessions.read();
        match sessions.get(session_id) {
            Some(session) => rag::retrieve(&session.chunks, query, query_embedding, k),
            None => Vec::new(),
        }
    }

    pub fn info(&self, session_id: &str) -> SessionInfo {
        let sessions = self.sessions.read();
        match sessions.get(session_id) {
            Some(s) => SessionInfo {
                exists: true,
                count: s.chunks.len(),
                created_at: Some(s.created_at),
                last_active: Some(s.last_active),
                documents: s.documents.clone(),
                turns: s.turns.len(),
            },
            None => SessionInfo {
                exists: false,
                count: 0,
                created_at: None,
                last_active: None,
                documents: Vec::new(),
                turns: 0,
            },
        }
    }

    /// Drop a session and everything attached to it.
    pub fn clear(&self, session_id: &str) -> bool {
        self.sessions.write().remove(session_id).is_some()
    }

    /// Remove sessions idle for at least `ttl`. Returns how many were removed.
    pub fn evict_expired(&self, ttl: Duration) -> usize {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| now.signed_duration_since(s.last_active) < ttl);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

/// Periodically evict idle sessions for the lifetime of the process.
pub fn spawn_sweeper(
    store: Arc<SessionStore>,
    ttl: Duration,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let evicted = store.evict_expired(ttl);
            if evicted > 0 {
                tracing::info!(
                    "Evicted {evicted} idle session(s), {} remaining",
                    store.len()
                );
            }
        }
    })
}
