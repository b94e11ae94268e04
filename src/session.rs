//! In-memory chat transcripts, one per session id.

use std::collections::HashMap;

use chrono::Local;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub user_text: String,
    pub bot_text: String,
    /// Local wall-clock `HH:MM:SS`.
    pub timestamp: String,
}

/// Append-only transcript. Turns are never edited or removed.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, user_text: &str, bot_text: &str) -> ChatTurn {
        let turn = ChatTurn {
            user_text: user_text.to_string(),
            bot_text: bot_text.to_string(),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
        };
        self.turns.push(turn.clone());
        turn
    }

    pub fn all_turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, ChatSession>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .await
            .insert(id.clone(), ChatSession::new());
        tracing::debug!("Created session {}", id);
        id
    }

    pub async fn exists(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    pub async fn turns(&self, id: &str) -> Option<Vec<ChatTurn>> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|session| session.all_turns().to_vec())
    }

    /// Records a finished exchange. `None` if the session is unknown.
    pub async fn append(&self, id: &str, user_text: &str, bot_text: &str) -> Option<ChatTurn> {
        let mut sessions = self.sessions.write().await;
        sessions
            .get_mut(id)
            .map(|session| session.append(user_text, bot_text))
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
