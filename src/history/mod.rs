use async_trait::async_trait;
use chrono::Utc;
use log::info;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::chat::{ ChatMessage, Conversation, MessageKind, User };

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append_message(
        &self,
        conversation_id: &str,
        message: ChatMessage
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn get_conversation(
        &self,
        conversation_id: &str
    ) -> Result<Conversation, Box<dyn Error + Send + Sync>>;

    async fn recent(
        &self,
        conversation_id: &str,
        limit: usize
    ) -> Result<Vec<ChatMessage>, Box<dyn Error + Send + Sync>>;
}

/// Session-scoped store; conversations vanish when the process exits.
pub struct MemoryHistoryStore {
    conversations: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_seed(conversation_id: &str, messages: Vec<ChatMessage>) -> Self {
        let mut conversations = HashMap::new();
        conversations.insert(conversation_id.to_string(), messages);
        Self {
            conversations: RwLock::new(conversations),
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append_message(
        &self,
        conversation_id: &str,
        message: ChatMessage
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut conversations = self.conversations.write().await;
        conversations.entry(conversation_id.to_string()).or_default().push(message);
        Ok(())
    }

    async fn get_conversation(
        &self,
        conversation_id: &str
    ) -> Result<Conversation, Box<dyn Error + Send + Sync>> {
        let conversations = self.conversations.read().await;
        Ok(Conversation {
            id: conversation_id.to_string(),
            messages: conversations.get(conversation_id).cloned().unwrap_or_default(),
        })
    }

    async fn recent(
        &self,
        conversation_id: &str,
        limit: usize
    ) -> Result<Vec<ChatMessage>, Box<dyn Error + Send + Sync>> {
        let conversations = self.conversations.read().await;
        let messages = conversations.get(conversation_id).map(|m| m.as_slice()).unwrap_or(&[]);
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }
}

pub fn initialize_history_store(channel: &str) -> Arc<dyn HistoryStore> {
    info!("Chat history will be kept in memory for channel: {}", channel);
    Arc::new(MemoryHistoryStore::with_seed(channel, seed_messages()))
}

/// Demo conversation shown before anyone has typed anything.
pub fn seed_messages() -> Vec<ChatMessage> {
    let now = Utc::now().timestamp_millis();
    vec![
        ChatMessage {
            id: format!("msg-{}", Uuid::new_v4()),
            author: User::from_name("Alice"),
            kind: MessageKind::Text,
            content: "Hey! Are we still on for the project meeting tomorrow?".to_string(),
            timestamp: now - 1000 * 60 * 5,
            file_name: None,
        },
        ChatMessage {
            id: format!("msg-{}", Uuid::new_v4()),
            author: User::from_name("Bob"),
            kind: MessageKind::Text,
            content: "Yep, I'll be there. I've finished the slides.".to_string(),
            timestamp: now - 1000 * 60 * 4,
            file_name: None,
        },
    ]
}
