use base64::{ engine::general_purpose::STANDARD as BASE64, Engine as _ };
use serde::{ Serialize, Deserialize };
use std::error::Error;
use std::fmt;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            MessageKind::Text => "TEXT",
            MessageKind::Image => "IMAGE",
            MessageKind::Video => "VIDEO",
            MessageKind::Audio => "AUDIO",
        };
        write!(f, "{}", tag)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

impl User {
    pub fn from_name(name: &str) -> Self {
        Self {
            id: format!("user-{}", Uuid::new_v4()),
            name: name.to_string(),
            avatar: format!("https://i.pravatar.cc/150?u={}", name),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub author: User,
    pub kind: MessageKind,
    /// Message body for Text; an in-memory data URL for media kinds.
    pub content: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataUrlInfo {
    pub mime_type: String,
    pub payload_len: usize,
}

/// Validates a `data:<mime>;base64,<payload>` URL and reports the decoded
/// payload size. Media attachments are only ever held in memory in this form.
pub fn parse_data_url(content: &str) -> Result<DataUrlInfo, Box<dyn Error + Send + Sync>> {
    let rest = content.strip_prefix("data:").ok_or("data URL must start with 'data:'")?;
    let (header, payload) = rest.split_once(',').ok_or("data URL is missing its payload")?;
    let mime_type = header.strip_suffix(";base64").ok_or("only base64 data URLs are supported")?;
    if mime_type.is_empty() {
        return Err("data URL is missing a mime type".into());
    }
    let decoded = BASE64.decode(payload).map_err(|e| format!("invalid base64 payload: {}", e))?;
    Ok(DataUrlInfo {
        mime_type: mime_type.to_string(),
        payload_len: decoded.len(),
    })
}
