pub mod gemini;

use async_trait::async_trait;
use log::{ error, info, warn };
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::cli::Args;
use crate::models::chat::{ ChatMessage, MessageKind };
use self::gemini::GeminiBackend;

/// Upper bound on the suggestions handed back to the caller.
pub const MAX_SUGGESTIONS: usize = 3;

/// How many trailing messages are rendered into the prompt.
pub const PROMPT_WINDOW: usize = 5;

/// Returned when no credential is configured; live generation never ran.
pub const DISABLED_FALLBACK: [&str; 3] = ["Got it!", "Thanks!", "How can I help?"];

/// Returned when generation was attempted and the call failed.
pub const ERROR_FALLBACK: [&str; 3] = ["Yes", "No", "Okay"];

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned no candidates")]
    EmptyResponse,
    #[error("failed to parse backend response: {0}")]
    Parse(#[from] serde_json::Error),
}

#[async_trait]
pub trait ReplyBackend: Send + Sync {
    /// Sends the prompt upstream and returns the raw model text, which is
    /// expected to be a JSON document of shape `{"replies": [string]}`.
    async fn complete(&self, prompt: &str) -> Result<String, ReplyError>;
}

#[derive(Deserialize)]
struct SuggestionPayload {
    replies: Option<Vec<String>>,
}

/// Produces up to 3 short reply suggestions for a conversation history.
///
/// The backend is injected at construction and read once: constructing the
/// service without one disables live generation for the process lifetime.
#[derive(Clone)]
pub struct SmartReplyService {
    backend: Option<Arc<dyn ReplyBackend>>,
}

impl SmartReplyService {
    pub fn new(backend: Option<Arc<dyn ReplyBackend>>) -> Self {
        Self { backend }
    }

    pub fn from_args(args: &Args) -> Self {
        match args.gemini_api_key.as_deref().filter(|key| !key.is_empty()) {
            Some(key) => {
                info!("Smart reply backend configured: model={}", gemini::GEMINI_MODEL);
                let backend = GeminiBackend::new(key.to_string(), args.gemini_base_url.clone());
                Self::new(Some(Arc::new(backend)))
            }
            None => {
                warn!("GEMINI_API_KEY not set. Gemini features will be disabled.");
                Self::new(None)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Never fails and makes at most one outbound call. Without a backend it
    /// returns [`DISABLED_FALLBACK`]; a failed or unparseable call collapses
    /// to [`ERROR_FALLBACK`]; a response without a `replies` field yields an
    /// empty list.
    pub async fn generate_smart_replies(&self, history: &[ChatMessage]) -> Vec<String> {
        let backend = match &self.backend {
            Some(backend) => backend,
            None => {
                return DISABLED_FALLBACK.iter().map(|s| s.to_string()).collect();
            }
        };

        let prompt = build_prompt(history);
        match request_replies(backend.as_ref(), &prompt).await {
            Ok(replies) => replies,
            Err(e) => {
                error!("Error generating smart replies: {}", e);
                ERROR_FALLBACK.iter().map(|s| s.to_string()).collect()
            }
        }
    }
}

async fn request_replies(
    backend: &dyn ReplyBackend,
    prompt: &str
) -> Result<Vec<String>, ReplyError> {
    let text = backend.complete(prompt).await?;
    let payload: SuggestionPayload = serde_json::from_str(text.trim())?;
    let mut replies = payload.replies.unwrap_or_default();
    replies.truncate(MAX_SUGGESTIONS);
    Ok(replies)
}

/// Renders the last [`PROMPT_WINDOW`] messages into the generation prompt.
/// Media payloads never appear here, only their kind tag.
pub fn build_prompt(history: &[ChatMessage]) -> String {
    let last_author = history
        .last()
        .map(|msg| msg.author.name.as_str())
        .unwrap_or("");
    let start = history.len().saturating_sub(PROMPT_WINDOW);
    let lines = history[start..]
        .iter()
        .map(render_message_line)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Based on the last few messages in this conversation, suggest three concise and relevant smart replies.\n\
        The user you are generating replies for is \"{}\".\n\
        Conversation:\n\
        {}",
        last_author,
        lines
    )
}

fn render_message_line(msg: &ChatMessage) -> String {
    match msg.kind {
        MessageKind::Text => format!("{}: {}", msg.author.name, msg.content),
        kind => format!("{}: [{}]", msg.author.name, kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::User;
    use tokio::sync::Mutex;

    fn message(author: &str, kind: MessageKind, content: &str) -> ChatMessage {
        ChatMessage {
            id: format!("msg-{}", uuid::Uuid::new_v4()),
            author: User::from_name(author),
            kind,
            content: content.to_string(),
            timestamp: 0,
            file_name: None,
        }
    }

    fn text(author: &str, content: &str) -> ChatMessage {
        message(author, MessageKind::Text, content)
    }

    /// Returns a canned body, recording every prompt it was handed.
    struct FixedBackend {
        body: String,
        prompts: Mutex<Vec<String>>,
    }

    impl FixedBackend {
        fn new(body: &str) -> Self {
            Self {
                body: body.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReplyBackend for FixedBackend {
        async fn complete(&self, prompt: &str) -> Result<String, ReplyError> {
            self.prompts.lock().await.push(prompt.to_string());
            Ok(self.body.clone())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl ReplyBackend for FailingBackend {
        async fn complete(&self, _prompt: &str) -> Result<String, ReplyError> {
            Err(ReplyError::EmptyResponse)
        }
    }

    fn enabled(backend: Arc<dyn ReplyBackend>) -> SmartReplyService {
        SmartReplyService::new(Some(backend))
    }

    #[tokio::test]
    async fn missing_credential_returns_disabled_fallback() {
        let service = SmartReplyService::new(None);
        assert_eq!(service.generate_smart_replies(&[]).await, DISABLED_FALLBACK.to_vec());
        let history = vec![text("Alice", "hello"), text("Bob", "hi")];
        assert_eq!(service.generate_smart_replies(&history).await, DISABLED_FALLBACK.to_vec());
    }

    #[tokio::test]
    async fn backend_failure_returns_error_fallback() {
        let service = enabled(Arc::new(FailingBackend));
        let history = vec![text("Alice", "are you there?")];
        assert_eq!(service.generate_smart_replies(&history).await, ERROR_FALLBACK.to_vec());
    }

    #[tokio::test]
    async fn replies_pass_through_without_padding() {
        let service = enabled(Arc::new(FixedBackend::new(r#"{"replies": ["A", "B"]}"#)));
        let history = vec![text("Alice", "pick one")];
        assert_eq!(service.generate_smart_replies(&history).await, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn missing_replies_field_yields_empty_list() {
        let service = enabled(Arc::new(FixedBackend::new(r#"{"status": "ok"}"#)));
        let history = vec![text("Alice", "anything?")];
        assert!(service.generate_smart_replies(&history).await.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_returns_error_fallback() {
        let service = enabled(Arc::new(FixedBackend::new("not json at all")));
        let history = vec![text("Alice", "hm")];
        assert_eq!(service.generate_smart_replies(&history).await, ERROR_FALLBACK.to_vec());
    }

    #[tokio::test]
    async fn overlong_reply_lists_are_truncated() {
        let body = r#"{"replies": ["1", "2", "3", "4", "5"]}"#;
        let service = enabled(Arc::new(FixedBackend::new(body)));
        let history = vec![text("Alice", "count")];
        assert_eq!(service.generate_smart_replies(&history).await, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn empty_history_still_attempts_a_call() {
        let backend = Arc::new(FixedBackend::new(r#"{"replies": []}"#));
        let service = enabled(backend.clone());
        let replies = service.generate_smart_replies(&[]).await;
        assert!(replies.is_empty());

        let prompts = backend.prompts.lock().await;
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("is \"\""));
    }

    #[tokio::test]
    async fn repeat_invocations_are_deterministic() {
        let service = enabled(Arc::new(FixedBackend::new(r#"{"replies": ["Sure"]}"#)));
        let history = vec![text("Alice", "again?")];
        let first = service.generate_smart_replies(&history).await;
        let second = service.generate_smart_replies(&history).await;
        assert_eq!(first, second);
    }

    #[test]
    fn prompt_keeps_only_the_last_five_messages() {
        let history: Vec<ChatMessage> = (1..=7)
            .map(|i| text(&format!("user{}", i), &format!("message {}", i)))
            .collect();
        let prompt = build_prompt(&history);

        assert!(!prompt.contains("message 1"));
        assert!(!prompt.contains("message 2"));
        for i in 3..=7 {
            assert!(prompt.contains(&format!("user{}: message {}", i, i)));
        }
        assert!(prompt.contains("is \"user7\""));
    }

    #[test]
    fn media_messages_render_as_kind_tags() {
        let history = vec![
            text("Bob", "look at this"),
            message("Alice", MessageKind::Image, "data:image/png;base64,aGVsbG8="),
        ];
        let prompt = build_prompt(&history);

        assert!(prompt.contains("Alice: [IMAGE]"));
        assert!(!prompt.contains("base64"));
        assert!(!prompt.contains("aGVsbG8="));
    }
}
