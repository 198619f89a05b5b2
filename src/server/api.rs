use crate::history::HistoryStore;
use crate::models::chat::{ parse_data_url, ChatMessage, Conversation, MessageKind, User };
use crate::suggest::SmartReplyService;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{ get, post },
    Json,
    Router,
};
use chrono::Utc;
use log::{ error, info };
use serde::{ Deserialize, Serialize };
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub service: SmartReplyService,
    pub store: Arc<dyn HistoryStore>,
    pub channel: String,
    pub device_verified: Arc<AtomicBool>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct NewMessageRequest {
    pub author: User,
    pub kind: MessageKind,
    pub content: String,
    pub file_name: Option<String>,
}

#[derive(Serialize)]
struct PostMessageResponse {
    message: ChatMessage,
    smart_replies: Vec<String>,
}

#[derive(Deserialize)]
pub struct SmartReplyRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct SmartReplyResponse {
    replies: Vec<String>,
}

#[derive(Serialize)]
struct DeviceStatus {
    verified: bool,
}

#[derive(Serialize)]
struct ChannelEntry {
    name: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/login", post(login_handler))
        .route("/api/messages", get(list_messages_handler).post(post_message_handler))
        .route("/api/smart-replies", post(smart_replies_handler))
        .route("/api/device", get(device_status_handler))
        .route("/api/device/verify", post(verify_device_handler))
        .route("/api/channels", get(channels_handler))
        .route("/api/docs", get(docs_handler))
        .layer(cors)
        .with_state(state)
}

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            message: message.to_string(),
        }),
    ).into_response()
}

async fn login_handler(Json(req): Json<LoginRequest>) -> impl IntoResponse {
    let name = req.name.trim();
    if name.is_empty() {
        return bad_request("Display name must not be empty");
    }
    let user = User::from_name(name);
    info!("Login: {}", user.name);
    (StatusCode::OK, Json(user)).into_response()
}

async fn list_messages_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.get_conversation(&state.channel).await {
        Ok(conversation) => (StatusCode::OK, Json::<Conversation>(conversation)).into_response(),
        Err(e) => {
            error!("Failed to read conversation {}: {}", state.channel, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    message: "Failed to read conversation".to_string(),
                }),
            ).into_response()
        }
    }
}

async fn post_message_handler(
    State(state): State<AppState>,
    Json(req): Json<NewMessageRequest>
) -> impl IntoResponse {
    match req.kind {
        MessageKind::Text => {
            if req.content.trim().is_empty() {
                return bad_request("Message content must not be empty");
            }
        }
        _ => {
            if let Err(e) = parse_data_url(&req.content) {
                return bad_request(&format!("Invalid media attachment: {}", e));
            }
        }
    }

    let message = ChatMessage {
        id: format!("msg-{}", Uuid::new_v4()),
        author: req.author,
        kind: req.kind,
        content: req.content,
        timestamp: Utc::now().timestamp_millis(),
        file_name: req.file_name,
    };

    if let Err(e) = state.store.append_message(&state.channel, message.clone()).await {
        error!("Failed to append message to {}: {}", state.channel, e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                message: "Failed to store message".to_string(),
            }),
        ).into_response();
    }

    // Suggestions are regenerated on every append, same as the composer UI
    // re-invoking the service on each list change.
    let history = match state.store.get_conversation(&state.channel).await {
        Ok(conversation) => conversation.messages,
        Err(_) => vec![message.clone()],
    };
    let smart_replies = state.service.generate_smart_replies(&history).await;

    (
        StatusCode::OK,
        Json(PostMessageResponse {
            message,
            smart_replies,
        }),
    ).into_response()
}

async fn smart_replies_handler(
    State(state): State<AppState>,
    Json(req): Json<SmartReplyRequest>
) -> impl IntoResponse {
    let replies = state.service.generate_smart_replies(&req.messages).await;
    (StatusCode::OK, Json(SmartReplyResponse { replies })).into_response()
}

async fn device_status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(DeviceStatus {
        verified: state.device_verified.load(Ordering::Relaxed),
    })
}

async fn verify_device_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.device_verified.store(true, Ordering::Relaxed);
    info!("Device marked as verified");
    Json(DeviceStatus { verified: true })
}

async fn channels_handler() -> impl IntoResponse {
    let channels: Vec<ChannelEntry> = ["general", "project-x", "random"]
        .iter()
        .map(|name| ChannelEntry {
            name: name.to_string(),
        })
        .collect();
    Json(channels)
}

async fn docs_handler() -> impl IntoResponse {
    Json(
        serde_json::json!({
            "name": "smart-reply-agent API",
            "endpoints": [
                { "method": "POST", "path": "/api/login", "description": "Exchange a display name for a user profile. No credential check." },
                { "method": "GET", "path": "/api/messages", "description": "Current conversation for the configured channel." },
                { "method": "POST", "path": "/api/messages", "description": "Append a message and receive fresh smart replies. Media content must be a base64 data URL." },
                { "method": "POST", "path": "/api/smart-replies", "description": "Up to 3 reply suggestions for a caller-supplied history." },
                { "method": "GET", "path": "/api/device", "description": "Device verification flag for this session." },
                { "method": "POST", "path": "/api/device/verify", "description": "Mark this device as verified." },
                { "method": "GET", "path": "/api/channels", "description": "Static channel list." },
                { "method": "GET", "path": "/api/docs", "description": "This document." }
            ]
        })
    )
}
