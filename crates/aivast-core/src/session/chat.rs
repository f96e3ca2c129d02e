//! Chat payloads for the authenticated and guest chat endpoints.

use super::guest::GuestTurn;
use crate::ids::SessionId;
use serde::{Deserialize, Serialize};

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AiMessage {
    pub content: String,
}

/// Response of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    pub ai_message: AiMessage,
}

/// Body of `POST /chat/guest`. The whole history travels with every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestChatRequest {
    pub message: String,
    pub history: Vec<GuestTurn>,
}

/// Response of `POST /chat/guest`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuestChatReply {
    pub ai_response: String,
}
