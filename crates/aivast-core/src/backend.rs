//! Backend trait.
//!
//! Defines the calls the conversation surface makes against the scanning
//! backend, decoupling orchestration from the HTTP transport.

use crate::error::Result;
use crate::ids::{ScanId, SessionId};
use crate::scan::{ScanCreated, ScanRequest, ScanStatusReport};
use crate::session::{
    ChatReply, ChatRequest, GuestChatReply, GuestChatRequest, SessionDetail, SessionSummary,
};
use async_trait::async_trait;

/// An abstract client for the scanning backend.
///
/// # Error contract
///
/// Implementations map failures onto [`crate::AivastError`]:
/// - unreachable backend: `Transport`
/// - HTTP 429: `RateLimited`
/// - any other non-success status: `Backend`, carrying the backend's message
/// - an undecodable success body: `MalformedResponse`
#[async_trait]
pub trait ScanBackend: Send + Sync {
    /// `POST /scans`
    async fn create_scan(&self, request: &ScanRequest) -> Result<ScanCreated>;

    /// `GET /scans/{id}/status`
    async fn scan_status(&self, scan_id: &ScanId) -> Result<ScanStatusReport>;

    /// `POST /chat`
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// `POST /chat/guest`
    async fn guest_chat(&self, request: &GuestChatRequest) -> Result<GuestChatReply>;

    /// `GET /sessions`
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>>;

    /// `GET /sessions/{id}`
    async fn get_session(&self, session_id: &SessionId) -> Result<SessionDetail>;

    /// `PUT /sessions/{id}`
    async fn rename_session(&self, session_id: &SessionId, title: &str) -> Result<SessionSummary>;

    /// `DELETE /sessions/{id}`
    async fn delete_session(&self, session_id: &SessionId) -> Result<()>;
}
