//! HttpBackend - REST implementation of [`ScanBackend`] for the AIVAST API.
//!
//! All bodies are JSON. Authentication is carried by whatever the supplied
//! `reqwest::Client` sends (session cookie, headers); this module does not
//! manage credentials.

use aivast_core::scan::{ScanCreated, ScanRequest, ScanStatusReport};
use aivast_core::session::{
    ChatReply, ChatRequest, GuestChatReply, GuestChatRequest, SessionDetail, SessionList,
    SessionSummary,
};
use aivast_core::{AivastError, ClientConfig, Result, ScanBackend, ScanId, SessionId};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Backend client talking to the AIVAST HTTP API.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct RenameRequest<'a> {
    title: &'a str,
}

impl HttpBackend {
    /// Creates a backend with a fresh client configured from `config`.
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client(Client::new(), &config.base_url, config.request_timeout())
    }

    /// Creates a backend around an existing client, e.g. one carrying a
    /// session cookie.
    pub fn with_client(client: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request and decodes a JSON success body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = self.send(request, what).await?;
        let body = response
            .text()
            .await
            .map_err(|e| AivastError::transport(format!("{what}: failed to read body: {e}")))?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("[HttpBackend] {} returned an undecodable body: {}", what, e);
            AivastError::malformed(format!("{what}: {e}"))
        })
    }

    /// Sends the request and maps failures onto the error taxonomy.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AivastError::transport(format!("{what}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::info!("[HttpBackend] {} rate limited", what);
            return Err(AivastError::RateLimited);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::warn!("[HttpBackend] {} failed ({}): {}", what, status, error_text);
        Err(AivastError::backend(
            Some(status.as_u16()),
            backend_message(&error_text),
        ))
    }
}

/// Extracts `error` (or `message`) from a JSON error body, else the raw text.
fn backend_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "message"]
                .iter()
                .find_map(|key| value.get(key)?.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl ScanBackend for HttpBackend {
    async fn create_scan(&self, request: &ScanRequest) -> Result<ScanCreated> {
        let builder = self.client.post(self.url("/scans")).json(request);
        self.send_json(builder, "create scan").await
    }

    async fn scan_status(&self, scan_id: &ScanId) -> Result<ScanStatusReport> {
        let builder = self.client.get(self.url(&format!("/scans/{scan_id}/status")));
        self.send_json(builder, "scan status").await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let builder = self.client.post(self.url("/chat")).json(request);
        self.send_json(builder, "chat").await
    }

    async fn guest_chat(&self, request: &GuestChatRequest) -> Result<GuestChatReply> {
        let builder = self.client.post(self.url("/chat/guest")).json(request);
        self.send_json(builder, "guest chat").await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let builder = self.client.get(self.url("/sessions"));
        let list: SessionList = self.send_json(builder, "list sessions").await?;
        Ok(list.sessions)
    }

    async fn get_session(&self, session_id: &SessionId) -> Result<SessionDetail> {
        let builder = self.client.get(self.url(&format!("/sessions/{session_id}")));
        self.send_json(builder, "get session").await.map_err(|e| {
            if e.is_not_found() {
                AivastError::not_found("Session", session_id.as_str())
            } else {
                e
            }
        })
    }

    async fn rename_session(&self, session_id: &SessionId, title: &str) -> Result<SessionSummary> {
        let builder = self
            .client
            .put(self.url(&format!("/sessions/{session_id}")))
            .json(&RenameRequest { title });
        self.send_json(builder, "rename session").await
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<()> {
        let builder = self.client.delete(self.url(&format!("/sessions/{session_id}")));
        self.send(builder, "delete session").await?;
        Ok(())
    }
}
