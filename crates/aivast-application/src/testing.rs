//! Test doubles for the backend and the rendering surface.

use crate::context::AuthMode;
use crate::poller::ScanPoller;
use crate::services::Services;
use aivast_core::render::{BubbleHandle, BubbleRole, PlainText, RenderSurface};
use aivast_core::scan::{ScanCreated, ScanRequest, ScanStatusReport};
use aivast_core::session::{
    ChatReply, ChatRequest, GuestChatReply, GuestChatRequest, SessionDetail, SessionSummary,
};
use aivast_core::{AivastError, ClientConfig, Mode, Result, ScanBackend, ScanId, SessionId};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn status(value: serde_json::Value) -> ScanStatusReport {
    serde_json::from_value(value).expect("valid status report")
}

pub fn session_summary(id: &str, title: &str) -> SessionSummary {
    SessionSummary {
        id: SessionId::new(id),
        title: title.to_string(),
        created_at: None,
        updated_at: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Render(BubbleHandle, BubbleRole, String),
    Update(BubbleHandle, String),
    Clear,
    ModeChanged(Mode),
    SessionsChanged(Vec<SessionSummary>),
}

#[derive(Default)]
pub struct RecordingSurface {
    calls: Mutex<Vec<SurfaceCall>>,
    next_handle: AtomicU64,
}

impl RecordingSurface {
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn update_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, SurfaceCall::Update(..)))
            .count()
    }

    /// Role and content of every rendered bubble, in order.
    pub fn renders(&self) -> Vec<(BubbleRole, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::Render(_, role, content) => Some((role, content)),
                _ => None,
            })
            .collect()
    }

    pub fn roles(&self) -> Vec<BubbleRole> {
        self.renders().into_iter().map(|(role, _)| role).collect()
    }

    /// Content of the most recent render or update.
    pub fn last_content(&self) -> String {
        self.calls()
            .into_iter()
            .rev()
            .find_map(|c| match c {
                SurfaceCall::Render(_, _, content) | SurfaceCall::Update(_, content) => {
                    Some(content)
                }
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn last_update_handle(&self) -> Option<BubbleHandle> {
        self.calls().into_iter().rev().find_map(|c| match c {
            SurfaceCall::Update(handle, _) => Some(handle),
            _ => None,
        })
    }

    /// Current content of a bubble after all updates.
    pub fn content_of(&self, handle: BubbleHandle) -> Option<String> {
        let mut content = None;
        for call in self.calls() {
            match call {
                SurfaceCall::Render(h, _, c) | SurfaceCall::Update(h, c) if h == handle => {
                    content = Some(c)
                }
                _ => {}
            }
        }
        content
    }

    pub fn clear_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, SurfaceCall::Clear))
            .count()
    }

    pub fn last_sessions(&self) -> Option<Vec<SessionSummary>> {
        self.calls().into_iter().rev().find_map(|c| match c {
            SurfaceCall::SessionsChanged(sessions) => Some(sessions),
            _ => None,
        })
    }

    pub fn last_mode(&self) -> Option<Mode> {
        self.calls().into_iter().rev().find_map(|c| match c {
            SurfaceCall::ModeChanged(mode) => Some(mode),
            _ => None,
        })
    }
}

impl RenderSurface for RecordingSurface {
    fn render_bubble(&self, content: &str, role: BubbleRole) -> BubbleHandle {
        let handle = BubbleHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.calls
            .lock()
            .unwrap()
            .push(SurfaceCall::Render(handle, role, content.to_string()));
        handle
    }

    fn update_bubble(&self, handle: BubbleHandle, content: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(SurfaceCall::Update(handle, content.to_string()));
    }

    fn clear(&self) {
        self.calls.lock().unwrap().push(SurfaceCall::Clear);
    }

    fn mode_changed(&self, mode: &Mode) {
        self.calls
            .lock()
            .unwrap()
            .push(SurfaceCall::ModeChanged(mode.clone()));
    }

    fn sessions_changed(&self, sessions: &[SessionSummary]) {
        self.calls
            .lock()
            .unwrap()
            .push(SurfaceCall::SessionsChanged(sessions.to_vec()));
    }
}

#[derive(Default)]
struct MockState {
    statuses: HashMap<ScanId, VecDeque<Result<ScanStatusReport>>>,
    creations: VecDeque<Result<ScanCreated>>,
    chats: VecDeque<Result<ChatReply>>,
    guest_chats: VecDeque<Result<GuestChatReply>>,
    sessions: Vec<SessionSummary>,
    details: HashMap<SessionId, SessionDetail>,
    next_scan_id: u64,
    status_delay: Option<Duration>,

    create_requests: Vec<ScanRequest>,
    chat_requests: Vec<ChatRequest>,
    guest_requests: Vec<GuestChatRequest>,
    status_calls: usize,
    list_calls: usize,
    get_calls: usize,
    renamed: Vec<(SessionId, String)>,
    deleted: Vec<SessionId>,
}

/// Scripted in-memory backend.
///
/// Unscripted status polls answer `running`; unscripted scan creations
/// return sequential ids starting at 100.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn push_status(&self, scan_id: &str, report: ScanStatusReport) {
        self.state
            .lock()
            .unwrap()
            .statuses
            .entry(ScanId::new(scan_id))
            .or_default()
            .push_back(Ok(report));
    }

    pub fn push_status_error(&self, scan_id: &str, err: AivastError) {
        self.state
            .lock()
            .unwrap()
            .statuses
            .entry(ScanId::new(scan_id))
            .or_default()
            .push_back(Err(err));
    }

    /// Makes every status call take `delay` before answering.
    pub fn set_status_delay(&self, delay: Duration) {
        self.state.lock().unwrap().status_delay = Some(delay);
    }

    pub fn push_creation(&self, result: Result<ScanCreated>) {
        self.state.lock().unwrap().creations.push_back(result);
    }

    pub fn push_chat(&self, result: Result<ChatReply>) {
        self.state.lock().unwrap().chats.push_back(result);
    }

    pub fn push_guest_chat(&self, result: Result<GuestChatReply>) {
        self.state.lock().unwrap().guest_chats.push_back(result);
    }

    pub fn set_sessions(&self, sessions: Vec<SessionSummary>) {
        self.state.lock().unwrap().sessions = sessions;
    }

    pub fn set_detail(&self, session_id: &str, detail: SessionDetail) {
        self.state
            .lock()
            .unwrap()
            .details
            .insert(SessionId::new(session_id), detail);
    }

    pub fn create_requests(&self) -> Vec<ScanRequest> {
        self.state.lock().unwrap().create_requests.clone()
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.state.lock().unwrap().chat_requests.clone()
    }

    pub fn guest_requests(&self) -> Vec<GuestChatRequest> {
        self.state.lock().unwrap().guest_requests.clone()
    }

    pub fn status_calls(&self) -> usize {
        self.state.lock().unwrap().status_calls
    }

    pub fn list_sessions_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn get_session_calls(&self) -> usize {
        self.state.lock().unwrap().get_calls
    }

    pub fn renamed(&self) -> Vec<(SessionId, String)> {
        self.state.lock().unwrap().renamed.clone()
    }

    pub fn deleted(&self) -> Vec<SessionId> {
        self.state.lock().unwrap().deleted.clone()
    }
}

#[async_trait]
impl ScanBackend for MockBackend {
    async fn create_scan(&self, request: &ScanRequest) -> Result<ScanCreated> {
        let mut state = self.state.lock().unwrap();
        state.create_requests.push(request.clone());
        if let Some(result) = state.creations.pop_front() {
            return result;
        }
        let id = 100 + state.next_scan_id;
        state.next_scan_id += 1;
        Ok(ScanCreated {
            scan_id: Some(ScanId::new(id.to_string())),
            session_id: None,
        })
    }

    async fn scan_status(&self, scan_id: &ScanId) -> Result<ScanStatusReport> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.status_calls += 1;
            state.status_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state
            .statuses
            .get_mut(scan_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(status(serde_json::json!({"status": "running"}))))
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let mut state = self.state.lock().unwrap();
        state.chat_requests.push(request.clone());
        state
            .chats
            .pop_front()
            .unwrap_or_else(|| Err(AivastError::internal("no scripted chat reply")))
    }

    async fn guest_chat(&self, request: &GuestChatRequest) -> Result<GuestChatReply> {
        let mut state = self.state.lock().unwrap();
        state.guest_requests.push(request.clone());
        state
            .guest_chats
            .pop_front()
            .unwrap_or_else(|| Err(AivastError::internal("no scripted guest reply")))
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        Ok(state.sessions.clone())
    }

    async fn get_session(&self, session_id: &SessionId) -> Result<SessionDetail> {
        let mut state = self.state.lock().unwrap();
        state.get_calls += 1;
        state
            .details
            .get(session_id)
            .cloned()
            .ok_or_else(|| AivastError::not_found("Session", session_id.as_str()))
    }

    async fn rename_session(&self, session_id: &SessionId, title: &str) -> Result<SessionSummary> {
        let mut state = self.state.lock().unwrap();
        state.renamed.push((session_id.clone(), title.to_string()));
        Ok(session_summary(session_id.as_str(), title))
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.deleted.push(session_id.clone());
        Ok(())
    }
}

/// Services wired to the test doubles.
pub struct TestHarness {
    pub backend: Arc<MockBackend>,
    pub surface: Arc<RecordingSurface>,
    pub services: Arc<Services>,
}

impl TestHarness {
    pub fn new(auth: AuthMode, backend: MockBackend, surface: RecordingSurface) -> Self {
        Self::with_config(
            ClientConfig {
                guest: auth == AuthMode::Guest,
                ..ClientConfig::default()
            },
            backend,
            surface,
        )
    }

    pub fn with_config(config: ClientConfig, backend: MockBackend, surface: RecordingSurface) -> Self {
        let backend = Arc::new(backend);
        let surface = Arc::new(surface);
        let services = Arc::new(Services::new(
            backend.clone(),
            surface.clone(),
            Arc::new(PlainText),
            config,
        ));
        Self {
            backend,
            surface,
            services,
        }
    }

    pub fn authenticated() -> Self {
        Self::new(
            AuthMode::Authenticated,
            MockBackend::default(),
            RecordingSurface::default(),
        )
    }

    pub fn guest() -> Self {
        Self::new(AuthMode::Guest, MockBackend::default(), RecordingSurface::default())
    }

    pub fn poller(&self) -> ScanPoller {
        ScanPoller::new(self.services.clone())
    }
}
