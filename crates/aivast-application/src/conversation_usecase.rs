//! Conversation use case implementation.
//!
//! `ConversationUseCase` is the single entry point a front end talks to. It
//! owns the conversation context and wires the dispatcher, poller, chat
//! paths and timeline replay to one backend and one rendering surface.

use crate::chat::{ChatResponder, Reply};
use crate::dispatcher::{ScanDispatcher, ScanOrder, ScanTask};
use crate::guest::GuestFallback;
use crate::services::Services;
use crate::timeline::{ReplaySummary, TimelineReconstructor};
use aivast_core::render::{BubbleRole, MarkupRenderer, RenderSurface};
use aivast_core::session::{SessionSummary, sort_recent_first};
use aivast_core::{AivastError, ClientConfig, Mode, Result, ScanBackend, ScanId, SessionId, Tool};
use std::sync::Arc;

/// What a submission led to.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Blank input; nothing was rendered or sent.
    Ignored,
    /// A tool was selected and a scan was created.
    Scan(ScanTask),
    /// The assistant answered.
    Reply(Reply),
    /// The request failed; the notice is already on the surface.
    Failed(AivastError),
}

/// Use case driving one conversation surface.
///
/// # Responsibilities
///
/// - Routing submissions to a scan or to chat depending on the mode
/// - Keeping the mode and the current session id
/// - Session list maintenance (list, rename, delete, replay)
/// - Owning every background poller and delayed directive
pub struct ConversationUseCase {
    services: Arc<Services>,
    dispatcher: ScanDispatcher,
    chat: ChatResponder,
    guest: GuestFallback,
    timeline: TimelineReconstructor,
}

impl ConversationUseCase {
    /// Creates a use case. Guest mode is taken from `config.guest`.
    pub fn new(
        backend: Arc<dyn ScanBackend>,
        surface: Arc<dyn RenderSurface>,
        markup: Arc<dyn MarkupRenderer>,
        config: ClientConfig,
    ) -> Self {
        Self::from_services(Arc::new(Services::new(backend, surface, markup, config)))
    }

    pub(crate) fn from_services(services: Arc<Services>) -> Self {
        let dispatcher = ScanDispatcher::new(services.clone());
        Self {
            chat: ChatResponder::new(services.clone(), dispatcher.clone()),
            guest: GuestFallback::new(services.clone(), dispatcher.clone()),
            timeline: TimelineReconstructor::new(services.clone()),
            dispatcher,
            services,
        }
    }

    /// Handles text the user submitted.
    ///
    /// With a tool selected the text is the scan target and the mode returns
    /// to direct chat as soon as the scan is dispatched. Otherwise the text
    /// goes to the assistant, through the guest path when unauthenticated.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Ignored;
        }

        self.services
            .surface
            .render_bubble(&self.services.to_markup(text), BubbleRole::User);

        let (snapshot, order) = {
            let mut context = self.services.context.lock().await;
            let snapshot = context.snapshot();
            let mode = context.mode().clone();
            let order = mode.tool.map(|_| ScanOrder::from_mode(text, &mode));
            if order.is_some() {
                let reset = context.selector_mut().reset().clone();
                self.services.surface.mode_changed(&reset);
            }
            (snapshot, order)
        };

        if let Some(order) = order {
            return match self.dispatcher.initiate_scan(&snapshot, order).await {
                Ok(task) => SubmitOutcome::Scan(task),
                Err(e) => SubmitOutcome::Failed(e),
            };
        }

        let result = if snapshot.is_guest() {
            self.guest.send(&snapshot, text).await
        } else {
            self.chat.send(&snapshot, text).await
        };
        match result {
            Ok(reply) => SubmitOutcome::Reply(reply),
            Err(e) => SubmitOutcome::Failed(e),
        }
    }

    /// Starts a scan directly, bypassing the mode.
    pub async fn initiate_scan(&self, order: ScanOrder) -> Result<ScanTask> {
        let snapshot = self.services.snapshot().await;
        self.dispatcher.initiate_scan(&snapshot, order).await
    }

    // Mode selection

    pub async fn select_tool(&self, tool: Tool) -> Mode {
        self.update_mode(|selector| selector.select_tool(tool).clone())
            .await
    }

    pub async fn cancel_tool(&self) -> Mode {
        self.update_mode(|selector| selector.cancel_tool().clone()).await
    }

    pub async fn set_deep_scan(&self, deep_scan: bool) -> Mode {
        self.update_mode(|selector| selector.set_deep_scan(deep_scan).clone())
            .await
    }

    pub async fn set_wordlist(&self, wordlist: Option<String>) -> Mode {
        self.update_mode(|selector| selector.set_wordlist(wordlist).clone())
            .await
    }

    async fn update_mode<F>(&self, f: F) -> Mode
    where
        F: FnOnce(&mut aivast_core::ModeSelector) -> Mode,
    {
        let mode = f(self.services.context.lock().await.selector_mut());
        self.services.surface.mode_changed(&mode);
        mode
    }

    pub async fn mode(&self) -> Mode {
        self.services.context.lock().await.mode().clone()
    }

    pub async fn current_session_id(&self) -> Option<SessionId> {
        self.services.context.lock().await.session_id().cloned()
    }

    pub fn is_guest(&self) -> bool {
        self.services.config.guest
    }

    // Sessions

    /// Clears the surface and starts over without a session.
    pub async fn new_conversation(&self) {
        self.services.apply_orphan_policy().await;
        let mode = {
            let mut context = self.services.context.lock().await;
            context.start_new_conversation();
            context.mode().clone()
        };
        self.services.surface.clear();
        self.services.surface.mode_changed(&mode);
        tracing::info!("[Conversation] Started a new conversation");
    }

    /// Fetches the session list, most recent first. Guests have none.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        if self.is_guest() {
            return Ok(Vec::new());
        }
        let mut sessions = self.services.backend.list_sessions().await?;
        sort_recent_first(&mut sessions);
        self.services.surface.sessions_changed(&sessions);
        Ok(sessions)
    }

    /// Best-effort variant of [`Self::list_sessions`].
    pub async fn refresh_sessions(&self) {
        let snapshot = self.services.snapshot().await;
        self.services.refresh_sessions(&snapshot).await;
    }

    pub async fn rename_session(&self, session_id: &SessionId, title: &str) -> Result<SessionSummary> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AivastError::internal("Session title must not be empty"));
        }
        let renamed = self
            .services
            .backend
            .rename_session(session_id, title)
            .await?;
        tracing::info!("[Conversation] Renamed session {} to {:?}", session_id, title);
        self.refresh_sessions().await;
        Ok(renamed)
    }

    /// Deletes a session. Deleting the current one resets the surface.
    pub async fn delete_session(&self, session_id: &SessionId) -> Result<()> {
        self.services.backend.delete_session(session_id).await?;
        tracing::info!("[Conversation] Deleted session {}", session_id);

        let was_current = self.current_session_id().await.as_ref() == Some(session_id);
        if was_current {
            self.new_conversation().await;
        }
        self.refresh_sessions().await;
        Ok(())
    }

    /// Replays a persisted session; see [`TimelineReconstructor::render_session`].
    pub async fn render_session(&self, session_id: &SessionId) -> Result<ReplaySummary> {
        self.timeline.render_session(session_id).await
    }

    // Lifecycle

    /// Scans currently being polled.
    pub async fn active_scans(&self) -> Vec<ScanId> {
        self.services.pollers.active().await
    }

    /// Stops every poller and pending directive.
    pub async fn shutdown(&self) {
        self.services.shutdown.cancel();
        let cancelled = self.services.pollers.cancel_all().await;
        tracing::debug!("[Conversation] Shut down with {} live poller(s)", cancelled);
    }
}
