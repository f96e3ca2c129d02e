use crate::context::{AuthMode, ContextSnapshot, ConversationContext};
use crate::poller::PollRegistry;
use aivast_core::render::{MarkupRenderer, RenderSurface};
use aivast_core::session::sort_recent_first;
use aivast_core::{ClientConfig, OrphanPolicy, ScanBackend};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Collaborators and state shared by every component of one conversation
/// surface.
pub(crate) struct Services {
    pub backend: Arc<dyn ScanBackend>,
    pub surface: Arc<dyn RenderSurface>,
    pub markup: Arc<dyn MarkupRenderer>,
    pub config: ClientConfig,
    pub context: Mutex<ConversationContext>,
    pub pollers: PollRegistry,
    /// Parent of every poller and delayed directive token.
    pub shutdown: CancellationToken,
}

impl Services {
    pub fn new(
        backend: Arc<dyn ScanBackend>,
        surface: Arc<dyn RenderSurface>,
        markup: Arc<dyn MarkupRenderer>,
        config: ClientConfig,
    ) -> Self {
        let auth = if config.guest {
            AuthMode::Guest
        } else {
            AuthMode::Authenticated
        };
        let shutdown = CancellationToken::new();
        Self {
            backend,
            surface,
            markup,
            config,
            context: Mutex::new(ConversationContext::new(auth)),
            pollers: PollRegistry::new(shutdown.clone()),
            shutdown,
        }
    }

    pub async fn snapshot(&self) -> ContextSnapshot {
        self.context.lock().await.snapshot()
    }

    pub fn to_markup(&self, text: &str) -> String {
        self.markup.to_markup(text)
    }

    /// Cancels live pollers when the configuration asks for it. Called
    /// before the conversation switches away from its current session.
    pub async fn apply_orphan_policy(&self) {
        if self.config.orphan_policy == OrphanPolicy::CancelOnSwitch {
            let cancelled = self.pollers.cancel_all().await;
            if cancelled > 0 {
                tracing::info!("[Conversation] Cancelled {} orphaned poller(s)", cancelled);
            }
        }
    }

    /// Re-fetches the session list and hands it to the surface.
    ///
    /// Best effort: failures are logged and otherwise ignored. Guests have
    /// no session list.
    pub async fn refresh_sessions(&self, snapshot: &ContextSnapshot) {
        if snapshot.is_guest() {
            return;
        }
        match self.backend.list_sessions().await {
            Ok(mut sessions) => {
                sort_recent_first(&mut sessions);
                self.surface.sessions_changed(&sessions);
            }
            Err(e) => {
                tracing::warn!("[Conversation] Failed to refresh session list: {}", e);
            }
        }
    }
}
