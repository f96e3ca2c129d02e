//! Authenticated chat and assistant reply presentation.

use crate::context::ContextSnapshot;
use crate::dispatcher::{ScanDispatcher, ScanTask};
use crate::placeholder::Placeholder;
use crate::scan_view;
use crate::services::Services;
use aivast_core::Result;
use aivast_core::directive::{AutonomousDirective, extract_directive};
use aivast_core::render::BubbleHandle;
use aivast_core::session::ChatRequest;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// An assistant reply as displayed.
#[derive(Debug)]
pub struct Reply {
    pub bubble: BubbleHandle,
    /// Reply text with any directive removed.
    pub text: String,
    pub directive: Option<ScheduledDirective>,
}

/// An autonomous scan waiting for its dispatch delay.
#[derive(Debug)]
pub struct ScheduledDirective {
    pub directive: AutonomousDirective,
    pub handle: JoinHandle<Option<ScanTask>>,
}

/// Strips the directive from `raw`, renders the rest into `placeholder`
/// and schedules the directive's scan.
pub(crate) fn present_reply(
    services: &Services,
    dispatcher: &ScanDispatcher,
    snapshot: &ContextSnapshot,
    mut placeholder: Placeholder,
    raw: &str,
) -> Reply {
    let extraction = extract_directive(raw);
    placeholder.resolve(&services.to_markup(&extraction.cleaned_text));

    let directive = extraction.directive.map(|directive| ScheduledDirective {
        handle: dispatcher.schedule_directive(snapshot.clone(), directive.clone()),
        directive,
    });

    Reply {
        bubble: placeholder.handle(),
        text: extraction.cleaned_text,
        directive,
    }
}

#[derive(Clone)]
pub struct ChatResponder {
    services: Arc<Services>,
    dispatcher: ScanDispatcher,
}

impl ChatResponder {
    pub(crate) fn new(services: Arc<Services>, dispatcher: ScanDispatcher) -> Self {
        Self {
            services,
            dispatcher,
        }
    }

    /// Sends `message` to the session chat endpoint.
    ///
    /// The first reply of a fresh conversation carries the session the
    /// backend created for it; that id is adopted unless the user already
    /// moved on.
    pub async fn send(&self, snapshot: &ContextSnapshot, message: &str) -> Result<Reply> {
        let mut placeholder = Placeholder::open(self.services.surface.clone(), scan_view::THINKING);
        let request = ChatRequest {
            message: message.to_string(),
            session_id: snapshot.session_id.clone(),
        };

        let reply = match self.services.backend.chat(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("[Chat] Chat request failed: {}", e);
                placeholder.fail(&scan_view::chat_failed(&e));
                return Err(e);
            }
        };

        if let Some(session_id) = reply.session_id {
            self.services
                .context
                .lock()
                .await
                .adopt_session(snapshot, session_id);
        }

        let reply = present_reply(
            &self.services,
            &self.dispatcher,
            snapshot,
            placeholder,
            &reply.ai_message.content,
        );
        self.services.refresh_sessions(snapshot).await;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;
    use aivast_core::session::{AiMessage, ChatReply};
    use aivast_core::{AivastError, SessionId};

    fn reply(session_id: Option<&str>, content: &str) -> ChatReply {
        ChatReply {
            session_id: session_id.map(SessionId::new),
            ai_message: AiMessage {
                content: content.to_string(),
            },
        }
    }

    fn responder(harness: &TestHarness) -> ChatResponder {
        let dispatcher = ScanDispatcher::new(harness.services.clone());
        ChatResponder::new(harness.services.clone(), dispatcher)
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_replaces_thinking_bubble() {
        let harness = TestHarness::authenticated();
        harness
            .backend
            .push_chat(Ok(reply(Some("5"), "Port 80 is usually HTTP.")));
        let snapshot = harness.services.snapshot().await;

        let reply = responder(&harness).send(&snapshot, "what is port 80?").await.unwrap();

        assert!(reply.directive.is_none());
        assert_eq!(
            harness.surface.content_of(reply.bubble).as_deref(),
            Some("Port 80 is usually HTTP.")
        );
        assert_eq!(harness.backend.chat_requests()[0].session_id, None);
        assert_eq!(
            harness.services.context.lock().await.session_id(),
            Some(&SessionId::new("5"))
        );
        assert_eq!(harness.backend.list_sessions_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_session_is_sent_with_message() {
        let harness = TestHarness::authenticated();
        harness
            .services
            .context
            .lock()
            .await
            .switch_session(Some(SessionId::new("8")));
        harness.backend.push_chat(Ok(reply(Some("8"), "ok")));
        let snapshot = harness.services.snapshot().await;

        responder(&harness).send(&snapshot, "hello").await.unwrap();

        assert_eq!(
            harness.backend.chat_requests()[0].session_id,
            Some(SessionId::new("8"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_rendered_inline() {
        let harness = TestHarness::authenticated();
        harness
            .backend
            .push_chat(Err(AivastError::transport("connection refused")));
        let snapshot = harness.services.snapshot().await;

        let err = responder(&harness).send(&snapshot, "hello").await.unwrap_err();

        assert!(err.is_transport());
        assert_eq!(
            harness.surface.last_content(),
            "Sorry, the assistant is unreachable right now. Please try again."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_reply_does_not_adopt_session() {
        let harness = TestHarness::authenticated();
        harness.backend.push_chat(Ok(reply(Some("11"), "late")));
        let stale = harness.services.snapshot().await;
        harness.services.context.lock().await.start_new_conversation();

        responder(&harness).send(&stale, "hello").await.unwrap();

        assert_eq!(harness.services.context.lock().await.session_id(), None);
    }
}
