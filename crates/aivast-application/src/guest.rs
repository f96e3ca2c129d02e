//! Guest chat fallback.
//!
//! Guests have no server-side session. The client keeps the history and
//! sends all of it with every message; the backend answers HTTP 429 once
//! the guest quota is used up.

use crate::chat::{Reply, present_reply};
use crate::context::ContextSnapshot;
use crate::dispatcher::ScanDispatcher;
use crate::placeholder::Placeholder;
use crate::scan_view;
use crate::services::Services;
use aivast_core::session::GuestChatRequest;
use aivast_core::{AivastError, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct GuestFallback {
    services: Arc<Services>,
    dispatcher: ScanDispatcher,
}

impl GuestFallback {
    pub(crate) fn new(services: Arc<Services>, dispatcher: ScanDispatcher) -> Self {
        Self {
            services,
            dispatcher,
        }
    }

    /// Sends `message` with the current guest history.
    ///
    /// The exchange is appended to the history only on success. A rate
    /// limit renders the login prompt and leaves the history untouched.
    pub async fn send(&self, snapshot: &ContextSnapshot, message: &str) -> Result<Reply> {
        let history = {
            let context = self.services.context.lock().await;
            context.guest_history().turns().to_vec()
        };
        let mut placeholder = Placeholder::open(self.services.surface.clone(), scan_view::THINKING);

        let request = GuestChatRequest {
            message: message.to_string(),
            history,
        };

        let reply = match self.services.backend.guest_chat(&request).await {
            Ok(reply) => reply,
            Err(AivastError::RateLimited) => {
                tracing::info!("[GuestChat] Guest rate limit reached");
                placeholder.fail(scan_view::RATE_LIMIT_NOTICE);
                return Err(AivastError::RateLimited);
            }
            Err(e) => {
                tracing::warn!("[GuestChat] Guest chat failed: {}", e);
                placeholder.fail(&scan_view::chat_failed(&e));
                return Err(e);
            }
        };

        let recorded = self.services.context.lock().await.push_guest_exchange(
            snapshot,
            message,
            &reply.ai_response,
        );
        if !recorded {
            tracing::debug!("[GuestChat] Conversation changed; reply not added to history");
        }

        Ok(present_reply(
            &self.services,
            &self.dispatcher,
            snapshot,
            placeholder,
            &reply.ai_response,
        ))
    }
}
