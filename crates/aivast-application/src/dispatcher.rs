//! Scan dispatch: turns a target plus the current mode into a backend scan
//! and binds the returned scan id to a poller.

use crate::context::ContextSnapshot;
use crate::placeholder::Placeholder;
use crate::poller::{PollOutcome, ScanBinding, ScanPoller};
use crate::scan_view;
use crate::services::Services;
use aivast_core::directive::AutonomousDirective;
use aivast_core::render::BubbleHandle;
use aivast_core::scan::ScanRequest;
use aivast_core::{AivastError, Mode, Result, ScanId, Tool};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// What to scan and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOrder {
    pub target: String,
    /// `None` lets the backend choose.
    pub tool: Option<Tool>,
    pub deep_scan: bool,
    pub wordlist: Option<String>,
}

impl ScanOrder {
    pub fn from_mode(target: impl Into<String>, mode: &Mode) -> Self {
        Self {
            target: target.into(),
            tool: mode.tool,
            deep_scan: mode.deep_scan,
            wordlist: mode.wordlist.clone(),
        }
    }

    pub fn from_directive(directive: &AutonomousDirective) -> Self {
        Self {
            target: directive.target.clone(),
            tool: directive.tool,
            deep_scan: directive.deep_scan(),
            wordlist: None,
        }
    }
}

/// A created scan and the bubble its poller updates.
#[derive(Debug)]
pub struct ScanTask {
    pub scan_id: ScanId,
    pub bubble: BubbleHandle,
    /// `None` when a poller for this scan id was already running.
    pub poll: Option<JoinHandle<PollOutcome>>,
}

#[derive(Clone)]
pub struct ScanDispatcher {
    services: Arc<Services>,
    poller: ScanPoller,
}

impl ScanDispatcher {
    pub(crate) fn new(services: Arc<Services>) -> Self {
        let poller = ScanPoller::new(services.clone());
        Self { services, poller }
    }

    /// Creates a scan and starts polling it.
    ///
    /// Renders an "Initializing" placeholder before the request is sent. On
    /// failure the placeholder shows an inline notice and no poller starts.
    /// Several scans may be in flight at once.
    pub async fn initiate_scan(&self, snapshot: &ContextSnapshot, order: ScanOrder) -> Result<ScanTask> {
        let target = order.target.trim();
        if target.is_empty() {
            return Err(AivastError::internal("Scan target must not be empty"));
        }

        let mut placeholder = Placeholder::open(
            self.services.surface.clone(),
            &scan_view::initializing(order.tool),
        );

        let request = ScanRequest {
            target: target.to_string(),
            use_ai: true,
            tool: order.tool,
            deep_scan: order.deep_scan,
            custom_wordlist: order.wordlist.filter(|w| !w.trim().is_empty()),
            session_id: if snapshot.is_guest() {
                None
            } else {
                snapshot.session_id.clone()
            },
        };

        tracing::info!(
            "[Dispatcher] Starting {} scan of {} (deep: {})",
            scan_view::tool_name(order.tool),
            target,
            order.deep_scan
        );

        let created = match self.services.backend.create_scan(&request).await {
            Ok(created) => created,
            Err(e) => {
                tracing::warn!("[Dispatcher] Scan creation for {} failed: {}", target, e);
                placeholder.fail(&scan_view::creation_failed(&e));
                return Err(e);
            }
        };

        let Some(scan_id) = created.scan_id else {
            let err = AivastError::malformed("scan creation response carried no scan_id");
            tracing::warn!("[Dispatcher] {}", err);
            placeholder.fail(&scan_view::creation_failed(&err));
            return Err(err);
        };

        if let Some(session_id) = created.session_id {
            let adopted = self
                .services
                .context
                .lock()
                .await
                .adopt_session(snapshot, session_id);
            if adopted {
                self.services.refresh_sessions(snapshot).await;
            }
        }

        let bubble = placeholder.handle();
        let binding = ScanBinding {
            scan_id: scan_id.clone(),
            target: target.to_string(),
            tool: scan_view::tool_name(order.tool).to_string(),
            snapshot: snapshot.clone(),
        };
        let poll = self.poller.start_or_rebind(binding, placeholder).await;

        Ok(ScanTask {
            scan_id,
            bubble,
            poll,
        })
    }

    /// Dispatches `directive` after the configured delay.
    ///
    /// The scan is dropped when the conversation switched in the meantime or
    /// the surface shut down.
    pub fn schedule_directive(
        &self,
        snapshot: ContextSnapshot,
        directive: AutonomousDirective,
    ) -> JoinHandle<Option<ScanTask>> {
        let dispatcher = self.clone();
        let delay = self.services.config.directive_delay();
        let token = self.services.shutdown.child_token();

        tracing::debug!(
            "[Dispatcher] Autonomous scan of {} scheduled in {:?}",
            directive.target,
            delay
        );

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }

            let current = {
                let context = dispatcher.services.context.lock().await;
                context.is_current(&snapshot).then(|| context.snapshot())
            };
            let Some(current) = current else {
                tracing::debug!(
                    "[Dispatcher] Conversation changed; dropping autonomous scan of {}",
                    directive.target
                );
                return None;
            };

            dispatcher
                .initiate_scan(&current, ScanOrder::from_directive(&directive))
                .await
                .ok()
        })
    }
}
