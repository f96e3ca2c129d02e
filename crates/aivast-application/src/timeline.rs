//! Session replay.
//!
//! Rebuilds a persisted session on the surface through the same rendering
//! paths live traffic uses. Replay never creates scans or sends chat
//! messages; resolved scans are rendered from their records without asking
//! the backend again.

use crate::context::ContextSnapshot;
use crate::placeholder::Placeholder;
use crate::poller::{ScanBinding, ScanPoller};
use crate::scan_view::{self, ScanView};
use crate::services::Services;
use aivast_core::render::BubbleRole;
use aivast_core::scan::ScanStatus;
use aivast_core::session::{MessageRole, ScanRecord, TimelineEvent};
use aivast_core::{Result, ScanId, SessionId};
use std::sync::Arc;

/// What a replay rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub messages: usize,
    pub scans: usize,
    /// Non-terminal scans whose polling was resumed or rebound.
    pub resumed: Vec<ScanId>,
}

#[derive(Clone)]
pub struct TimelineReconstructor {
    services: Arc<Services>,
    poller: ScanPoller,
}

impl TimelineReconstructor {
    pub(crate) fn new(services: Arc<Services>) -> Self {
        let poller = ScanPoller::new(services.clone());
        Self { services, poller }
    }

    /// Loads `session_id` and replays its timeline in order.
    ///
    /// On a fetch error nothing changes: the current session and surface stay
    /// as they were. Afterwards the loaded session is current and the mode is
    /// back to direct chat.
    pub async fn render_session(&self, session_id: &SessionId) -> Result<ReplaySummary> {
        let detail = self.services.backend.get_session(session_id).await?;

        self.services.apply_orphan_policy().await;
        let snapshot = self
            .services
            .context
            .lock()
            .await
            .switch_session(Some(session_id.clone()));
        self.services.surface.clear();

        let mut summary = ReplaySummary::default();
        for event in &detail.timeline {
            match event {
                TimelineEvent::Message(message) => {
                    let role = match message.role {
                        MessageRole::User => BubbleRole::User,
                        MessageRole::Assistant | MessageRole::System => BubbleRole::Assistant,
                    };
                    self.services
                        .surface
                        .render_bubble(&self.services.to_markup(&message.content), role);
                    summary.messages += 1;
                }
                TimelineEvent::Scan(record) => {
                    if self.replay_scan(record, &snapshot).await {
                        summary.resumed.push(record.id.clone());
                    }
                    summary.scans += 1;
                }
            }
        }

        let mode = self.services.context.lock().await.mode().clone();
        self.services.surface.mode_changed(&mode);

        tracing::info!(
            "[Timeline] Replayed session {}: {} messages, {} scans, {} resumed",
            session_id,
            summary.messages,
            summary.scans,
            summary.resumed.len()
        );
        Ok(summary)
    }

    /// Renders one scan record. Returns true when polling was resumed.
    async fn replay_scan(&self, record: &ScanRecord, snapshot: &ContextSnapshot) -> bool {
        let surface = &self.services.surface;
        match record.status {
            ScanStatus::Completed => {
                let view = ScanView::from_record(record);
                surface.render_bubble(
                    &self.services.to_markup(&scan_view::completed(&view)),
                    BubbleRole::Assistant,
                );
                false
            }
            ScanStatus::Failed => {
                surface.render_bubble(&scan_view::failed_record(record), BubbleRole::Assistant);
                false
            }
            ScanStatus::Pending | ScanStatus::Running | ScanStatus::Unknown => {
                if !self.services.config.resume_pending_on_reload {
                    surface.render_bubble(&scan_view::pending_record(record), BubbleRole::Assistant);
                    return false;
                }

                let tool = scan_view::tool_label(record.tool.as_deref());
                let placeholder =
                    Placeholder::open_in_progress(surface.clone(), &scan_view::in_progress(tool));
                let binding = ScanBinding {
                    scan_id: record.id.clone(),
                    target: record.target.clone(),
                    tool: tool.to_string(),
                    snapshot: snapshot.clone(),
                };
                tracing::debug!("[Timeline] Resuming poll for pending scan {}", record.id);
                self.poller.start_or_rebind(binding, placeholder).await;
                true
            }
        }
    }
}
