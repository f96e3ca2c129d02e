//! Scan polling.
//!
//! Each scan created by the dispatcher gets one poller task that asks the
//! backend for the scan's status on a fixed cadence and drives the scan's
//! placeholder to its final rendering:
//!
//! ```text
//! Pending/Running --(completed)--> Completed
//!                 --(failed)-----> Failed
//!                 --(call fault)-> TransportError
//! ```
//!
//! Polls for one scan are strictly sequential: the next status call is only
//! made after the previous one settled and the period elapsed.

use crate::context::ContextSnapshot;
use crate::placeholder::Placeholder;
use crate::scan_view::{self, ScanView};
use crate::services::Services;
use aivast_core::scan::ScanStatus;
use aivast_core::{AivastError, ScanId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How a poller ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    Failed,
    TransportError,
    /// Stopped by session switch policy or shutdown.
    Cancelled,
}

/// Result of [`ScanPoller::start`].
#[derive(Debug)]
pub enum PollStart {
    Started(JoinHandle<PollOutcome>),
    /// A poller for this scan already runs; the placeholder is handed back.
    AlreadyPolling(Placeholder),
}

/// Correlates a scan with what it was dispatched for.
#[derive(Debug, Clone)]
pub struct ScanBinding {
    pub scan_id: ScanId,
    pub target: String,
    pub tool: String,
    pub snapshot: ContextSnapshot,
}

struct PollEntry {
    generation: u64,
    token: CancellationToken,
    rebind: mpsc::UnboundedSender<Placeholder>,
}

/// Live pollers keyed by scan id. At most one entry per scan.
pub struct PollRegistry {
    entries: Mutex<HashMap<ScanId, PollEntry>>,
    root: CancellationToken,
    next_generation: std::sync::atomic::AtomicU64,
}

impl PollRegistry {
    pub fn new(root: CancellationToken) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            root,
            next_generation: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Registers a poller for `scan_id` unless one is already live.
    ///
    /// An entry whose task dropped its rebind receiver is stale and gets
    /// replaced.
    async fn register(
        &self,
        scan_id: &ScanId,
    ) -> Option<(u64, CancellationToken, mpsc::UnboundedReceiver<Placeholder>)> {
        let mut entries = self.entries.lock().await;
        if entries.get(scan_id).is_some_and(|e| !e.rebind.is_closed()) {
            return None;
        }
        let generation = self
            .next_generation
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let token = self.root.child_token();
        let (rebind, rebind_rx) = mpsc::unbounded_channel();
        entries.insert(
            scan_id.clone(),
            PollEntry {
                generation,
                token: token.clone(),
                rebind,
            },
        );
        Some((generation, token, rebind_rx))
    }

    async fn finish(&self, scan_id: &ScanId, generation: u64) {
        let mut entries = self.entries.lock().await;
        if entries.get(scan_id).is_some_and(|e| e.generation == generation) {
            entries.remove(scan_id);
        }
    }

    /// Moves a live poller's output to a new placeholder.
    ///
    /// Gives the placeholder back when no poller runs for `scan_id`.
    pub async fn rebind(&self, scan_id: &ScanId, placeholder: Placeholder) -> Result<(), Placeholder> {
        let entries = self.entries.lock().await;
        match entries.get(scan_id) {
            Some(entry) => entry.rebind.send(placeholder).map_err(|e| e.0),
            None => Err(placeholder),
        }
    }

    /// Cancels every live poller.
    pub async fn cancel_all(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let count = entries.len();
        for (scan_id, entry) in entries.drain() {
            tracing::debug!("[ScanPoller] Cancelling poller for scan {}", scan_id);
            entry.token.cancel();
        }
        count
    }

    /// Ids of the scans currently being polled.
    pub async fn active(&self) -> Vec<ScanId> {
        let mut ids: Vec<ScanId> = self.entries.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Final rendering of a scan bubble.
#[derive(Debug, Clone)]
enum Verdict {
    Resolved(String),
    Failed(String),
}

impl Verdict {
    fn apply(&self, placeholder: &mut Placeholder) {
        match self {
            Self::Resolved(content) => placeholder.resolve(content),
            Self::Failed(content) => placeholder.fail(content),
        };
    }
}

/// Spawns and runs scan pollers.
#[derive(Clone)]
pub struct ScanPoller {
    services: Arc<Services>,
}

impl ScanPoller {
    pub(crate) fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    /// Starts polling `binding.scan_id`, updating `placeholder`.
    ///
    /// Idempotent per scan id: when a poller already runs the call is a
    /// no-op and the placeholder is returned to the caller.
    pub async fn start(&self, binding: ScanBinding, placeholder: Placeholder) -> PollStart {
        let Some((generation, token, mut rebind_rx)) =
            self.services.pollers.register(&binding.scan_id).await
        else {
            tracing::debug!(
                "[ScanPoller] Scan {} is already being polled",
                binding.scan_id
            );
            return PollStart::AlreadyPolling(placeholder);
        };

        tracing::info!(
            "[ScanPoller] Polling scan {} ({} on {})",
            binding.scan_id,
            binding.tool,
            binding.target
        );

        let poller = self.clone();
        PollStart::Started(tokio::spawn(async move {
            let scan_id = binding.scan_id.clone();
            let (outcome, verdict) = poller
                .run(&binding, placeholder, token, &mut rebind_rx)
                .await;

            // Unregister before draining: from here on a rebind either is
            // already queued or finds no entry and starts its own poller.
            poller.services.pollers.finish(&scan_id, generation).await;
            rebind_rx.close();
            while let Ok(mut late) = rebind_rx.try_recv() {
                if let Some(verdict) = &verdict {
                    tracing::debug!(
                        "[ScanPoller] Scan {} settled while a bubble was being rebound",
                        scan_id
                    );
                    verdict.apply(&mut late);
                }
            }

            tracing::info!("[ScanPoller] Scan {} finished: {:?}", scan_id, outcome);
            outcome
        }))
    }

    /// Starts polling, or moves the live poller for the same scan onto
    /// `placeholder`. Returns the task handle only when a new poller started.
    pub async fn start_or_rebind(
        &self,
        binding: ScanBinding,
        mut placeholder: Placeholder,
    ) -> Option<JoinHandle<PollOutcome>> {
        loop {
            match self.start(binding.clone(), placeholder).await {
                PollStart::Started(handle) => return Some(handle),
                PollStart::AlreadyPolling(returned) => {
                    match self.services.pollers.rebind(&binding.scan_id, returned).await {
                        Ok(()) => return None,
                        Err(returned) => {
                            tracing::debug!(
                                "[ScanPoller] Poller for scan {} ended during rebind; starting over",
                                binding.scan_id
                            );
                            placeholder = returned;
                        }
                    }
                }
            }
        }
    }

    async fn run(
        &self,
        binding: &ScanBinding,
        mut placeholder: Placeholder,
        token: CancellationToken,
        rebind_rx: &mut mpsc::UnboundedReceiver<Placeholder>,
    ) -> (PollOutcome, Option<Verdict>) {
        let period = self.services.config.poll_interval();

        loop {
            tokio::select! {
                _ = token.cancelled() => return (PollOutcome::Cancelled, None),
                _ = tokio::time::sleep(period) => {}
            }

            while let Ok(next) = rebind_rx.try_recv() {
                tracing::debug!("[ScanPoller] Scan {} rebound to a new bubble", binding.scan_id);
                placeholder = next;
            }

            let result = tokio::select! {
                _ = token.cancelled() => return (PollOutcome::Cancelled, None),
                result = self.services.backend.scan_status(&binding.scan_id) => result,
            };

            let (outcome, verdict) = match result {
                Ok(report) if !report.status.is_terminal() => {
                    placeholder.show_progress(&scan_view::in_progress(&binding.tool));
                    continue;
                }
                Ok(report) if report.status == ScanStatus::Completed => {
                    let view = ScanView::from_report(&report, &binding.target, &binding.tool);
                    self.record_guest_note(binding, &view).await;
                    let content = self.services.to_markup(&scan_view::completed(&view));
                    (PollOutcome::Completed, Verdict::Resolved(content))
                }
                Ok(report) => (
                    PollOutcome::Failed,
                    Verdict::Failed(scan_view::failed(report.error.as_deref())),
                ),
                Err(AivastError::MalformedResponse(message)) => {
                    tracing::warn!(
                        "[ScanPoller] Scan {} returned a malformed status: {}",
                        binding.scan_id,
                        message
                    );
                    (PollOutcome::Failed, Verdict::Failed(scan_view::failed(None)))
                }
                Err(e) => {
                    tracing::error!(
                        "[ScanPoller] Error polling scan {}: {}",
                        binding.scan_id,
                        e
                    );
                    (
                        PollOutcome::TransportError,
                        Verdict::Failed(scan_view::POLL_FAILURE_NOTICE.to_string()),
                    )
                }
            };

            // A bubble rebound during the status call takes the result too.
            while let Ok(next) = rebind_rx.try_recv() {
                verdict.apply(&mut placeholder);
                placeholder = next;
            }
            verdict.apply(&mut placeholder);
            self.services.refresh_sessions(&binding.snapshot).await;
            return (outcome, Some(verdict));
        }
    }

    async fn record_guest_note(&self, binding: &ScanBinding, view: &ScanView<'_>) {
        if !binding.snapshot.is_guest() {
            return;
        }
        let note = scan_view::guest_note(view);
        let mut context = self.services.context.lock().await;
        if !context.push_guest_note(&binding.snapshot, note) {
            tracing::debug!(
                "[ScanPoller] Guest conversation changed; dropping note for scan {}",
                binding.scan_id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AuthMode;
    use crate::testing::{MockBackend, RecordingSurface, TestHarness, status};
    use aivast_core::render::BubbleRole;
    use serde_json::json;
    use std::time::Duration;

    fn binding(scan_id: &str, snapshot: ContextSnapshot) -> ScanBinding {
        ScanBinding {
            scan_id: ScanId::new(scan_id),
            target: "example.com".to_string(),
            tool: "nmap".to_string(),
            snapshot,
        }
    }

    async fn start(harness: &TestHarness, scan_id: &str) -> JoinHandle<PollOutcome> {
        let snapshot = harness.services.snapshot().await;
        let placeholder = Placeholder::open(harness.services.surface.clone(), "Initializing nmap scan...");
        match harness
            .poller()
            .start(binding(scan_id, snapshot), placeholder)
            .await
        {
            PollStart::Started(handle) => handle,
            PollStart::AlreadyPolling(_) => panic!("expected a new poller"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_scan_renders_summary_and_refreshes_sessions() {
        let harness = TestHarness::authenticated();
        harness.backend.push_status("1", status(json!({"status": "running"})));
        harness.backend.push_status("1", status(json!({"status": "running"})));
        harness.backend.push_status(
            "1",
            status(json!({"status": "completed", "analysis": {"summary": "No issues found"}})),
        );

        let outcome = start(&harness, "1").await.await.unwrap();

        assert_eq!(outcome, PollOutcome::Completed);
        assert_eq!(harness.backend.status_calls(), 3);
        // one progress refresh, one final rendering
        assert_eq!(harness.surface.update_count(), 2);
        let last = harness.surface.last_content();
        assert!(last.contains("example.com"));
        assert!(last.contains("nmap"));
        assert!(last.contains("No issues found"));
        assert_eq!(harness.backend.list_sessions_calls(), 1);
        assert!(harness.services.pollers.active().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_fixed_cadence() {
        let harness = TestHarness::authenticated();
        harness.backend.push_status("1", status(json!({"status": "pending"})));
        harness.backend.push_status("1", status(json!({"status": "completed"})));

        let handle = start(&harness, "1").await;

        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert_eq!(harness.backend.status_calls(), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(harness.backend.status_calls(), 1);

        assert_eq!(handle.await.unwrap(), PollOutcome::Completed);
        assert_eq!(harness.backend.status_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_uses_backend_error() {
        let harness = TestHarness::authenticated();
        harness.backend.push_status(
            "2",
            status(json!({"status": "failed", "error": "nmap: host unreachable"})),
        );

        assert_eq!(start(&harness, "2").await.await.unwrap(), PollOutcome::Failed);
        assert_eq!(harness.surface.last_content(), "Scan failed: nmap: host unreachable");
        assert_eq!(harness.backend.list_sessions_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_fault_is_terminal() {
        let harness = TestHarness::authenticated();
        harness.backend.push_status_error("3", AivastError::transport("connection reset"));
        harness.backend.push_status("3", status(json!({"status": "completed"})));

        assert_eq!(
            start(&harness, "3").await.await.unwrap(),
            PollOutcome::TransportError
        );
        assert_eq!(harness.surface.last_content(), scan_view::POLL_FAILURE_NOTICE);
        assert_eq!(harness.backend.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_for_same_scan_is_noop() {
        let harness = TestHarness::authenticated();
        harness.backend.push_status("4", status(json!({"status": "completed"})));

        let handle = start(&harness, "4").await;
        let snapshot = harness.services.snapshot().await;
        let second = Placeholder::open(harness.services.surface.clone(), "again");
        let result = harness
            .poller()
            .start(binding("4", snapshot), second)
            .await;

        assert!(matches!(result, PollStart::AlreadyPolling(_)));
        assert_eq!(harness.services.pollers.active().await, vec![ScanId::new("4")]);
        handle.await.unwrap();
        assert_eq!(harness.backend.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebind_moves_updates_to_new_bubble() {
        let harness = TestHarness::authenticated();
        harness.backend.push_status("5", status(json!({"status": "running"})));
        harness.backend.push_status("5", status(json!({"status": "completed"})));

        let handle = start(&harness, "5").await;
        let replacement =
            Placeholder::open_in_progress(harness.services.surface.clone(), "Running nmap scan...");
        let new_handle = replacement.handle();
        assert!(harness
            .services
            .pollers
            .rebind(&ScanId::new("5"), replacement)
            .await
            .is_ok());

        handle.await.unwrap();
        assert_eq!(harness.surface.last_update_handle(), Some(new_handle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bubble_rebound_during_final_status_read_is_resolved() {
        let harness = TestHarness::authenticated();
        harness.backend.set_status_delay(Duration::from_secs(1));
        harness.backend.push_status(
            "5",
            status(json!({"status": "completed", "analysis": {"summary": "Port 443 open"}})),
        );

        let handle = start(&harness, "5").await;
        // the status call is in flight between 3s and 4s
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(harness.backend.status_calls(), 1);

        let replacement =
            Placeholder::open_in_progress(harness.services.surface.clone(), "Running nmap scan... (in progress)");
        let replacement_handle = replacement.handle();
        let snapshot = harness.services.snapshot().await;
        let restarted = harness
            .poller()
            .start_or_rebind(binding("5", snapshot), replacement)
            .await;

        assert!(restarted.is_none());
        assert_eq!(handle.await.unwrap(), PollOutcome::Completed);
        let content = harness.surface.content_of(replacement_handle).unwrap();
        assert!(content.contains("Port 443 open"));
        assert_eq!(harness.backend.status_calls(), 1);
        assert!(harness.services.pollers.active().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebind_after_poller_finished_starts_fresh_poller() {
        let harness = TestHarness::authenticated();
        harness.backend.push_status("8", status(json!({"status": "failed", "error": "boom"})));
        assert_eq!(start(&harness, "8").await.await.unwrap(), PollOutcome::Failed);

        harness.backend.push_status(
            "8",
            status(json!({"status": "completed", "analysis": {"summary": "Retried fine"}})),
        );
        let replacement =
            Placeholder::open_in_progress(harness.services.surface.clone(), "Running nmap scan... (in progress)");
        let replacement_handle = replacement.handle();
        let snapshot = harness.services.snapshot().await;
        let handle = harness
            .poller()
            .start_or_rebind(binding("8", snapshot), replacement)
            .await
            .expect("a new poller for a finished scan");

        assert_eq!(handle.await.unwrap(), PollOutcome::Completed);
        assert!(harness
            .surface
            .content_of(replacement_handle)
            .unwrap()
            .contains("Retried fine"));
        assert_eq!(harness.backend.status_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_stops_pollers() {
        let harness = TestHarness::authenticated();
        let handle = start(&harness, "6").await;

        assert_eq!(harness.services.pollers.cancel_all().await, 1);
        assert_eq!(handle.await.unwrap(), PollOutcome::Cancelled);
        assert_eq!(harness.backend.status_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guest_completion_appends_system_note() {
        let harness = TestHarness::new(AuthMode::Guest, MockBackend::default(), RecordingSurface::default());
        harness.backend.push_status(
            "7",
            status(json!({"status": "completed", "analysis": {"summary": "Port 22 open"}})),
        );

        start(&harness, "7").await.await.unwrap();

        let context = harness.services.context.lock().await;
        let turns = context.guest_history().turns();
        assert_eq!(turns.len(), 1);
        assert!(turns[0].content.contains("Port 22 open"));
        assert_eq!(harness.backend.list_sessions_calls(), 0);
        assert_eq!(harness.surface.roles(), vec![BubbleRole::Assistant]);
    }
}
