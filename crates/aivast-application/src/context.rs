//! Conversation context: the mutable state of the conversation surface.
//!
//! All state the dispatcher, poller and chat paths touch lives here. Long
//! running operations capture a [`ContextSnapshot`] when they start and only
//! write back while the context is still in the same epoch, so a response
//! arriving after the user moved to another session never updates the new
//! one.

use aivast_core::session::GuestHistory;
use aivast_core::{Mode, ModeSelector, SessionId};

/// Whether the user has an authenticated session with the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Authenticated,
    Guest,
}

/// Immutable view of the context taken when an operation starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub epoch: u64,
    pub session_id: Option<SessionId>,
    pub auth: AuthMode,
}

impl ContextSnapshot {
    pub fn is_guest(&self) -> bool {
        self.auth == AuthMode::Guest
    }
}

#[derive(Debug)]
pub struct ConversationContext {
    auth: AuthMode,
    epoch: u64,
    session_id: Option<SessionId>,
    selector: ModeSelector,
    guest_history: GuestHistory,
}

impl ConversationContext {
    pub fn new(auth: AuthMode) -> Self {
        Self {
            auth,
            epoch: 0,
            session_id: None,
            selector: ModeSelector::new(),
            guest_history: GuestHistory::new(),
        }
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            epoch: self.epoch,
            session_id: self.session_id.clone(),
            auth: self.auth,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn mode(&self) -> &Mode {
        self.selector.mode()
    }

    pub fn selector_mut(&mut self) -> &mut ModeSelector {
        &mut self.selector
    }

    pub fn guest_history(&self) -> &GuestHistory {
        &self.guest_history
    }

    /// Returns true while nothing has switched the conversation since `snapshot`.
    pub fn is_current(&self, snapshot: &ContextSnapshot) -> bool {
        self.epoch == snapshot.epoch
    }

    /// Adopts a session id handed out by the backend.
    ///
    /// Ignored when the context moved on since `snapshot`, in guest mode, or
    /// when a different session is already current.
    pub fn adopt_session(&mut self, snapshot: &ContextSnapshot, session_id: SessionId) -> bool {
        if !self.is_current(snapshot) || self.auth == AuthMode::Guest {
            return false;
        }
        match &self.session_id {
            Some(current) if *current == session_id => false,
            Some(current) => {
                tracing::warn!(
                    "[Context] Backend returned session {} while {} is current; keeping current",
                    session_id,
                    current
                );
                false
            }
            None => {
                tracing::info!("[Context] Adopted session {}", session_id);
                self.session_id = Some(session_id);
                true
            }
        }
    }

    /// Switches to another session (or none), starting a new epoch.
    ///
    /// Resets the mode to direct chat.
    pub fn switch_session(&mut self, session_id: Option<SessionId>) -> ContextSnapshot {
        self.epoch += 1;
        self.session_id = session_id;
        self.selector.reset();
        self.snapshot()
    }

    /// Starts a fresh conversation: no session, empty guest history.
    pub fn start_new_conversation(&mut self) -> ContextSnapshot {
        self.guest_history.clear();
        self.switch_session(None)
    }

    /// Records a guest exchange unless the conversation moved on.
    pub fn push_guest_exchange(
        &mut self,
        snapshot: &ContextSnapshot,
        user: &str,
        assistant: &str,
    ) -> bool {
        if !self.is_current(snapshot) {
            return false;
        }
        self.guest_history.push_exchange(user, assistant);
        true
    }

    /// Appends a guest system note unless the conversation moved on.
    pub fn push_guest_note(&mut self, snapshot: &ContextSnapshot, note: String) -> bool {
        if !self.is_current(snapshot) {
            return false;
        }
        self.guest_history.push_system_note(note);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aivast_core::Tool;

    #[test]
    fn test_adopts_first_session_only_in_same_epoch() {
        let mut context = ConversationContext::new(AuthMode::Authenticated);
        let before = context.snapshot();

        assert!(context.adopt_session(&before, SessionId::new("1")));
        assert!(!context.adopt_session(&before, SessionId::new("1")));
        assert!(!context.adopt_session(&before, SessionId::new("2")));
        assert_eq!(context.session_id(), Some(&SessionId::new("1")));
    }

    #[test]
    fn test_stale_snapshot_cannot_adopt() {
        let mut context = ConversationContext::new(AuthMode::Authenticated);
        let stale = context.snapshot();
        context.start_new_conversation();

        assert!(!context.adopt_session(&stale, SessionId::new("7")));
        assert_eq!(context.session_id(), None);
    }

    #[test]
    fn test_guest_never_adopts_sessions() {
        let mut context = ConversationContext::new(AuthMode::Guest);
        let snapshot = context.snapshot();
        assert!(!context.adopt_session(&snapshot, SessionId::new("1")));
    }

    #[test]
    fn test_switch_resets_mode_and_bumps_epoch() {
        let mut context = ConversationContext::new(AuthMode::Authenticated);
        context.selector_mut().select_tool(Tool::Nmap);

        let snapshot = context.switch_session(Some(SessionId::new("3")));
        assert_eq!(snapshot.epoch, 1);
        assert_eq!(snapshot.session_id, Some(SessionId::new("3")));
        assert!(context.mode().is_direct_chat());
    }

    #[test]
    fn test_guest_history_writes_respect_epoch() {
        let mut context = ConversationContext::new(AuthMode::Guest);
        let snapshot = context.snapshot();
        assert!(context.push_guest_exchange(&snapshot, "hi", "hello"));
        assert!(context.push_guest_note(&snapshot, "Scan executed".to_string()));
        assert_eq!(context.guest_history().len(), 3);

        context.start_new_conversation();
        assert!(context.guest_history().is_empty());
        assert!(!context.push_guest_note(&snapshot, "late".to_string()));
        assert!(context.guest_history().is_empty());
    }
}
