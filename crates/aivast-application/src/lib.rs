//! Application layer for AIVAST.
//!
//! This crate drives the conversation surface: it decides what a submission
//! does, dispatches and polls scans, runs the chat paths and replays saved
//! sessions. It only talks to the backend and the rendering surface through
//! the traits in `aivast-core`.

pub mod chat;
pub mod context;
pub mod conversation_usecase;
pub mod dispatcher;
pub mod guest;
pub mod placeholder;
pub mod poller;
pub mod scan_view;
mod services;
pub mod timeline;

#[cfg(test)]
mod testing;

pub use chat::{Reply, ScheduledDirective};
pub use context::{AuthMode, ContextSnapshot};
pub use conversation_usecase::{ConversationUseCase, SubmitOutcome};
pub use dispatcher::{ScanOrder, ScanTask};
pub use poller::PollOutcome;
pub use timeline::ReplaySummary;
