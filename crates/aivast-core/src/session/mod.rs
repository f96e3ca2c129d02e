//! Session domain module.
//!
//! This module contains the session-side models the client reads from the
//! backend and the volatile guest history.
//!
//! # Module Structure
//!
//! - `model`: Session summaries and details (`SessionSummary`, `SessionDetail`)
//! - `timeline`: Persisted timeline events (`TimelineEvent`, `ScanRecord`)
//! - `chat`: Chat request/response payloads
//! - `guest`: Guest history (`GuestHistory`, `GuestTurn`)

mod chat;
mod guest;
mod model;
mod timeline;

pub use chat::{AiMessage, ChatReply, ChatRequest, GuestChatReply, GuestChatRequest};
pub use guest::{GuestHistory, GuestTurn};
pub use model::{SessionDetail, SessionList, SessionSummary, sort_recent_first};
pub use timeline::{MessageRole, ScanRecord, TimelineEvent, TimelineMessage};
