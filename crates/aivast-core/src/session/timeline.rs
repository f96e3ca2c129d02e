//! Timeline events of a persisted session.

use crate::ids::ScanId;
use crate::scan::{CommandLine, ScanAnalysis, ScanStatus};
use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    /// Synthetic notes, e.g. scan summaries kept in guest history.
    System,
}

/// A chat message as persisted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

fn completed() -> ScanStatus {
    ScanStatus::Completed
}

/// A scan as persisted by the backend.
///
/// Historical records written before scans carried a status are completed
/// scans, hence the default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: ScanId,
    pub target: String,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default = "completed")]
    pub status: ScanStatus,
    #[serde(default, alias = "reason")]
    pub rationale: Option<String>,
    #[serde(default)]
    pub command: CommandLine,
    #[serde(default)]
    pub analysis: Option<ScanAnalysis>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One entry of a session timeline, in backend order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimelineEvent {
    Message(TimelineMessage),
    Scan(ScanRecord),
}
