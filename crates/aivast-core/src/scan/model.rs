//! Scan request and status payloads.

use crate::ids::{ScanId, SessionId};
use crate::mode::Tool;
use crate::scan::analysis::ScanAnalysis;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Lifecycle status reported by the backend for a scan job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
    /// Any status this client does not know yet; treated as still running.
    #[serde(other)]
    Unknown,
}

impl ScanStatus {
    /// Returns true for statuses from which no further transition occurs.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Body of `POST /scans`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    pub target: String,
    pub use_ai: bool,
    /// `None` lets the backend planner choose.
    pub tool: Option<Tool>,
    pub deep_scan: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_wordlist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// Response of `POST /scans`.
///
/// `scan_id` is optional on the wire; a response without one is treated as
/// a failed creation by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScanCreated {
    #[serde(default)]
    pub scan_id: Option<ScanId>,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

/// Executed command line, sent either as one string or as argv.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandLine(pub Vec<String>);

impl CommandLine {
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|part| part.trim().is_empty())
    }

    /// The command joined for display.
    pub fn display(&self) -> String {
        self.0.join(" ")
    }
}

impl<'de> Deserialize<'de> for CommandLine {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Line(String),
            Argv(Vec<String>),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            None => Self::default(),
            Some(Raw::Line(line)) => Self(vec![line]),
            Some(Raw::Argv(argv)) => Self(argv),
        })
    }
}

/// Response of `GET /scans/{id}/status`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScanStatusReport {
    pub status: ScanStatus,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub command: CommandLine,
    #[serde(default, alias = "reason")]
    pub rationale: Option<String>,
    #[serde(default)]
    pub analysis: Option<ScanAnalysis>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
}

/// Deserializes `null` as an empty collection.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
