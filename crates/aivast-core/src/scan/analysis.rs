//! Structured analysis attached to a completed scan.
//!
//! Every field is optional; the backend's analyzer fills what it can and the
//! client renders the rest as "N/A".

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Either a number (0-100 or 0-1) or a label such as "high".
    #[serde(default)]
    pub confidence: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisIssue {
    #[serde(default)]
    pub severity: Option<String>,
    /// Vulnerability class, e.g. "SQL Injection".
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub owasp: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub parameter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisEvidence {
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub response_behavior: Option<String>,
}

/// The analyzer's verdict on a scan's output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanAnalysis {
    #[serde(default)]
    pub metadata: Option<AnalysisMetadata>,
    /// Free-form narrative analysis.
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub issue: Option<AnalysisIssue>,
    #[serde(default)]
    pub evidence: Option<AnalysisEvidence>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default, deserialize_with = "crate::scan::model::null_as_empty")]
    pub recommendations: Vec<String>,
    #[serde(default, deserialize_with = "crate::scan::model::null_as_empty")]
    pub next_actions: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl ScanAnalysis {
    /// Confidence rendered as text, if present.
    pub fn confidence(&self) -> Option<String> {
        let value = self.metadata.as_ref()?.confidence.as_ref()?;
        match value {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Summary text, ignoring blank values.
    pub fn summary_text(&self) -> Option<&str> {
        self.summary.as_deref().filter(|s| !s.trim().is_empty())
    }
}
