//! Text for scan placeholders, results and notices.
//!
//! Results are produced as Markdown and passed through the markup
//! collaborator by the caller.

use aivast_core::scan::{CommandLine, ScanAnalysis, ScanStatusReport};
use aivast_core::session::ScanRecord;
use aivast_core::{AivastError, Tool};
use std::fmt::Write;

pub const NOT_AVAILABLE: &str = "N/A";
pub const DEFAULT_SCAN_FAILURE: &str = "The scan failed because of a server error.";
pub const POLL_FAILURE_NOTICE: &str = "Sorry, something went wrong while checking the scan status.";
pub const RATE_LIMIT_NOTICE: &str =
    "Guest limit reached. Please log in or sign up to keep chatting with AIVAST.";
pub const THINKING: &str = "Thinking...";

/// Everything the completed-scan view needs.
#[derive(Debug, Clone, Copy)]
pub struct ScanView<'a> {
    pub target: &'a str,
    pub tool: &'a str,
    pub rationale: Option<&'a str>,
    pub command: &'a CommandLine,
    pub analysis: Option<&'a ScanAnalysis>,
    pub risk_level: Option<&'a str>,
}

impl<'a> ScanView<'a> {
    /// Builds a view from a live status report. `target` and `tool` fall
    /// back to what the scan was dispatched with.
    pub fn from_report(report: &'a ScanStatusReport, target: &'a str, tool: &'a str) -> Self {
        Self {
            target: non_blank(report.target.as_deref()).unwrap_or(target),
            tool: non_blank(report.tool.as_deref()).unwrap_or(tool),
            rationale: non_blank(report.rationale.as_deref()),
            command: &report.command,
            analysis: report.analysis.as_ref(),
            risk_level: None,
        }
    }

    pub fn from_record(record: &'a ScanRecord) -> Self {
        Self {
            target: &record.target,
            tool: tool_label(record.tool.as_deref()),
            rationale: non_blank(record.rationale.as_deref()),
            command: &record.command,
            analysis: record.analysis.as_ref(),
            risk_level: non_blank(record.risk_level.as_deref()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Display name of a tool, "auto" when the backend chooses.
pub fn tool_label(tool: Option<&str>) -> &str {
    non_blank(tool).unwrap_or("auto")
}

pub fn tool_name(tool: Option<Tool>) -> &'static str {
    tool.map(|t| t.as_str()).unwrap_or("auto")
}

pub fn initializing(tool: Option<Tool>) -> String {
    match tool {
        Some(tool) => format!("Initializing {tool} scan..."),
        None => "Initializing scan...".to_string(),
    }
}

pub fn in_progress(tool: &str) -> String {
    format!("Running {tool} scan... (in progress)")
}

pub fn failed(error: Option<&str>) -> String {
    format!("Scan failed: {}", non_blank(error).unwrap_or(DEFAULT_SCAN_FAILURE))
}

pub fn creation_failed(err: &AivastError) -> String {
    match err {
        AivastError::MalformedResponse(_) => {
            "Failed to start the scan: the server did not return a scan ID.".to_string()
        }
        AivastError::RateLimited => RATE_LIMIT_NOTICE.to_string(),
        other => match other.backend_message() {
            Some(message) => format!("Failed to start the scan: {message}"),
            None => "Sorry, something went wrong while starting the scan.".to_string(),
        },
    }
}

pub fn chat_failed(err: &AivastError) -> String {
    match err.backend_message() {
        Some(message) => format!("The assistant could not answer: {message}"),
        None => "Sorry, the assistant is unreachable right now. Please try again.".to_string(),
    }
}

pub fn pending_record(record: &ScanRecord) -> String {
    format!(
        "The {} scan of {} has not finished yet.",
        tool_label(record.tool.as_deref()),
        record.target
    )
}

pub fn failed_record(record: &ScanRecord) -> String {
    format!(
        "The {} scan of {} failed: {}",
        tool_label(record.tool.as_deref()),
        record.target,
        non_blank(record.error.as_deref()).unwrap_or(DEFAULT_SCAN_FAILURE)
    )
}

/// One-line summary appended to guest history when a scan completes.
pub fn guest_note(view: &ScanView<'_>) -> String {
    let result = view
        .analysis
        .and_then(ScanAnalysis::summary_text)
        .unwrap_or("completed without a summary");
    format!(
        "Scan executed: {} on {}. Result: {}",
        view.tool, view.target, result
    )
}

/// Renders a completed scan.
///
/// Every analysis field is always present, showing "N/A" when the analyzer
/// did not provide it.
pub fn completed(view: &ScanView<'_>) -> String {
    let analysis = view.analysis.cloned().unwrap_or_default();
    let issue = analysis.issue.clone().unwrap_or_default();
    let evidence = analysis.evidence.clone().unwrap_or_default();

    let mut out = String::new();
    let _ = writeln!(out, "### Scan completed: {}", view.tool);
    let _ = writeln!(out, "**Target:** {}", view.target);
    if let Some(rationale) = view.rationale {
        let _ = writeln!(out, "**Rationale:** {rationale}");
    }
    if let Some(risk) = view.risk_level {
        let _ = writeln!(out, "**Risk level:** {risk}");
    }

    out.push('\n');
    out.push_str("<details><summary>Executed command</summary>\n\n```\n");
    out.push_str(&or_na(Some(view.command.display().as_str())));
    out.push_str("\n```\n</details>\n\n");

    let _ = writeln!(out, "**Confidence:** {}", or_na(analysis.confidence().as_deref()));
    let _ = writeln!(out, "**Severity:** {}", or_na(issue.severity.as_deref()));
    let _ = writeln!(
        out,
        "**Vulnerability:** {} (OWASP: {})",
        or_na(issue.kind.as_deref()),
        or_na(issue.owasp.as_deref())
    );
    let _ = writeln!(
        out,
        "**Location:** endpoint {}, parameter {}",
        or_na(issue.endpoint.as_deref()),
        or_na(issue.parameter.as_deref())
    );
    let _ = writeln!(out, "**Analysis:** {}", or_na(analysis.analysis.as_deref()));
    let _ = writeln!(
        out,
        "**Evidence:** payload {}; response {}",
        or_na(evidence.payload.as_deref()),
        or_na(evidence.response_behavior.as_deref())
    );
    let _ = writeln!(out, "**Impact:** {}", or_na(analysis.impact.as_deref()));
    write_list(&mut out, "Recommendations", &analysis.recommendations);
    write_list(&mut out, "Next actions", &analysis.next_actions);
    let _ = write!(out, "**Summary:** {}", or_na(analysis.summary_text()));
    out
}

fn or_na(value: Option<&str>) -> String {
    non_blank(value).unwrap_or(NOT_AVAILABLE).to_string()
}

fn write_list(out: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(out, "**{title}:**");
    let items: Vec<&str> = items
        .iter()
        .map(String::as_str)
        .filter(|item| !item.trim().is_empty())
        .collect();
    if items.is_empty() {
        let _ = writeln!(out, "- {NOT_AVAILABLE}");
    }
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}
