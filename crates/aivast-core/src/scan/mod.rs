//! Scan domain module.
//!
//! - `model`: request/response payloads and the [`ScanStatus`] lifecycle
//! - `analysis`: the structured analysis attached to completed scans

mod analysis;
pub(crate) mod model;

pub use analysis::{AnalysisEvidence, AnalysisIssue, AnalysisMetadata, ScanAnalysis};
pub use model::{CommandLine, ScanCreated, ScanRequest, ScanStatus, ScanStatusReport};
