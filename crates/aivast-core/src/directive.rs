//! Autonomous-scan directives embedded in assistant replies.
//!
//! The assistant can request a follow-up scan by writing a tag such as
//! `[AUTO_SCAN: target=10.0.0.5, mode=deep, tool=auto]` in its reply. The
//! tag is stripped before display and turned into an [`AutonomousDirective`].

use crate::mode::Tool;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

static DIRECTIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[AUTO_SCAN:\s*target\s*=\s*([^,\]\s]+)\s*,\s*mode\s*=\s*([A-Za-z]+)\s*,\s*tool\s*=\s*([A-Za-z]+)\s*\]",
    )
    .expect("directive pattern is valid")
});

/// Requested scan depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveMode {
    Quick,
    Deep,
}

impl FromStr for DirectiveMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quick" | "standard" => Ok(Self::Quick),
            "deep" => Ok(Self::Deep),
            _ => Err(()),
        }
    }
}

/// A parsed follow-up scan request. Consumed immediately, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutonomousDirective {
    pub target: String,
    pub mode: DirectiveMode,
    /// `None` when the assistant wrote `tool=auto`.
    pub tool: Option<Tool>,
}

impl AutonomousDirective {
    pub fn deep_scan(&self) -> bool {
        self.mode == DirectiveMode::Deep
    }
}

/// Result of [`extract_directive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Text to display, with the honored directive removed.
    pub cleaned_text: String,
    pub directive: Option<AutonomousDirective>,
}

/// Finds the first well-formed directive in `text` and removes it.
///
/// Tags whose mode or tool is not recognised are left in place and never
/// trigger anything. Only one directive is honored per message; any later
/// tags stay in the text untouched.
pub fn extract_directive(text: &str) -> Extraction {
    for caps in DIRECTIVE_RE.captures_iter(text) {
        let (Some(directive), Some(whole)) = (parse_captures(&caps), caps.get(0)) else {
            continue;
        };
        return Extraction {
            cleaned_text: splice_out(text, whole.start(), whole.end()),
            directive: Some(directive),
        };
    }

    Extraction {
        cleaned_text: text.to_string(),
        directive: None,
    }
}

fn parse_captures(caps: &regex::Captures<'_>) -> Option<AutonomousDirective> {
    let target = caps.get(1)?.as_str().trim();
    if target.is_empty() {
        return None;
    }
    let mode = DirectiveMode::from_str(caps.get(2)?.as_str()).ok()?;
    let tool = match caps.get(3)?.as_str() {
        t if t.eq_ignore_ascii_case("auto") => None,
        t => Some(Tool::from_str(t).ok()?),
    };

    Some(AutonomousDirective {
        target: target.to_string(),
        mode,
        tool,
    })
}

fn splice_out(text: &str, start: usize, end: usize) -> String {
    let before = text[..start].trim_end();
    let after = text[end..].trim_start();
    match (before.is_empty(), after.is_empty()) {
        (true, _) => after.to_string(),
        (_, true) => before.to_string(),
        _ => format!("{before} {after}"),
    }
}
