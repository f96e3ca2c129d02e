//! Submission mode: what happens when the user submits text.
//!
//! A [`Mode`] either routes the submitted text to a scanning tool or, with no
//! tool selected, to a direct chat with the assistant.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The fixed set of scanning tools the backend can run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Tool {
    /// Network reconnaissance and port scanning.
    Nmap,
    /// Directory and file enumeration.
    Gobuster,
    /// Web server vulnerability assessment.
    Nikto,
    /// Automated SQL injection testing.
    Sqlmap,
}

impl Tool {
    /// Returns the wire name of the tool.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Current submission mode of the conversation surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mode {
    /// Selected tool. `None` means direct chat.
    pub tool: Option<Tool>,
    /// Whether scans run in deep mode.
    pub deep_scan: bool,
    /// Optional wordlist override passed to enumeration tools.
    pub wordlist: Option<String>,
}

impl Mode {
    /// Returns true when submissions go to the assistant rather than a tool.
    pub fn is_direct_chat(&self) -> bool {
        self.tool.is_none()
    }
}

/// Holds and mutates the [`Mode`].
///
/// The selector has no side effects of its own; callers forward the
/// resulting mode to the rendering surface.
#[derive(Debug, Clone, Default)]
pub struct ModeSelector {
    mode: Mode,
}

impl ModeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a tool, replacing any previous selection.
    pub fn select_tool(&mut self, tool: Tool) -> &Mode {
        self.mode.tool = Some(tool);
        &self.mode
    }

    /// Returns to direct chat with default flags, like [`Self::reset`].
    pub fn cancel_tool(&mut self) -> &Mode {
        self.reset()
    }

    pub fn set_deep_scan(&mut self, deep_scan: bool) -> &Mode {
        self.mode.deep_scan = deep_scan;
        &self.mode
    }

    /// Sets or clears the wordlist override. Blank text clears it.
    pub fn set_wordlist(&mut self, wordlist: Option<String>) -> &Mode {
        self.mode.wordlist = wordlist
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty());
        &self.mode
    }

    /// Resets everything back to direct chat with default flags.
    pub fn reset(&mut self) -> &Mode {
        self.mode = Mode::default();
        &self.mode
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }
}
