//! Terminal rendering surface.
//!
//! A terminal cannot edit earlier output, so every bubble update is printed
//! as a new block tagged with the bubble number. Identical consecutive
//! updates are skipped.

use aivast_core::render::{BubbleHandle, BubbleRole, MarkupRenderer, RenderSurface};
use aivast_core::session::SessionSummary;
use aivast_core::{Mode, SessionId};
use colored::Colorize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Printed whenever the surface is cleared, for a new or a replayed session.
const SEPARATOR: &str = "────────────────────────────────";

#[derive(Default)]
pub struct TerminalSurface {
    next_handle: AtomicU64,
    bubbles: Mutex<HashMap<BubbleHandle, String>>,
    prompt: Mutex<String>,
    sessions: Mutex<Vec<SessionSummary>>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        let surface = Self::default();
        surface.set_prompt(&Mode::default());
        surface
    }

    /// Prompt reflecting the current mode.
    pub fn prompt(&self) -> String {
        self.prompt
            .lock()
            .map(|p| p.clone())
            .unwrap_or_else(|_| ">> ".to_string())
    }

    pub fn print_sessions(&self, current: Option<&SessionId>) {
        let Ok(sessions) = self.sessions.lock() else {
            return;
        };
        if sessions.is_empty() {
            println!("{}", "No saved sessions.".bright_black());
            return;
        }
        for session in sessions.iter() {
            let marker = if Some(&session.id) == current { "*" } else { " " };
            let updated = session.updated_at.as_deref().unwrap_or("-");
            println!(
                "{} {:>6}  {}  {}",
                marker,
                session.id.as_str().bright_cyan(),
                session.title,
                updated.bright_black()
            );
        }
    }

    fn set_prompt(&self, mode: &Mode) {
        let prompt = match mode.tool {
            Some(tool) if mode.deep_scan => format!("{tool}+deep target> "),
            Some(tool) => format!("{tool} target> "),
            None => ">> ".to_string(),
        };
        if let Ok(mut current) = self.prompt.lock() {
            *current = prompt;
        }
    }

    fn print_bubble(handle: BubbleHandle, role: BubbleRole, content: &str) {
        match role {
            BubbleRole::User => println!("{}", format!("> {content}").green()),
            BubbleRole::Assistant => {
                println!("{}", format!("[#{}]", handle.0).bright_magenta());
                for line in content.lines() {
                    println!("{}", line.bright_blue());
                }
                println!();
            }
        }
    }
}

impl RenderSurface for TerminalSurface {
    fn render_bubble(&self, content: &str, role: BubbleRole) -> BubbleHandle {
        let handle = BubbleHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        if let Ok(mut bubbles) = self.bubbles.lock() {
            bubbles.insert(handle, content.to_string());
        }
        Self::print_bubble(handle, role, content);
        handle
    }

    fn update_bubble(&self, handle: BubbleHandle, content: &str) {
        if let Ok(mut bubbles) = self.bubbles.lock() {
            if bubbles.get(&handle).is_some_and(|c| c == content) {
                return;
            }
            bubbles.insert(handle, content.to_string());
        }
        Self::print_bubble(handle, BubbleRole::Assistant, content);
    }

    fn clear(&self) {
        if let Ok(mut bubbles) = self.bubbles.lock() {
            bubbles.clear();
        }
        println!("{}", SEPARATOR.bright_black());
    }

    fn mode_changed(&self, mode: &Mode) {
        self.set_prompt(mode);
        let description = match (mode.tool, &mode.wordlist) {
            (None, _) => "direct chat".to_string(),
            (Some(tool), Some(wordlist)) => format!("{tool} scan, wordlist {wordlist}"),
            (Some(tool), None) => format!("{tool} scan"),
        };
        let deep = if mode.deep_scan { ", deep" } else { "" };
        println!("{}", format!("Mode: {description}{deep}").yellow());
    }

    fn sessions_changed(&self, sessions: &[SessionSummary]) {
        if let Ok(mut current) = self.sessions.lock() {
            *current = sessions.to_vec();
        }
    }
}

/// Renders the Markdown subset the client produces for a terminal.
///
/// Headings and bold labels become bold text, and `<details>` blocks are
/// flattened into their summary line followed by the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalMarkup;

impl MarkupRenderer for TerminalMarkup {
    fn to_markup(&self, text: &str) -> String {
        let mut out = Vec::new();
        for line in text.lines() {
            if let Some(heading) = line.trim_start().strip_prefix('#') {
                out.push(heading.trim_start_matches('#').trim().bold().to_string());
                continue;
            }
            if line.trim() == "</details>" || line.trim().starts_with("```") {
                continue;
            }
            if let Some(summary) = line
                .strip_prefix("<details><summary>")
                .and_then(|rest| rest.strip_suffix("</summary>"))
            {
                out.push(format!("{summary}:"));
                continue;
            }
            out.push(bold_labels(line));
        }
        out.join("\n")
    }
}

fn bold_labels(line: &str) -> String {
    let mut rest = line;
    let mut out = String::new();
    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&after[..end].bold().to_string());
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> String {
        colored::control::set_override(false);
        TerminalMarkup.to_markup(text)
    }

    #[test]
    fn test_markup_flattens_scan_result() {
        let rendered = plain(
            "### Scan completed: nmap\n**Target:** example.com\n\n<details><summary>Executed command</summary>\n\n```\nnmap -sV example.com\n```\n</details>\n",
        );
        assert_eq!(
            rendered,
            "Scan completed: nmap\nTarget: example.com\n\nExecuted command:\n\nnmap -sV example.com"
        );
    }

    #[test]
    fn test_unbalanced_bold_is_left_alone() {
        assert_eq!(plain("a **b** c **d"), "a b c **d");
    }

    #[test]
    fn test_identical_updates_are_skipped() {
        let surface = TerminalSurface::new();
        let handle = surface.render_bubble("Initializing scan...", BubbleRole::Assistant);
        surface.update_bubble(handle, "Running nmap scan... (in progress)");
        surface.update_bubble(handle, "Running nmap scan... (in progress)");
        assert_eq!(
            surface.bubbles.lock().unwrap().get(&handle).map(String::as_str),
            Some("Running nmap scan... (in progress)")
        );
        assert_eq!(handle, BubbleHandle(1));
    }

    #[test]
    fn test_clear_forgets_bubbles() {
        let surface = TerminalSurface::new();
        surface.render_bubble("Only SSH is open.", BubbleRole::Assistant);
        surface.clear();
        assert!(surface.bubbles.lock().unwrap().is_empty());
    }

    #[test]
    fn test_prompt_follows_mode() {
        let surface = TerminalSurface::new();
        assert_eq!(surface.prompt(), ">> ");
        surface.mode_changed(&Mode {
            tool: Some(aivast_core::Tool::Sqlmap),
            deep_scan: true,
            wordlist: None,
        });
        assert_eq!(surface.prompt(), "sqlmap+deep target> ");
    }
}
