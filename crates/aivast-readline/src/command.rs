//! Slash commands of the REPL.

use aivast_core::{SessionId, Tool};
use std::str::FromStr;

pub const COMMANDS: &[&str] = &[
    "/tool", "/cancel", "/deep", "/wordlist", "/sessions", "/open", "/rename", "/delete", "/new",
    "/scans", "/help", "/quit",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Tool(Tool),
    Cancel,
    Deep(bool),
    /// `None` clears the override.
    Wordlist(Option<String>),
    Sessions,
    Open(SessionId),
    Rename(SessionId, String),
    Delete(SessionId),
    New,
    Scans,
    Help,
    Quit,
}

impl Command {
    /// Parses a line starting with `/`. Returns `None` for ordinary input.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let line = line.trim();
        let rest = line.strip_prefix('/')?;
        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "tool" => Tool::from_str(args)
                .map(Command::Tool)
                .map_err(|_| format!("Unknown tool '{args}'. Available: nmap, gobuster, nikto, sqlmap")),
            "cancel" => Ok(Command::Cancel),
            "deep" => match args {
                "" | "on" => Ok(Command::Deep(true)),
                "off" => Ok(Command::Deep(false)),
                other => Err(format!("Usage: /deep [on|off], got '{other}'")),
            },
            "wordlist" => Ok(Command::Wordlist((!args.is_empty()).then(|| args.to_string()))),
            "sessions" => Ok(Command::Sessions),
            "open" => session_arg(args, "/open <session-id>").map(Command::Open),
            "rename" => match args.split_once(char::is_whitespace) {
                Some((id, title)) if !title.trim().is_empty() => {
                    Ok(Command::Rename(SessionId::new(id), title.trim().to_string()))
                }
                _ => Err("Usage: /rename <session-id> <title>".to_string()),
            },
            "delete" => session_arg(args, "/delete <session-id>").map(Command::Delete),
            "new" => Ok(Command::New),
            "scans" => Ok(Command::Scans),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("Unknown command '/{other}'. Type /help for a list.")),
        };
        Some(command)
    }
}

fn session_arg(args: &str, usage: &str) -> Result<SessionId, String> {
    if args.is_empty() || args.contains(char::is_whitespace) {
        return Err(format!("Usage: {usage}"));
    }
    Ok(SessionId::new(args))
}

pub const HELP: &str = "\
/tool <nmap|gobuster|nikto|sqlmap>  treat the next input as a scan target
/cancel                             back to direct chat
/deep [on|off]                      toggle deep scanning
/wordlist [path]                    set or clear the custom wordlist
/sessions                           list saved sessions
/open <id>                          replay a saved session
/rename <id> <title>                rename a session
/delete <id>                        delete a session
/new                                start a new conversation
/scans                              show scans still being polled
/quit                               exit";
