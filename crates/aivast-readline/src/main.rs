use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use strum::IntoEnumIterator;
use tracing_subscriber::EnvFilter;

use aivast_application::{ConversationUseCase, SubmitOutcome};
use aivast_core::Tool;
use aivast_interaction::{HttpBackend, load_client_config};

mod command;
mod surface;

use command::{COMMANDS, Command, HELP};
use surface::{TerminalMarkup, TerminalSurface};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "AIVAST_LOG";

#[derive(Parser)]
#[command(name = "aivast")]
#[command(about = "AIVAST - chat with a security assistant and run scans", long_about = None)]
struct Cli {
    /// Backend API base URL, e.g. http://127.0.0.1:5000/api/v1
    #[arg(long)]
    base_url: Option<String>,

    /// Use the guest chat endpoint (no saved sessions)
    #[arg(long)]
    guest: bool,

    /// Configuration file (defaults to ~/.config/aivast/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
    tools: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
            tools: Tool::iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if let Some(prefix) = line.strip_prefix("/tool ") {
            let candidates = self
                .tools
                .iter()
                .filter(|tool| tool.starts_with(prefix.trim_start()))
                .map(|tool| Pair {
                    display: tool.clone(),
                    replacement: tool.clone(),
                })
                .collect();
            return Ok((line.len() - prefix.trim_start().len(), candidates));
        }

        if line.starts_with('/') && !line.contains(' ') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| "warn".into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// The main entry point for the AIVAST readline REPL.
///
/// Loads the configuration, connects the conversation use case to the HTTP
/// backend and the terminal, then reads lines until `/quit` or EOF. Scans
/// keep polling in the background while the prompt waits for input.
#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // ===== Configuration =====
    let mut config =
        load_client_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if cli.guest {
        config.guest = true;
    }
    config.validate().context("Invalid configuration")?;

    // ===== Use case wiring =====
    let surface = Arc::new(TerminalSurface::new());
    let backend = Arc::new(HttpBackend::new(&config));
    let usecase = ConversationUseCase::new(
        backend,
        surface.clone(),
        Arc::new(TerminalMarkup),
        config.clone(),
    );

    println!("{}", "=== AIVAST ===".bright_magenta().bold());
    println!("{}", format!("Backend: {}", config.base_url).bright_black());
    if usecase.is_guest() {
        println!("{}", "Guest mode: conversations are not saved.".yellow());
    } else if let Err(e) = usecase.list_sessions().await {
        eprintln!("{}", format!("Could not load sessions: {e}").red());
    }
    println!("{}", "Type a message, or /help for commands.".bright_black());
    println!();

    // ===== REPL =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    loop {
        match rl.readline(&surface.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match Command::parse(trimmed) {
                    Some(Ok(Command::Quit)) => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Some(Ok(command)) => run_command(&usecase, &surface, command).await,
                    Some(Err(message)) => println!("{}", message.yellow()),
                    None => report(usecase.submit(trimmed).await),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    usecase.shutdown().await;
    Ok(())
}

async fn run_command(usecase: &ConversationUseCase, surface: &TerminalSurface, command: Command) {
    match command {
        Command::Tool(tool) => {
            usecase.select_tool(tool).await;
        }
        Command::Cancel => {
            usecase.cancel_tool().await;
        }
        Command::Deep(enabled) => {
            usecase.set_deep_scan(enabled).await;
        }
        Command::Wordlist(wordlist) => {
            usecase.set_wordlist(wordlist).await;
        }
        Command::Sessions => match usecase.list_sessions().await {
            Ok(_) if usecase.is_guest() => {
                println!("{}", "Guests have no saved sessions.".bright_black())
            }
            Ok(_) => surface.print_sessions(usecase.current_session_id().await.as_ref()),
            Err(e) => eprintln!("{}", format!("Could not load sessions: {e}").red()),
        },
        Command::Open(id) => match usecase.render_session(&id).await {
            Ok(_) => println!("{}", format!("Opened session {id}").bright_black()),
            Err(e) => eprintln!("{}", format!("Could not open session {id}: {e}").red()),
        },
        Command::Rename(id, title) => match usecase.rename_session(&id, &title).await {
            Ok(session) => println!("{}", format!("Renamed to \"{}\"", session.title).green()),
            Err(e) => eprintln!("{}", format!("Could not rename session {id}: {e}").red()),
        },
        Command::Delete(id) => match usecase.delete_session(&id).await {
            Ok(()) => println!("{}", format!("Deleted session {id}").green()),
            Err(e) => eprintln!("{}", format!("Could not delete session {id}: {e}").red()),
        },
        Command::New => {
            usecase.new_conversation().await;
            println!("{}", "New conversation.".bright_black());
        }
        Command::Scans => {
            let scans = usecase.active_scans().await;
            if scans.is_empty() {
                println!("{}", "No scans running.".bright_black());
            }
            for scan in scans {
                println!("{}", format!("scan {scan} is still running").bright_black());
            }
        }
        Command::Help => println!("{}", HELP.bright_black()),
        Command::Quit => {}
    }
}

/// Failures are already shown inside their bubble; only log them here.
fn report(outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::Scan(task) => {
            tracing::info!("[Repl] Scan {} started", task.scan_id);
        }
        SubmitOutcome::Reply(reply) => {
            if let Some(scheduled) = reply.directive {
                println!(
                    "{}",
                    format!("Starting an autonomous scan of {}...", scheduled.directive.target)
                        .bright_black()
                );
            }
        }
        SubmitOutcome::Failed(e) => tracing::debug!("[Repl] Submission failed: {}", e),
        SubmitOutcome::Ignored => {}
    }
}
