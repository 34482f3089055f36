//! newsdesk binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing (stderr, so stdout stays the rendering surface)
//! 3. Build the HTTP backend and the orchestration components
//! 4. Dispatch to the requested subcommand

mod cli;
mod render;
mod repl;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use newsdesk_client::{
    Backend, Debouncer, HttpBackend, SearchOrchestrator, SessionManager, SuggestionFetcher,
};
use newsdesk_core::config::NewsdeskConfig;
use newsdesk_core::types::{BackendStatus, ChatTurn};
use newsdesk_core::NewsdeskError;

use cli::{CliArgs, Command, SearchArgs};
use repl::ReplCommand;

/// How the configuration was obtained, reported once tracing is up.
#[derive(Debug)]
enum ConfigSource {
    File,
    Missing,
    Invalid(NewsdeskError),
}

/// Read the config file without logging; the level it carries decides how
/// tracing is initialised.
fn read_config(path: &Path) -> (NewsdeskConfig, ConfigSource) {
    if !path.exists() {
        return (NewsdeskConfig::default(), ConfigSource::Missing);
    }
    match NewsdeskConfig::load(path) {
        Ok(config) => (config, ConfigSource::File),
        Err(e) => (NewsdeskConfig::default(), ConfigSource::Invalid(e)),
    }
}

fn report_config(path: &Path, source: &ConfigSource) {
    match source {
        ConfigSource::File => tracing::info!(path = %path.display(), "Configuration loaded"),
        ConfigSource::Missing => {
            tracing::debug!(path = %path.display(), "No configuration file; using defaults")
        }
        ConfigSource::Invalid(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Failed to load configuration. Using defaults."
        ),
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run_search(
    backend: Arc<dyn Backend>,
    config: &NewsdeskConfig,
    args: SearchArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut search = SearchOrchestrator::new(backend, &config.search);
    if let Some(top_k) = args.top_k {
        search = search.with_top_k(top_k);
    }

    search
        .submit(&args.query, args.filters(&config.search.filters))
        .await?;

    let handoff = search.chat_handoff();
    let phase = search.snapshot().phase;
    let (out, err) = render::search_outcome(&args.query, &phase, handoff.as_deref());
    print!("{out}");
    eprint!("{err}");
    Ok(())
}

async fn run_suggest(
    backend: Arc<dyn Backend>,
    config: &NewsdeskConfig,
    text: &str,
    keystroke_ms: u64,
) {
    if text.is_empty() {
        return;
    }

    let fetcher = Arc::new(SuggestionFetcher::new(backend, &config.suggest));
    let mut state = fetcher.subscribe();

    let window = config.suggest.debounce_window();
    let (mut debouncer, settled) = Debouncer::new(window);
    let driver = Arc::clone(&fetcher).spawn_driver(settled);

    // Generation seen just before the final keystroke; the final value's
    // lookup or clear must advance past it.
    let mut issued_before = 0;
    let mut typed = String::new();
    for ch in text.chars() {
        typed.push(ch);
        tracing::debug!(input = %typed, "Keystroke");
        issued_before = fetcher.snapshot().latest_generation;
        debouncer.push(typed.clone());
        tokio::time::sleep(Duration::from_millis(keystroke_ms)).await;
    }

    while debouncer.is_pending() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let settled_state = state
        .wait_for(|s| s.latest_generation > issued_before && !s.loading)
        .await;
    if settled_state.is_err() {
        tracing::warn!("Suggestion state closed before settling");
    }

    let snapshot = fetcher.snapshot();
    print!("{}", render::suggestions(text, &snapshot.suggestions));
    if let Some(err) = snapshot.error {
        eprintln!("Suggestions unavailable: {err}");
    }

    drop(debouncer);
    driver.abort();
}

async fn run_health(
    backend: Arc<dyn Backend>,
    config: &NewsdeskConfig,
) -> Result<BackendStatus, NewsdeskError> {
    let sessions = SessionManager::new(backend, &config.chat, &config.backend);
    let status = sessions.create_session().await?;
    println!("{}", render::backend_status(status));
    Ok(status)
}

/// Send one turn and append it to the transcript.
async fn ask(sessions: &SessionManager, transcript: &mut Vec<ChatTurn>, question: &str) {
    match sessions.ask(question).await {
        Ok(Some(turn)) => {
            print!("{}", render::turn(&turn));
            transcript.push(turn);
        }
        Ok(None) | Err(NewsdeskError::EmptyQuery) => {}
        Err(e) => eprintln!("Error: {e}"),
    }
}

async fn run_chat(
    backend: Arc<dyn Backend>,
    config: &NewsdeskConfig,
    initial: Option<String>,
    no_memory: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let sessions = SessionManager::new(backend, &config.chat, &config.backend);
    if no_memory {
        sessions.set_memory_enabled(false);
    }
    if let Err(e) = sessions.create_session().await {
        eprintln!("Error: {e}");
    }
    println!("{}", render::session(&sessions.snapshot()));
    println!("Type a question, or /help for commands.");

    // The transcript belongs to the front-end; the session only knows its id.
    let mut transcript: Vec<ChatTurn> = Vec::new();

    if let Some(question) = initial {
        println!("> {question}");
        ask(&sessions, &mut transcript, &question).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match repl::parse(&line) {
            ReplCommand::Ask(question) => ask(&sessions, &mut transcript, &question).await,
            ReplCommand::NewSession => {
                let id = sessions.new_session();
                transcript.clear();
                println!("New session {id}");
            }
            ReplCommand::ClearSession => {
                let id = sessions.session_id();
                match sessions.clear_session(&id).await {
                    Ok(Some(response)) => {
                        transcript.clear();
                        println!("{}", response.message);
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
            ReplCommand::Memory(enabled) => {
                sessions.set_memory_enabled(enabled);
                println!("Memory {}", if enabled { "on" } else { "off" });
            }
            ReplCommand::Status => {
                println!("{}", render::session(&sessions.snapshot()));
                println!("{} turns in transcript", transcript.len());
            }
            ReplCommand::Help => println!("{}", repl::HELP),
            ReplCommand::Quit => break,
            ReplCommand::Empty => {}
            ReplCommand::Unknown(cmd) => eprintln!("Unknown command: {cmd} (try /help)"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config, before tracing so the configured level applies.
    let config_file = args.resolve_config_path();
    let (mut config, source) = read_config(&config_file);

    init_tracing(&args.resolve_log_level(&config.general.log_level));
    report_config(&config_file, &source);

    args.apply_overrides(&mut config);
    tracing::debug!(base_url = %config.backend.base_url, "Backend selected");

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&config.backend)?);

    match args.command {
        Command::Search(search) => run_search(backend, &config, search).await?,
        Command::Suggest { text, keystroke_ms } => {
            run_suggest(backend, &config, &text, keystroke_ms).await
        }
        Command::Chat { query, no_memory } => run_chat(backend, &config, query, no_memory).await?,
        Command::Health => {
            if run_health(backend, &config).await? != BackendStatus::Connected {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
