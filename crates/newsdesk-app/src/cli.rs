//! CLI argument definitions for the newsdesk terminal client.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use newsdesk_core::config::NewsdeskConfig;
use newsdesk_core::types::FilterState;

/// newsdesk: search, typeahead and conversational Q&A over a news archive.
#[derive(Parser, Debug)]
#[command(name = "newsdesk", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL (overrides NEWSDESK_API_URL and the config file).
    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one search and print the ranked documents.
    Search(SearchArgs),

    /// Simulate typing TEXT and print the suggestions it settles on.
    Suggest {
        text: String,

        /// Delay between simulated keystrokes.
        #[arg(long = "keystroke-ms", default_value_t = 80)]
        keystroke_ms: u64,
    },

    /// Start an interactive conversation.
    Chat {
        /// First question to ask once the session is up.
        #[arg(short = 'q', long = "query")]
        query: Option<String>,

        /// Start with server-side conversation memory disabled.
        #[arg(long = "no-memory")]
        no_memory: bool,
    },

    /// Probe the backend once and report its status.
    Health,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Free-text query.
    pub query: String,

    /// Restrict to a place, e.g. "Japan".
    #[arg(long)]
    pub location: Option<String>,

    /// Earliest date, YYYY-MM-DD.
    #[arg(long = "from", value_parser = parse_date)]
    pub date_from: Option<String>,

    /// Latest date, YYYY-MM-DD.
    #[arg(long = "to", value_parser = parse_date)]
    pub date_to: Option<String>,

    /// Disable semantic ranking.
    #[arg(long = "no-semantic")]
    pub no_semantic: bool,

    /// Ignore the filters configured under [search.filters].
    #[arg(long = "clear-filters")]
    pub clear_filters: bool,

    /// Number of documents to request.
    #[arg(long = "top-k")]
    pub top_k: Option<usize>,
}

impl SearchArgs {
    /// Layer the filter flags onto the configured filters.
    ///
    /// `--clear-filters` starts from an empty filter set instead.
    pub fn filters(&self, configured: &FilterState) -> FilterState {
        let mut filters = if self.clear_filters {
            FilterState::cleared()
        } else {
            configured.clone()
        };
        if let Some(ref location) = self.location {
            filters.location = location.clone();
        }
        if let Some(ref date) = self.date_from {
            filters.date_from = date.clone();
        }
        if let Some(ref date) = self.date_to {
            filters.date_to = date.clone();
        }
        if self.no_semantic {
            filters.semantic_search = false;
        }
        filters
    }
}

/// Accept only ISO calendar dates; the value is kept as typed.
fn parse_date(value: &str) -> Result<String, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| value.to_string())
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > NEWSDESK_CONFIG env var > ~/.newsdesk/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("NEWSDESK_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Layer environment and CLI overrides onto a loaded config.
    pub fn apply_overrides(&self, config: &mut NewsdeskConfig) {
        config.apply_env();
        if let Some(ref url) = self.api_url {
            config.backend.apply_url_override(url);
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".newsdesk").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".newsdesk").join("config.toml");
    }
    PathBuf::from("config.toml")
}
