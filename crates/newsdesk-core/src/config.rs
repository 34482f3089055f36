use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{NewsdeskError, Result};
use crate::types::FilterState;

/// Environment variable that selects the backend host.
pub const API_URL_ENV: &str = "NEWSDESK_API_URL";

/// Backend host used when neither the environment nor the config file set one.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Top-level configuration for the newsdesk client.
///
/// Loaded from `~/.newsdesk/config.toml` by default. Every section is
/// optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsdeskConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub suggest: SuggestConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl NewsdeskConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NewsdeskConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| NewsdeskError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Apply the `NEWSDESK_API_URL` override, if set and non-empty.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            self.backend.apply_url_override(&url);
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Where the retrieval backend lives and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL, without a trailing slash.
    pub base_url: String,
    /// Upper bound for any single HTTP request.
    pub request_timeout_secs: u64,
    /// Upper bound for the liveness probe.
    pub health_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 30,
            health_timeout_secs: 5,
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    /// Replace the base URL unless `url` is blank. Trailing slashes are
    /// dropped so endpoint paths can be appended verbatim.
    pub fn apply_url_override(&mut self, url: &str) {
        let trimmed = url.trim().trim_end_matches('/');
        if !trimmed.is_empty() {
            self.base_url = trimmed.to_string();
        }
    }
}

/// Typeahead suggestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestConfig {
    /// Quiescence window before a typed value counts as settled.
    pub debounce_ms: u64,
    /// Minimum settled length (in characters) that triggers a lookup.
    pub min_chars: usize,
    /// Number of suggestions requested.
    pub top_k: usize,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            min_chars: 3,
            top_k: 5,
        }
    }
}

impl SuggestConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Full search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of documents requested per search.
    pub top_k: usize,
    /// Filters applied to every search unless reset on the command line.
    pub filters: FilterState,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            filters: FilterState::default(),
        }
    }
}

/// Conversational mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Whether new sessions start with server-side memory enabled.
    pub use_memory: bool,
    /// Fixed prefix of generated session identifiers.
    pub session_prefix: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            use_memory: true,
            session_prefix: "sess_".to_string(),
        }
    }
}
