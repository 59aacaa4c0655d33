use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Tunable runtime configuration.
///
/// The freshness window and the history cap were fixed constants in earlier
/// builds; they are configuration now, defaulting to the old values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadConfig {
    /// Base URL of the remote key/value store, e.g. `https://host/api/state`.
    #[serde(default = "default_server_base")]
    pub server_base: String,

    /// The two pad users, owner first.
    #[serde(default = "default_users")]
    pub users: [String; 2],

    /// Shared write passcode sent with every PUT.
    #[serde(default)]
    pub passcode: String,

    /// Poll interval for the reconciling pull, in milliseconds.
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,

    /// How long a pending local write outranks a differing remote value.
    #[serde(default = "default_pending_fresh_ms")]
    pub pending_fresh_ms: u64,

    /// Quiescence window before a text edit is pushed to the cloud.
    #[serde(default = "default_text_save_delay_ms")]
    pub text_save_delay_ms: u64,

    /// Undo/redo depth per user.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Maximum stored archive entries per user.
    #[serde(default = "default_archive_cap")]
    pub archive_cap: usize,

    /// HTTP timeout for a single remote attempt, in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Daily quiz questions; the rotation picks one per day. May be empty.
    #[serde(default)]
    pub quiz_questions: Vec<String>,
}

fn default_server_base() -> String {
    "http://localhost:3000/api/state".to_string()
}

fn default_users() -> [String; 2] {
    ["niklas".to_string(), "jovelyn".to_string()]
}

fn default_poll_ms() -> u64 {
    1500
}

fn default_pending_fresh_ms() -> u64 {
    15_000
}

fn default_text_save_delay_ms() -> u64 {
    1200
}

fn default_history_cap() -> usize {
    20
}

fn default_archive_cap() -> usize {
    120
}

fn default_http_timeout_secs() -> u64 {
    10
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            server_base: default_server_base(),
            users: default_users(),
            passcode: String::new(),
            poll_ms: default_poll_ms(),
            pending_fresh_ms: default_pending_fresh_ms(),
            text_save_delay_ms: default_text_save_delay_ms(),
            history_cap: default_history_cap(),
            archive_cap: default_archive_cap(),
            http_timeout_secs: default_http_timeout_secs(),
            quiz_questions: Vec::new(),
        }
    }
}

impl PadConfig {
    /// Load configuration from disk, or create defaults if not present.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &PathBuf) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Failed to parse config: {}. Using defaults.", e);
                    Self::default()
                }
            },
            Err(_) => {
                // File doesn't exist, use defaults
                let default = Self::default();
                let _ = default.save_to(path);
                default
            }
        }
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(path, json).map_err(|e| format!("Failed to write config: {}", e))?;

        Ok(())
    }

    /// Config file path (cross-platform).
    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("pairpad");
        path.push("config.json");
        path
    }

    pub fn pending_fresh_window(&self) -> Duration {
        Duration::from_millis(self.pending_fresh_ms)
    }

    pub fn text_save_delay(&self) -> Duration {
        Duration::from_millis(self.text_save_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}
