//! Configuration management for the café service
//!
//! Runtime configuration is loaded from a JSON file so the bind address,
//! upstream model, and log level can change without recompilation. A missing
//! or malformed file falls back to defaults. Secrets are never stored in the
//! file: the chat API key is read per request from the environment variable
//! named by `chat.api_key_env`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default config location relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/cafe.json";

/// Environment variable overriding `server.bind_addr`
pub const BIND_ADDR_ENV: &str = "CAFE_BIND_ADDR";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP surface binds to
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
        }
    }
}

/// Upstream generative-language service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Base URL of the generative-language REST API
    pub api_base: String,
    /// Model name used in `models/{model}:generateContent`
    pub model: String,
    /// Upper bound on a single upstream call
    pub timeout_ms: u64,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-pro".to_string(),
            timeout_ms: 30_000,
            api_key_env: "VITE_GEMINI_API_KEY".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of error, warn, info, debug, trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or defaults if the file doesn't exist or
    /// its JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load from `path` (or the default location) and apply env overrides
    pub fn load(path: Option<&Path>) -> Self {
        let mut config = match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load_from_file(DEFAULT_CONFIG_PATH),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config
    }

    /// Apply environment overrides using `lookup` to resolve variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(BIND_ADDR_ENV).filter(|value| !value.trim().is_empty()) {
            log::info!("[Config] {} overrides bind address: {}", BIND_ADDR_ENV, addr);
            self.server.bind_addr = addr.trim().to_string();
        }
    }
}
