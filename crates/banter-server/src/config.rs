//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use banter_openai::types::GPT_3_5_TURBO;

/// Configuration for the banter server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the server listens on
    pub listen: String,
    /// Model requested from the completion API
    pub model: String,
    /// Base URL of an OpenAI-compatible API
    pub api_base: String,
    /// Completion budget per turn
    pub max_tokens: u32,
    /// Directory of static assets served at the root
    pub assets_dir: PathBuf,
    /// Keep only this many recent turns per connection (unbounded when unset)
    pub history_limit: Option<usize>,
    /// API key (alternative to the OPENAI_API_KEY environment variable)
    pub api_key: Option<String>,
    /// Organization id sent with every API request
    pub organization: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            model: GPT_3_5_TURBO.to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            max_tokens: 1024,
            assets_dir: PathBuf::from("public"),
            history_limit: None,
            api_key: None,
            organization: None,
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("banter")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        // Check for BANTER_CONFIG_PATH env var first
        if let Ok(path) = std::env::var("BANTER_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the given path, or the default location
    pub fn load(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path);
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        Config::default().save()?;
        Ok(path)
    }

    /// Get the API key, checking config then env
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        std::env::var("OPENAI_API_KEY").ok()
    }

    /// Chat completion endpoint under the configured API base
    pub fn chat_endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# banter configuration file
# Place at ~/.config/banter/config.toml (Linux/Mac) or %APPDATA%\banter\config.toml (Windows)

# Address the server listens on
listen = "127.0.0.1:8080"

# Model requested from the completion API
model = "gpt-3.5-turbo"

# Base URL of an OpenAI-compatible API
api_base = "https://api.openai.com/v1"

# Completion budget per turn
max_tokens = 1024

# Directory of static assets served at the root
assets_dir = "public"

# Keep only this many recent turns per connection (optional, unbounded otherwise)
# history_limit = 20

# API key (optional - can also use the OPENAI_API_KEY environment variable)
# It's recommended to use the environment variable instead for security
# api_key = "sk-..."

# Organization id sent with every API request (optional)
# organization = "org-..."
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.listen, "127.0.0.1:8080");
        assert_eq!(config.model, GPT_3_5_TURBO);
        assert_eq!(config.max_tokens, 1024);
        assert!(config.history_limit.is_none());
    }

    #[test]
    fn chat_endpoint_handles_trailing_slash() {
        let mut config = Config::default();
        config.api_base = "https://example.test/v1/".to_string();
        assert_eq!(
            config.chat_endpoint(),
            "https://example.test/v1/chat/completions"
        );
        config.api_base = "https://example.test/v1".to_string();
        assert_eq!(
            config.chat_endpoint(),
            "https://example.test/v1/chat/completions"
        );
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(r#"model = "gpt-4""#).unwrap();
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.listen, "127.0.0.1:8080");
        assert_eq!(config.max_tokens, 1024);
    }

    #[test]
    fn example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.model, GPT_3_5_TURBO);
        assert_eq!(config.assets_dir, PathBuf::from("public"));
    }
}
