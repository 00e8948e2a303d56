//! Runtime configuration sourced from the process environment.
//!
//! Everything has a default so the binary starts with no environment at all.
//! The chat credential is not part of [`Config`]; the chat client reads it on
//! every call.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::endpoint::validate_endpoint;
use crate::error::ConfigError;

pub const DB_PATH: &str = ".notes_db";
pub const LISTEN_ADDR: &str = "127.0.0.1:3000";

pub const CHAT_ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";
pub const CHAT_MODEL: &str = "sonar";
pub const CHAT_API_KEY_VAR: &str = "PERPLEXITY_API_KEY";
pub const CHAT_TIMEOUT_SECS: u64 = 30;
pub const CHAT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that answers with concise, sourced results when appropriate.";
pub const DEFAULT_TOP_K: u32 = 5;

/// Settings for the chat completions client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the bearer credential.
    pub api_key_var: String,
    pub system_prompt: String,
    pub timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: CHAT_ENDPOINT.to_string(),
            model: CHAT_MODEL.to_string(),
            api_key_var: CHAT_API_KEY_VAR.to_string(),
            system_prompt: CHAT_SYSTEM_PROMPT.to_string(),
            timeout: Duration::from_secs(CHAT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub listen_addr: String,
    pub chat: ChatConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DB_PATH),
            listen_addr: LISTEN_ADDR.to_string(),
            chat: ChatConfig::default(),
        }
    }
}

impl Config {
    /// Build the configuration from `NOTES_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(path) = get("NOTES_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(addr) = get("NOTES_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(endpoint) = get("NOTES_CHAT_ENDPOINT") {
            config.chat.endpoint = endpoint;
        }
        if let Some(model) = get("NOTES_CHAT_MODEL") {
            config.chat.model = model;
        }
        if let Some(secs) = get("NOTES_CHAT_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|e| ConfigError::InvalidVar {
                var: "NOTES_CHAT_TIMEOUT_SECS",
                reason: format!("{}", e),
            })?;
            if secs == 0 {
                return Err(ConfigError::InvalidVar {
                    var: "NOTES_CHAT_TIMEOUT_SECS",
                    reason: "must be greater than zero".to_string(),
                });
            }
            config.chat.timeout = Duration::from_secs(secs);
        }

        validate_endpoint(&config.chat.endpoint)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.chat.api_key_var, "PERPLEXITY_API_KEY");
        assert_eq!(config.chat.model, "sonar");
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("NOTES_DB_PATH", "/tmp/notes-db"),
            ("NOTES_ADDR", "0.0.0.0:8080"),
            ("NOTES_CHAT_ENDPOINT", "http://127.0.0.1:9999/chat"),
            ("NOTES_CHAT_MODEL", "sonar-pro"),
            ("NOTES_CHAT_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/notes-db"));
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.chat.endpoint, "http://127.0.0.1:9999/chat");
        assert_eq!(config.chat.model, "sonar-pro");
        assert_eq!(config.chat.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[("NOTES_CHAT_MODEL", "  ")])).unwrap();
        assert_eq!(config.chat.model, CHAT_MODEL);
    }

    #[test]
    fn test_rejects_bad_timeout() {
        let err = Config::from_lookup(lookup_from(&[("NOTES_CHAT_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { .. }));

        let err =
            Config::from_lookup(lookup_from(&[("NOTES_CHAT_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { .. }));
    }

    #[test]
    fn test_rejects_insecure_remote_endpoint() {
        let err = Config::from_lookup(lookup_from(&[(
            "NOTES_CHAT_ENDPOINT",
            "http://api.perplexity.ai/chat/completions",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Endpoint(_)));
    }
}
