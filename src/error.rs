//! Error types for the notes client.
//!
//! Only the credential check and the chat path raise errors to callers.
//! Repository and session mutations treat missing ids as no-ops, and
//! storage failures are absorbed by the snapshot store.

use thiserror::Error;

/// Failure of a storage backend read or write.
///
/// Never escapes the snapshot store; callers see defaults instead.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Rejected login or registration attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Email and password are required")]
    Validation,
}

/// Failure of a chat query.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The credential variable is unset or empty. No request was attempted.
    #[error("Missing chat API key. Please set {var} in your environment.")]
    Configuration { var: String },

    /// The upstream service answered with a non-success status.
    #[error("chat request failed ({status}): {body}")]
    Upstream { status: u16, body: String },

    /// The endpoint could not be reached or the reply could not be read.
    #[error("chat transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ChatError {
    /// Short failure class for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::Configuration { .. } => "configuration",
            ChatError::Upstream { .. } => "upstream",
            ChatError::Transport(_) => "transport",
        }
    }

    /// Text suitable for inline display next to the chat input.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Transport(_) => {
                "Something went wrong while contacting the search service. Please try again."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Rejected send from the conversation widget.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("a request is already in flight")]
    Busy,
}

/// Invalid environment configuration, reported at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },

    #[error("invalid chat endpoint: {0}")]
    Endpoint(#[from] crate::endpoint::EndpointError),
}

/// Failure while bringing the application up.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_embeds_status_and_body() {
        let err = ChatError::Upstream {
            status: 500,
            body: "server error".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("server error"));
        assert_eq!(err.user_message(), msg);
    }

    #[test]
    fn configuration_message_names_the_variable() {
        let err = ChatError::Configuration {
            var: "PERPLEXITY_API_KEY".to_string(),
        };
        assert!(err.user_message().contains("PERPLEXITY_API_KEY"));
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn kind_distinguishes_failure_classes() {
        let upstream = ChatError::Upstream {
            status: 503,
            body: "Service Unavailable".to_string(),
        };
        assert_eq!(upstream.kind(), "upstream");
        let config = ChatError::Configuration {
            var: "KEY".to_string(),
        };
        assert_ne!(config.kind(), upstream.kind());
    }
}
