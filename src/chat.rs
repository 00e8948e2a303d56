//! Chat query service: web-search-capable completions with source citations.
//!
//! Sends a two-turn conversation (fixed system instruction + user prompt) to
//! an OpenAI-style completions endpoint and normalizes the reply into
//! [`ChatAnswer`]. The upstream schema drifts, so citations are looked up
//! through an ordered list of extraction strategies.

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::env;

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::models::{AskOptions, ChatAnswer, Citation};

#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

const FALLBACK_CITATION_TITLE: &str = "Source";

// ============================================================================
// Request
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    top_k: u32,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

pub(crate) fn build_request<'a>(
    config: &'a ChatConfig,
    prompt: &'a str,
    options: AskOptions,
) -> CompletionRequest<'a> {
    CompletionRequest {
        model: &config.model,
        messages: vec![
            RequestMessage {
                role: "system",
                content: &config.system_prompt,
            },
            RequestMessage {
                role: "user",
                content: prompt,
            },
        ],
        top_k: options.top_k,
    }
}

/// Read the bearer credential. Looked up on every call so a key exported
/// after startup is picked up.
fn read_api_key(var: &str) -> Result<String, ChatError> {
    env::var(var)
        .ok()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ChatError::Configuration {
            var: var.to_string(),
        })
}

// ============================================================================
// Client
// ============================================================================

pub struct ChatClient {
    http: reqwest::Client,
    config: ChatConfig,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("notes-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Ask one question and wait for the full reply.
    ///
    /// Fails with [`ChatError::Configuration`] before touching the network
    /// when the credential is missing.
    pub async fn ask(&self, prompt: &str, options: AskOptions) -> Result<ChatAnswer, ChatError> {
        let api_key = read_api_key(&self.config.api_key_var)?;
        let body = build_request(&self.config, prompt, options);

        debug!(
            "event=chat_request module=chat status=sending model={} top_k={}",
            self.config.model, options.top_k
        );
        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let reason = if !text.is_empty() {
                text
            } else {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            };
            warn!(
                "event=chat_request module=chat status=upstream_error http_status={}",
                status.as_u16()
            );
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                body: reason,
            });
        }

        let data: Value = response.json().await?;
        let answer = normalize_response(&data);
        info!(
            "event=chat_request module=chat status=ok http_status={} citations={}",
            status.as_u16(),
            answer.citations.len()
        );
        Ok(answer)
    }
}

// ============================================================================
// Response normalization
// ============================================================================

type CitationSource = fn(&Value) -> Option<&Vec<Value>>;

/// Places citations have been seen in upstream replies, in lookup order.
const CITATION_SOURCES: [(&str, CitationSource); 4] = [
    ("citations", top_level_citations),
    ("choices[0].citations", choice_citations),
    ("sources", top_level_sources),
    ("choices[0].sources", choice_sources),
];

fn first_choice(data: &Value) -> Option<&Value> {
    data.get("choices")?.get(0)
}

fn top_level_citations(data: &Value) -> Option<&Vec<Value>> {
    data.get("citations")?.as_array()
}

fn choice_citations(data: &Value) -> Option<&Vec<Value>> {
    first_choice(data)?.get("citations")?.as_array()
}

fn top_level_sources(data: &Value) -> Option<&Vec<Value>> {
    data.get("sources")?.as_array()
}

fn choice_sources(data: &Value) -> Option<&Vec<Value>> {
    first_choice(data)?.get("sources")?.as_array()
}

/// Reply text from `choices[0].message.content`, or empty.
pub fn extract_text(data: &Value) -> String {
    first_choice(data)
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

/// First array-typed citation field, in [`CITATION_SOURCES`] order.
pub fn extract_raw_citations(data: &Value) -> &[Value] {
    for (name, source) in CITATION_SOURCES {
        if let Some(raw) = source(data) {
            debug!(
                "event=chat_citations module=chat source={} count={}",
                name,
                raw.len()
            );
            return raw;
        }
    }
    &[]
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key)?.as_str().filter(|s| !s.is_empty())
}

pub fn normalize_citation(raw: &Value) -> Citation {
    if let Value::String(s) = raw {
        return Citation {
            title: s.clone(),
            url: s.clone(),
            snippet: String::new(),
        };
    }

    let url = non_empty_str(raw, "url");
    let title = non_empty_str(raw, "title")
        .or(url)
        .unwrap_or(FALLBACK_CITATION_TITLE);
    let snippet = non_empty_str(raw, "snippet")
        .or_else(|| non_empty_str(raw, "description"))
        .unwrap_or("");

    Citation {
        title: title.to_string(),
        url: url.unwrap_or("").to_string(),
        snippet: snippet.to_string(),
    }
}

pub fn normalize_response(data: &Value) -> ChatAnswer {
    ChatAnswer {
        text: extract_text(data),
        citations: extract_raw_citations(data)
            .iter()
            .map(normalize_citation)
            .collect(),
    }
}
