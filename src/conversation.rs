//! Chat widget state: the message log and the busy flag.
//!
//! Sending is split in two so no lock or borrow has to be held across the
//! network round trip: [`Conversation::begin_send`] records the user message
//! and raises the busy flag, [`Conversation::complete`] lowers it and records
//! the outcome. Messages live only as long as the conversation value.

use uuid::Uuid;

use crate::error::{ChatError, ConversationError};
use crate::models::{ChatAnswer, ChatMessage, Role};

pub const WELCOME_ID: &str = "welcome";
pub const WELCOME_TEXT: &str = "Hi! I can search the web and summarize results. \
Ask me anything like \u{201c}What\u{2019}s the latest on React 18 features?\u{201d}";
pub const NO_ANSWER_TEXT: &str = "I couldn't find an answer.";

/// Ticket for a send in flight; hand it back to [`Conversation::complete`].
#[derive(Debug, PartialEq, Eq)]
pub struct PendingAsk {
    prompt: String,
}

impl PendingAsk {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    busy: bool,
    last_error: Option<String>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage {
                id: WELCOME_ID.to_string(),
                role: Role::Assistant,
                content: WELCOME_TEXT.to_string(),
                citations: Vec::new(),
            }],
            busy: false,
            last_error: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Append the user's message and mark the conversation busy.
    pub fn begin_send(&mut self, input: &str) -> Result<PendingAsk, ConversationError> {
        if self.busy {
            return Err(ConversationError::Busy);
        }
        let prompt = input.trim();
        if prompt.is_empty() {
            return Err(ConversationError::EmptyPrompt);
        }

        self.last_error = None;
        self.messages.push(ChatMessage {
            id: next_message_id(),
            role: Role::User,
            content: prompt.to_string(),
            citations: Vec::new(),
        });
        self.busy = true;
        Ok(PendingAsk {
            prompt: prompt.to_string(),
        })
    }

    /// Record the outcome of a send and clear the busy flag.
    ///
    /// Failures are kept as display text and add no message.
    pub fn complete(&mut self, _pending: PendingAsk, result: Result<ChatAnswer, ChatError>) {
        self.busy = false;
        match result {
            Ok(answer) => {
                let content = if answer.text.is_empty() {
                    NO_ANSWER_TEXT.to_string()
                } else {
                    answer.text
                };
                self.messages.push(ChatMessage {
                    id: next_message_id(),
                    role: Role::Assistant,
                    content,
                    citations: answer.citations,
                });
            }
            Err(e) => {
                self.last_error = Some(e.user_message());
            }
        }
    }
}

fn next_message_id() -> String {
    Uuid::new_v4().simple().to_string()
}
