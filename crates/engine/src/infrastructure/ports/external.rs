//! Narration oracle port.

use async_trait::async_trait;

use airpg_domain::{ChatTurn, ConversationHistory};

use super::error::LlmError;

/// One chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    /// Sent ahead of `messages` with the system role
    pub system_prompt: Option<String>,
    /// Role-tagged conversation, oldest first
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Ask the server to constrain output (e.g. JSON mode)
    pub response_format: Option<ResponseFormat>,
}

impl LlmRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            system_prompt: None,
            messages,
            temperature: None,
            max_tokens: None,
            response_format: None,
        }
    }

    /// Request replaying a whole conversation.
    pub fn from_history(history: &ConversationHistory) -> Self {
        Self::new(history.turns().iter().map(ChatMessage::from).collect())
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    /// Append a message after the existing ones.
    pub fn push(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }
}

/// Output constraint hint for servers that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ChatTurn> for ChatMessage {
    fn from(turn: &ChatTurn) -> Self {
        match turn.role {
            airpg_domain::MessageRole::User => Self::user(turn.content.clone()),
            airpg_domain::MessageRole::Assistant => Self::assistant(turn.content.clone()),
        }
    }
}

/// Speaker of a conversation message. The system prompt travels separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A completed reply.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub content: String,
    pub finish_reason: FinishReason,
    /// Absent when the server does not report usage
    pub usage: Option<TokenUsage>,
}

impl LlmResponse {
    /// A plain, completed response without usage data.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: FinishReason::Stop,
            usage: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    /// Cut off by `max_tokens`; the reply block may be incomplete
    Length,
    ContentFilter,
    Unknown,
}

/// Token counts for one request, used for cost tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The narration oracle: any chat completion service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmPort: Send + Sync {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;
}
