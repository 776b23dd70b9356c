use async_trait::async_trait;
use evorelay_common::{ConversationTurn, Result, TurnRole};
use serde::{Deserialize, Serialize};

/// Trait for chat-completion integrations.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider identifier (e.g. "openai").
    fn provider_id(&self) -> &str;

    /// Send a completion request and return the candidate replies.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;

    /// Check if the provider is reachable and the key is accepted.
    async fn health_check(&self) -> Result<bool>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub system: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl LlmRequest {
    /// Build a request from a system preamble and stored turns, oldest first.
    pub fn from_turns(
        model: impl Into<String>,
        system: Option<String>,
        turns: &[ConversationTurn],
    ) -> Self {
        Self {
            model: model.into(),
            messages: turns.iter().map(ChatMessage::from).collect(),
            system,
            max_tokens: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl From<&ConversationTurn> for ChatMessage {
    fn from(turn: &ConversationTurn) -> Self {
        let role = match turn.role {
            TurnRole::User => ChatRole::User,
            TurnRole::Assistant => ChatRole::Assistant,
        };
        Self {
            role,
            content: turn.content.clone(),
        }
    }
}

/// Completion result. `choices` may be empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmResponse {
    pub choices: Vec<String>,
    pub model: String,
    pub usage: Option<Usage>,
}

impl LlmResponse {
    /// The first candidate, trimmed. `None` when absent or blank.
    pub fn reply_text(&self) -> Option<String> {
        self.choices
            .first()
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}
