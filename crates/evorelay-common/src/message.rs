use serde::{Deserialize, Serialize};

/// Shape-independent representation of one inbound chat event.
///
/// Built by the payload normalizer and consumed right away by the reply
/// orchestrator. `kind == Audio` always carries a non-empty `audio_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMessage {
    pub sender: String,
    pub text: String,
    pub kind: MessageKind,
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Audio,
}

impl CanonicalMessage {
    pub fn text(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            kind: MessageKind::Text,
            audio_url: None,
        }
    }

    pub fn audio(sender: impl Into<String>, audio_url: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: String::new(),
            kind: MessageKind::Audio,
            audio_url: Some(audio_url.into()),
        }
    }

    /// True when there is nothing to reply to: a text message without text.
    pub fn is_blank(&self) -> bool {
        self.kind == MessageKind::Text && self.text.trim().is_empty()
    }
}

/// One role-tagged utterance in a stored conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}
