use async_trait::async_trait;
use thiserror::Error;

/// Errors from a single outbound gateway call, classified once at the HTTP
/// boundary of the client.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("gateway request failed: {0}")]
    Transport(String),

    #[error("gateway error: {status} - {body}")]
    Status { status: u16, body: String },

    /// The gateway rejected the media field of the request body. Callers may
    /// retry the same content in a different body shape.
    #[error("gateway rejected media payload: {0}")]
    UnacceptableMedia(String),
}

impl SendError {
    pub fn is_unacceptable_media(&self) -> bool {
        matches!(self, Self::UnacceptableMedia(_))
    }
}

/// Send-only interface for delivering replies through the messaging gateway.
///
/// Designed to be wrapped in `Arc` and shared across request tasks.
#[async_trait]
pub trait OutboundGateway: Send + Sync {
    /// Unique identifier for this gateway type.
    fn gateway_type(&self) -> &str;

    /// Send a plain text message to `to` (a normalized sender key).
    async fn send_text(&self, to: &str, text: &str) -> Result<(), SendError>;

    /// Send an mp3 voice reply to `to`.
    async fn send_audio(&self, to: &str, audio: &[u8]) -> Result<(), SendError>;
}
