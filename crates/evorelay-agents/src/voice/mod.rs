//! Speech capabilities: transcription of inbound voice notes and synthesis
//! of spoken replies.

mod stt;
mod tts;

pub use stt::WhisperStt;
pub use tts::{OpenAiTts, SpeechVoice};

use async_trait::async_trait;
use bytes::Bytes;
use evorelay_common::Result;

/// Speech-to-text provider.
#[async_trait]
pub trait SttProvider: Send + Sync {
    /// Provider identifier (e.g. "whisper").
    fn provider_id(&self) -> &str;

    /// Transcribe raw audio bytes into plain text.
    async fn transcribe(&self, audio: Bytes, file_name: &str) -> Result<String>;

    /// Download the audio at `url` and transcribe it.
    async fn transcribe_url(&self, url: &str) -> Result<String>;
}

/// Text-to-speech provider.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Provider identifier (e.g. "openai").
    fn provider_id(&self) -> &str;

    /// MIME type of the audio returned by [`synthesize`](Self::synthesize).
    fn mime_type(&self) -> &'static str;

    /// Convert text to encoded audio.
    async fn synthesize(&self, text: &str) -> Result<Bytes>;
}
