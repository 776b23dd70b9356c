//! OpenAI text-to-speech.

use async_trait::async_trait;
use bytes::Bytes;
use evorelay_common::{Error, Result};
use reqwest::Client;
use serde::Serialize;

use super::TtsProvider;
use crate::openai::DEFAULT_BASE_URL;

/// Default model (real-time optimized).
const DEFAULT_MODEL: &str = "tts-1";

/// Voices the speech endpoint accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpeechVoice {
    #[default]
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

impl SpeechVoice {
    /// Case-insensitive lookup; unknown or empty names fall back to `Alloy`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "echo" => Self::Echo,
            "fable" => Self::Fable,
            "onyx" => Self::Onyx,
            "nova" => Self::Nova,
            "shimmer" => Self::Shimmer,
            _ => Self::Alloy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Echo => "echo",
            Self::Fable => "fable",
            Self::Onyx => "onyx",
            Self::Nova => "nova",
            Self::Shimmer => "shimmer",
        }
    }
}

/// OpenAI TTS provider producing mp3.
#[derive(Clone)]
pub struct OpenAiTts {
    client: Client,
    api_key: String,
    base_url: String,
    voice: SpeechVoice,
    model: String,
}

impl std::fmt::Debug for OpenAiTts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiTts")
            .field("api_key", &"[REDACTED]")
            .field("voice", &self.voice)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiTts {
    pub fn new(
        client: Client,
        api_key: String,
        base_url: Option<String>,
        voice: SpeechVoice,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            voice,
            model: DEFAULT_MODEL.into(),
        }
    }
}

#[async_trait]
impl TtsProvider for OpenAiTts {
    fn provider_id(&self) -> &str {
        "openai"
    }

    fn mime_type(&self) -> &'static str {
        "audio/mpeg"
    }

    async fn synthesize(&self, text: &str) -> Result<Bytes> {
        let body = TtsRequest {
            model: &self.model,
            input: text,
            voice: self.voice.as_str(),
            response_format: "mp3",
        };

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Agent(format!("OpenAI TTS request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Agent(format!(
                "OpenAI TTS request failed: {status} - {}",
                body.trim()
            )));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| Error::Agent(format!("failed to read OpenAI TTS response: {e}")))?;
        if data.is_empty() {
            return Err(Error::Agent("OpenAI TTS returned no audio".to_string()));
        }
        Ok(data)
    }
}

// ── API Types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}
