//! OpenAI Whisper transcription.

use async_trait::async_trait;
use bytes::Bytes;
use evorelay_common::{Error, Result};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::SttProvider;
use crate::openai::DEFAULT_BASE_URL;

/// Default Whisper model.
const DEFAULT_MODEL: &str = "whisper-1";

/// WhatsApp voice notes arrive as ogg/opus.
const DEFAULT_FILE_NAME: &str = "audio.ogg";

/// OpenAI Whisper STT provider.
#[derive(Clone)]
pub struct WhisperStt {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for WhisperStt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperStt")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl WhisperStt {
    pub fn new(client: Client, api_key: String, base_url: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: DEFAULT_MODEL.into(),
        }
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Agent(format!("download audio: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Agent(format!("download audio: status {status}")));
        }

        response
            .bytes()
            .await
            .map_err(|e| Error::Agent(format!("download audio: {e}")))
    }
}

#[async_trait]
impl SttProvider for WhisperStt {
    fn provider_id(&self) -> &str {
        "whisper"
    }

    async fn transcribe(&self, audio: Bytes, file_name: &str) -> Result<String> {
        let file_part = Part::bytes(audio.to_vec()).file_name(file_name.to_string());
        let form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "text");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Agent(format!("Whisper request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Agent(format!(
                "Whisper transcription failed: {status} - {}",
                body.trim()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::Agent(format!("Failed to read Whisper response: {e}")))?;
        Ok(text.trim().to_string())
    }

    async fn transcribe_url(&self, url: &str) -> Result<String> {
        let audio = self.download(url).await?;
        debug!(bytes = audio.len(), "downloaded voice note");
        self.transcribe(audio, DEFAULT_FILE_NAME).await
    }
}
