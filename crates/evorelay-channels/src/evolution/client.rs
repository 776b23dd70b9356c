use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::traits::{OutboundGateway, SendError};
use evorelay_common::{Error, Result};

/// Per-request timeout for every gateway call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_AUDIO_CAPTION: &str = "Resposta em áudio";

/// Error bodies are cut to this many bytes before they reach errors or logs.
const MAX_ERROR_BODY: usize = 512;

/// Substring of the gateway's validation error when it cannot read the media
/// field of a send request.
const MEDIA_REJECTION: &str = "must be a url or base64";

const AUDIO_FILE_NAME: &str = "reply.mp3";
const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// Request body shapes accepted by different Evolution API releases for a
/// voice reply, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AudioShape {
    WhatsAppAudio,
    FlatMedia,
    NestedMediaMessage,
    DataUriMedia,
}

const AUDIO_SHAPES: [AudioShape; 4] = [
    AudioShape::WhatsAppAudio,
    AudioShape::FlatMedia,
    AudioShape::NestedMediaMessage,
    AudioShape::DataUriMedia,
];

impl AudioShape {
    fn label(self) -> &'static str {
        match self {
            Self::WhatsAppAudio => "sendWhatsAppAudio",
            Self::FlatMedia => "sendMedia",
            Self::NestedMediaMessage => "sendMedia/mediaMessage",
            Self::DataUriMedia => "sendMedia/data-uri",
        }
    }

    fn endpoint(self) -> &'static str {
        match self {
            Self::WhatsAppAudio => "sendWhatsAppAudio",
            _ => "sendMedia",
        }
    }

    fn body(self, to: &str, encoded: &str, caption: &str) -> Value {
        match self {
            Self::WhatsAppAudio => json!({
                "number": to,
                "audio": encoded,
                "encoding": true,
            }),
            Self::FlatMedia => json!({
                "number": to,
                "mediatype": "audio",
                "mimetype": AUDIO_MIME_TYPE,
                "media": encoded,
                "fileName": AUDIO_FILE_NAME,
                "caption": caption,
            }),
            Self::NestedMediaMessage => json!({
                "number": to,
                "mediaMessage": {
                    "mediatype": "audio",
                    "media": encoded,
                    "fileName": AUDIO_FILE_NAME,
                    "caption": caption,
                },
            }),
            Self::DataUriMedia => json!({
                "number": to,
                "mediatype": "audio",
                "mimetype": AUDIO_MIME_TYPE,
                "media": format!("data:{AUDIO_MIME_TYPE};base64,{encoded}"),
                "fileName": AUDIO_FILE_NAME,
                "caption": caption,
            }),
        }
    }
}

/// REST client for one Evolution API instance.
#[derive(Clone)]
pub struct EvolutionClient {
    client: Client,
    base_url: String,
    api_key: String,
    instance: String,
    audio_caption: String,
}

impl std::fmt::Debug for EvolutionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvolutionClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("instance", &self.instance)
            .finish()
    }
}

impl EvolutionClient {
    pub fn new(base_url: &str, api_key: String, instance: String) -> Result<Self> {
        Self::with_timeout(base_url, api_key, instance, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        api_key: String,
        instance: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Channel(format!("failed to build evolution client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            instance,
            audio_caption: DEFAULT_AUDIO_CAPTION.to_string(),
        })
    }

    pub fn with_audio_caption(mut self, caption: impl Into<String>) -> Self {
        self.audio_caption = caption.into();
        self
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    fn message_url(&self, endpoint: &str) -> String {
        format!("{}/message/{endpoint}/{}", self.base_url, self.instance)
    }

    /// Current instance connection state as reported by the gateway
    /// (`open`, `connecting`, `close`, ...).
    pub async fn connection_state(&self) -> Result<String> {
        let url = format!(
            "{}/instance/connectionState/{}",
            self.base_url, self.instance
        );
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("evolution request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::Channel(classify(status, &body).to_string()));
        }

        let parsed: ConnectionStateResponse = serde_json::from_str(&body)?;
        Ok(parsed.instance.state)
    }

    /// POST a JSON body and classify any failure once, here.
    async fn post_json(&self, url: &str, body: &Value) -> std::result::Result<(), SendError> {
        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        debug!(
            status = status.as_u16(),
            body = %truncate_body(text.trim()),
            "evolution api response"
        );

        if status.is_success() {
            Ok(())
        } else {
            Err(classify(status, &text))
        }
    }
}

#[async_trait]
impl OutboundGateway for EvolutionClient {
    fn gateway_type(&self) -> &str {
        "evolution"
    }

    async fn send_text(&self, to: &str, text: &str) -> std::result::Result<(), SendError> {
        let body = json!({ "number": to, "text": text });
        self.post_json(&self.message_url("sendText"), &body).await
    }

    async fn send_audio(&self, to: &str, audio: &[u8]) -> std::result::Result<(), SendError> {
        let encoded = BASE64_STANDARD.encode(audio);
        debug!(to, base64_len = encoded.len(), "sending audio reply");

        let mut last_err = SendError::UnacceptableMedia("no audio shape attempted".into());
        for shape in AUDIO_SHAPES {
            let body = shape.body(to, &encoded, &self.audio_caption);
            match self.post_json(&self.message_url(shape.endpoint()), &body).await {
                Ok(()) => {
                    info!(shape = shape.label(), "audio reply delivered");
                    return Ok(());
                }
                Err(err) if err.is_unacceptable_media() => {
                    warn!(shape = shape.label(), error = %err, "audio shape rejected, trying next");
                    last_err = err;
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err)
    }
}

/// Map a non-2xx gateway response to a typed error.
fn classify(status: StatusCode, body: &str) -> SendError {
    let rejected_media = body.to_ascii_lowercase().contains(MEDIA_REJECTION);
    let body = truncate_body(body.trim());
    if rejected_media {
        SendError::UnacceptableMedia(body)
    } else {
        SendError::Status {
            status: status.as_u16(),
            body,
        }
    }
}

/// Cut `body` to at most [`MAX_ERROR_BODY`] bytes on a char boundary.
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

#[derive(Deserialize)]
struct ConnectionStateResponse {
    instance: ConnectionStateInstance,
}

#[derive(Deserialize)]
struct ConnectionStateInstance {
    #[serde(default)]
    state: String,
}
