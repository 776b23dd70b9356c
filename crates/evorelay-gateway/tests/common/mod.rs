#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use evorelay_agents::{LlmProvider, LlmRequest, LlmResponse, SttProvider, TtsProvider};
use evorelay_channels::{OutboundGateway, SendError};
use evorelay_common::{Error, Result};
use evorelay_db::{ConversationStore, MemoryBackend};
use evorelay_gateway::{Capabilities, RelaySettings, ReplyOrchestrator};

pub const SYSTEM_PROMPT: &str = "Responda de forma breve.";
pub const REPLY: &str = "Olá! Como posso ajudar?";

pub struct MockLlm {
    reply: std::result::Result<Option<String>, String>,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn replying(text: &str) -> Self {
        Self::with(Ok(Some(text.to_string())))
    }

    pub fn empty() -> Self {
        Self::with(Ok(None))
    }

    pub fn failing() -> Self {
        Self::with(Err("OpenAI API error: 500".to_string()))
    }

    fn with(reply: std::result::Result<Option<String>, String>) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    fn provider_id(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            Ok(reply) => Ok(LlmResponse {
                choices: reply.iter().cloned().collect(),
                model: "mock-model".into(),
                usage: None,
            }),
            Err(e) => Err(Error::Agent(e.clone())),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

pub struct MockStt {
    transcript: std::result::Result<String, String>,
    pub urls: Mutex<Vec<String>>,
}

impl MockStt {
    pub fn transcribing(text: &str) -> Self {
        Self {
            transcript: Ok(text.to_string()),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            transcript: Err("download audio: error sending request".to_string()),
            urls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SttProvider for MockStt {
    fn provider_id(&self) -> &str {
        "mock"
    }

    async fn transcribe(&self, _audio: Bytes, _file_name: &str) -> Result<String> {
        self.transcript.clone().map_err(Error::Agent)
    }

    async fn transcribe_url(&self, url: &str) -> Result<String> {
        self.urls.lock().unwrap().push(url.to_string());
        self.transcript.clone().map_err(Error::Agent)
    }
}

pub struct MockTts {
    fail: bool,
    pub calls: AtomicUsize,
}

impl MockTts {
    pub fn working() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TtsProvider for MockTts {
    fn provider_id(&self) -> &str {
        "mock"
    }

    fn mime_type(&self) -> &'static str {
        "audio/mpeg"
    }

    async fn synthesize(&self, _text: &str) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Agent("OpenAI TTS request failed: 500".into()));
        }
        Ok(Bytes::from_static(b"ID3-mp3"))
    }
}

#[derive(Default)]
pub struct MockGateway {
    fail_text: bool,
    fail_audio: bool,
    pub texts: Mutex<Vec<(String, String)>>,
    pub audios: Mutex<Vec<(String, usize)>>,
}

impl MockGateway {
    pub fn working() -> Self {
        Self::default()
    }

    pub fn failing_text() -> Self {
        Self {
            fail_text: true,
            ..Self::default()
        }
    }

    pub fn failing_audio() -> Self {
        Self {
            fail_audio: true,
            ..Self::default()
        }
    }

    pub fn texts(&self) -> Vec<(String, String)> {
        self.texts.lock().unwrap().clone()
    }

    pub fn audio_count(&self) -> usize {
        self.audios.lock().unwrap().len()
    }
}

#[async_trait]
impl OutboundGateway for MockGateway {
    fn gateway_type(&self) -> &str {
        "mock"
    }

    async fn send_text(&self, to: &str, text: &str) -> std::result::Result<(), SendError> {
        if self.fail_text {
            return Err(SendError::Status {
                status: 500,
                body: "internal error".into(),
            });
        }
        self.texts
            .lock()
            .unwrap()
            .push((to.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_audio(&self, to: &str, audio: &[u8]) -> std::result::Result<(), SendError> {
        self.audios
            .lock()
            .unwrap()
            .push((to.to_string(), audio.len()));
        if self.fail_audio {
            return Err(SendError::UnacceptableMedia(
                "Owned media must be a url or base64".into(),
            ));
        }
        Ok(())
    }
}

/// Mock capabilities plus an in-memory history backend.
pub struct Mocks {
    pub llm: Arc<MockLlm>,
    pub stt: Arc<MockStt>,
    pub tts: Arc<MockTts>,
    pub gateway: Arc<MockGateway>,
    pub backend: Arc<MemoryBackend>,
    pub audio_replies: bool,
}

impl Mocks {
    pub fn new() -> Self {
        Self {
            llm: Arc::new(MockLlm::replying(REPLY)),
            stt: Arc::new(MockStt::transcribing("bom dia")),
            tts: Arc::new(MockTts::working()),
            gateway: Arc::new(MockGateway::working()),
            backend: Arc::new(MemoryBackend::new()),
            audio_replies: true,
        }
    }

    pub fn store(&self) -> ConversationStore {
        ConversationStore::new(self.backend.clone())
    }

    pub fn orchestrator(&self) -> ReplyOrchestrator {
        let capabilities = Capabilities {
            llm: self.llm.clone(),
            stt: self.stt.clone(),
            tts: self.tts.clone(),
            gateway: self.gateway.clone(),
        };
        let settings = RelaySettings {
            model: "gpt-4o-mini".into(),
            system_prompt: SYSTEM_PROMPT.into(),
            audio_replies: self.audio_replies,
        };
        ReplyOrchestrator::new(capabilities, self.store(), settings)
    }
}

pub fn upsert_event(remote_jid: &str, text: &str) -> Vec<u8> {
    serde_json::json!({
        "event": "messages.upsert",
        "instance": "bot",
        "data": {
            "messages": [{
                "key": {"remoteJid": remote_jid, "fromMe": false, "id": "3EB0"},
                "message": {"conversation": text},
                "messageType": "conversation",
                "pushName": "Ana"
            }]
        }
    })
    .to_string()
    .into_bytes()
}

pub fn audio_event(url: &str) -> Vec<u8> {
    serde_json::json!({
        "message": {
            "from": "5511999@c.us",
            "type": "ptt",
            "audio": {"url": url}
        }
    })
    .to_string()
    .into_bytes()
}
