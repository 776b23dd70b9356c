use std::sync::Arc;

use evorelay_agents::{LlmProvider, LlmRequest, SttProvider, TtsProvider};
use evorelay_channels::{NormalizeError, OutboundGateway, normalize};
use evorelay_common::{CanonicalMessage, ConversationTurn, MessageKind, SenderKey};
use evorelay_config::AppConfig;
use evorelay_db::{ConversationHistory, ConversationStore};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{RelayError, Stage};

/// External capabilities the orchestrator coordinates.
#[derive(Clone)]
pub struct Capabilities {
    pub llm: Arc<dyn LlmProvider>,
    pub stt: Arc<dyn SttProvider>,
    pub tts: Arc<dyn TtsProvider>,
    pub gateway: Arc<dyn OutboundGateway>,
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub model: String,
    pub system_prompt: String,
    pub audio_replies: bool,
}

impl RelaySettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.openai.model.clone(),
            system_prompt: config.relay.system_prompt.clone(),
            audio_replies: config.relay.audio_replies,
        }
    }
}

/// Result of handling one canonical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Skipped(SkipReason),
    Replied { audio_delivered: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Text message without text, or a voice note that transcribed to nothing.
    BlankText,
    /// The completion returned no usable choice.
    EmptyCompletion,
}

/// Turns inbound webhook events into text and voice replies.
///
/// History is read, extended and written back without locking, so two
/// concurrent events for the same sender race and the last save wins.
pub struct ReplyOrchestrator {
    capabilities: Capabilities,
    store: ConversationStore,
    settings: RelaySettings,
}

impl ReplyOrchestrator {
    pub fn new(
        capabilities: Capabilities,
        store: ConversationStore,
        settings: RelaySettings,
    ) -> Self {
        Self {
            capabilities,
            store,
            settings,
        }
    }

    /// Normalize a raw webhook body and reply to each record in order.
    ///
    /// Non-message events and self-sent messages produce no outcomes.
    #[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
    pub async fn handle_event(&self, raw: &[u8]) -> Result<Vec<ReplyOutcome>, RelayError> {
        let records = normalize(raw)?;
        if records.is_empty() {
            debug!("no actionable records in event");
        }

        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            outcomes.push(self.handle_message(record).await?);
        }
        Ok(outcomes)
    }

    #[instrument(skip_all, fields(sender = %message.sender, kind = ?message.kind))]
    pub async fn handle_message(
        &self,
        message: CanonicalMessage,
    ) -> Result<ReplyOutcome, RelayError> {
        let sender = SenderKey::parse(&message.sender).ok_or(NormalizeError::MissingSender)?;

        let text = match message.kind {
            MessageKind::Audio => {
                let url = message
                    .audio_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .ok_or(NormalizeError::MissingAudioReference)?;
                self.capabilities
                    .stt
                    .transcribe_url(url)
                    .await
                    .map_err(|e| RelayError::upstream(Stage::Transcription, e))?
            }
            MessageKind::Text => message.text,
        };

        let text = text.trim();
        if text.is_empty() {
            debug!("nothing to reply to");
            return Ok(ReplyOutcome::Skipped(SkipReason::BlankText));
        }

        let mut history = match self.store.load(&sender).await {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "failed to load history, continuing without it");
                ConversationHistory::new()
            }
        };
        history.push(ConversationTurn::user(text));

        let Some(reply) = self.complete(&history).await? else {
            info!("completion returned no reply");
            return Ok(ReplyOutcome::Skipped(SkipReason::EmptyCompletion));
        };

        history.push(ConversationTurn::assistant(reply.as_str()));
        if let Err(e) = self.store.save(&sender, &history).await {
            warn!(error = %e, "failed to save history");
        }

        self.capabilities
            .gateway
            .send_text(sender.as_str(), &reply)
            .await
            .map_err(RelayError::Delivery)?;
        info!(chars = reply.chars().count(), "text reply sent");

        if !self.settings.audio_replies {
            return Ok(ReplyOutcome::Replied {
                audio_delivered: false,
            });
        }
        let audio_delivered = self.send_voice_reply(&sender, &reply).await;
        Ok(ReplyOutcome::Replied { audio_delivered })
    }

    async fn complete(&self, history: &ConversationHistory) -> Result<Option<String>, RelayError> {
        let system = Some(self.settings.system_prompt.trim())
            .filter(|prompt| !prompt.is_empty())
            .map(str::to_string);
        let request = LlmRequest::from_turns(&self.settings.model, system, history.turns());

        let response = self
            .capabilities
            .llm
            .complete(&request)
            .await
            .map_err(|e| RelayError::upstream(Stage::Completion, e))?;
        Ok(response.reply_text())
    }

    /// Best effort. Failures are logged and reported as `false`.
    async fn send_voice_reply(&self, sender: &SenderKey, reply: &str) -> bool {
        let audio = match self.capabilities.tts.synthesize(reply).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(error = %e, "speech synthesis failed, skipping audio reply");
                return false;
            }
        };

        match self
            .capabilities
            .gateway
            .send_audio(sender.as_str(), &audio)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "audio reply failed");
                false
            }
        }
    }
}
