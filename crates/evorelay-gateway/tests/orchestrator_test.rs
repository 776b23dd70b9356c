mod common;

use std::sync::Arc;

use common::*;
use evorelay_agents::ChatRole;
use evorelay_channels::NormalizeError;
use evorelay_common::{ConversationTurn, SenderKey};
use evorelay_db::ConversationHistory;
use evorelay_gateway::{RelayError, ReplyOutcome, SkipReason, Stage};
use serde_json::json;

fn sender() -> SenderKey {
    SenderKey::parse("5511999").unwrap()
}

#[tokio::test]
async fn test_upsert_text_round_trip() {
    let mocks = Mocks::new();
    let orchestrator = mocks.orchestrator();

    let outcomes = orchestrator
        .handle_event(&upsert_event("5511999@s.whatsapp.net", "oi"))
        .await
        .unwrap();

    assert_eq!(outcomes, vec![ReplyOutcome::Replied { audio_delivered: true }]);

    let requests = mocks.llm.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].system.as_deref(), Some(SYSTEM_PROMPT));
    assert_eq!(requests[0].model, "gpt-4o-mini");
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[0].messages[0].role, ChatRole::User);
    assert_eq!(requests[0].messages[0].content, "oi");

    assert_eq!(
        mocks.gateway.texts(),
        vec![("5511999".to_string(), REPLY.to_string())]
    );
    assert_eq!(mocks.gateway.audio_count(), 1);

    let history = mocks.store().load(&sender()).await.unwrap();
    assert_eq!(
        history.turns(),
        &[ConversationTurn::user("oi"), ConversationTurn::assistant(REPLY)]
    );
}

#[tokio::test]
async fn test_prior_history_is_sent_oldest_first() {
    let mocks = Mocks::new();
    let store = mocks.store();
    let prior = ConversationHistory::from(vec![
        ConversationTurn::user("qual seu nome?"),
        ConversationTurn::assistant("Sou um assistente."),
    ]);
    store.save(&sender(), &prior).await.unwrap();

    mocks
        .orchestrator()
        .handle_event(&upsert_event("5511999@s.whatsapp.net", "e o meu?"))
        .await
        .unwrap();

    let requests = mocks.llm.requests.lock().unwrap().clone();
    let contents: Vec<_> = requests[0].messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["qual seu nome?", "Sou um assistente.", "e o meu?"]);
    assert_eq!(store.load(&sender()).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_history_is_capped_at_twenty_turns() {
    let mocks = Mocks::new();
    let orchestrator = mocks.orchestrator();

    for i in 0..12 {
        orchestrator
            .handle_event(&upsert_event("5511999@s.whatsapp.net", &format!("mensagem {i}")))
            .await
            .unwrap();
    }

    let history = mocks.store().load(&sender()).await.unwrap();
    assert_eq!(history.len(), 20);
    assert_eq!(history.turns()[0], ConversationTurn::user("mensagem 2"));
    assert_eq!(history.turns()[19], ConversationTurn::assistant(REPLY));
}

#[tokio::test]
async fn test_text_send_failure_skips_audio() {
    let mut mocks = Mocks::new();
    mocks.gateway = Arc::new(MockGateway::failing_text());

    let err = mocks
        .orchestrator()
        .handle_event(&upsert_event("5511999@s.whatsapp.net", "oi"))
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::Delivery(_)), "unexpected: {err:?}");
    assert_eq!(mocks.tts.call_count(), 0);
    assert_eq!(mocks.gateway.audio_count(), 0);
}

#[tokio::test]
async fn test_speech_failure_still_succeeds() {
    let mut mocks = Mocks::new();
    mocks.tts = Arc::new(MockTts::failing());

    let outcomes = mocks
        .orchestrator()
        .handle_event(&upsert_event("5511999@s.whatsapp.net", "oi"))
        .await
        .unwrap();

    assert_eq!(outcomes, vec![ReplyOutcome::Replied { audio_delivered: false }]);
    assert_eq!(mocks.gateway.texts().len(), 1);
    assert_eq!(mocks.gateway.audio_count(), 0);
}

#[tokio::test]
async fn test_audio_send_failure_still_succeeds() {
    let mut mocks = Mocks::new();
    mocks.gateway = Arc::new(MockGateway::failing_audio());

    let outcomes = mocks
        .orchestrator()
        .handle_event(&upsert_event("5511999@s.whatsapp.net", "oi"))
        .await
        .unwrap();

    assert_eq!(outcomes, vec![ReplyOutcome::Replied { audio_delivered: false }]);
    assert_eq!(mocks.gateway.audio_count(), 1);
}

#[tokio::test]
async fn test_audio_replies_can_be_disabled() {
    let mut mocks = Mocks::new();
    mocks.audio_replies = false;

    let outcomes = mocks
        .orchestrator()
        .handle_event(&upsert_event("5511999@s.whatsapp.net", "oi"))
        .await
        .unwrap();

    assert_eq!(outcomes, vec![ReplyOutcome::Replied { audio_delivered: false }]);
    assert_eq!(mocks.tts.call_count(), 0);
}

#[tokio::test]
async fn test_voice_note_is_transcribed() {
    let mocks = Mocks::new();

    mocks
        .orchestrator()
        .handle_event(&audio_event("https://media.example/voice.ogg"))
        .await
        .unwrap();

    assert_eq!(
        mocks.stt.urls.lock().unwrap().as_slice(),
        ["https://media.example/voice.ogg".to_string()]
    );
    let requests = mocks.llm.requests.lock().unwrap().clone();
    assert_eq!(requests[0].messages[0].content, "bom dia");
    assert_eq!(mocks.gateway.texts()[0].0, "5511999");
}

#[tokio::test]
async fn test_unreachable_audio_fails_without_dispatch() {
    let mut mocks = Mocks::new();
    mocks.stt = Arc::new(MockStt::unreachable());

    let err = mocks
        .orchestrator()
        .handle_event(&audio_event("http://127.0.0.1:9/missing.ogg"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, RelayError::Upstream { stage: Stage::Transcription, .. }),
        "unexpected: {err:?}"
    );
    assert_eq!(mocks.llm.calls(), 0);
    assert!(mocks.gateway.texts().is_empty());
    assert!(mocks.backend.is_empty());
}

#[tokio::test]
async fn test_blank_transcription_is_a_no_op() {
    let mut mocks = Mocks::new();
    mocks.stt = Arc::new(MockStt::transcribing("   "));

    let outcomes = mocks
        .orchestrator()
        .handle_event(&audio_event("https://media.example/silence.ogg"))
        .await
        .unwrap();

    assert_eq!(outcomes, vec![ReplyOutcome::Skipped(SkipReason::BlankText)]);
    assert_eq!(mocks.llm.calls(), 0);
}

#[tokio::test]
async fn test_blank_text_is_a_no_op() {
    let mocks = Mocks::new();

    let outcomes = mocks
        .orchestrator()
        .handle_event(&upsert_event("5511999@s.whatsapp.net", "  "))
        .await
        .unwrap();

    assert_eq!(outcomes, vec![ReplyOutcome::Skipped(SkipReason::BlankText)]);
    assert_eq!(mocks.llm.calls(), 0);
}

#[tokio::test]
async fn test_empty_completion_sends_nothing() {
    let mut mocks = Mocks::new();
    mocks.llm = Arc::new(MockLlm::empty());

    let outcomes = mocks
        .orchestrator()
        .handle_event(&upsert_event("5511999@s.whatsapp.net", "oi"))
        .await
        .unwrap();

    assert_eq!(outcomes, vec![ReplyOutcome::Skipped(SkipReason::EmptyCompletion)]);
    assert!(mocks.gateway.texts().is_empty());
    assert!(mocks.backend.is_empty());
}

#[tokio::test]
async fn test_completion_failure_is_upstream_error() {
    let mut mocks = Mocks::new();
    mocks.llm = Arc::new(MockLlm::failing());

    let err = mocks
        .orchestrator()
        .handle_event(&upsert_event("5511999@s.whatsapp.net", "oi"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, RelayError::Upstream { stage: Stage::Completion, .. }),
        "unexpected: {err:?}"
    );
    assert!(mocks.gateway.texts().is_empty());
}

#[tokio::test]
async fn test_store_failure_degrades_to_empty_history() {
    let mocks = Mocks::new();
    mocks.store().close().await.unwrap();

    let outcomes = mocks
        .orchestrator()
        .handle_event(&upsert_event("5511999@s.whatsapp.net", "oi"))
        .await
        .unwrap();

    assert_eq!(outcomes, vec![ReplyOutcome::Replied { audio_delivered: true }]);
    assert_eq!(mocks.llm.requests.lock().unwrap()[0].messages.len(), 1);
}

#[tokio::test]
async fn test_self_sent_batch_is_ignored() {
    let mocks = Mocks::new();
    let event = json!({
        "event": "messages.upsert",
        "data": {"messages": [
            {"key": {"remoteJid": "5511999@s.whatsapp.net", "fromMe": true},
             "message": {"conversation": "eco"}}
        ]}
    });

    let outcomes = mocks
        .orchestrator()
        .handle_event(event.to_string().as_bytes())
        .await
        .unwrap();

    assert!(outcomes.is_empty());
    assert_eq!(mocks.llm.calls(), 0);
}

#[tokio::test]
async fn test_batch_replies_to_each_sender_in_order() {
    let mocks = Mocks::new();
    let event = json!({
        "event": "MESSAGES_UPSERT",
        "data": {"messages": [
            {"key": {"remoteJid": "5511111@s.whatsapp.net"}, "message": {"conversation": "um"}},
            {"key": {"remoteJid": "5522222@s.whatsapp.net"}, "message": {"conversation": "dois"}}
        ]}
    });

    let outcomes = mocks
        .orchestrator()
        .handle_event(event.to_string().as_bytes())
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    let recipients: Vec<_> = mocks.gateway.texts().into_iter().map(|(to, _)| to).collect();
    assert_eq!(recipients, ["5511111", "5522222"]);
}

#[tokio::test]
async fn test_missing_sender_is_rejected() {
    let mocks = Mocks::new();
    let event = json!({"event": "messages.upsert", "data": {"message": {"conversation": "oi"}}});

    let err = mocks
        .orchestrator()
        .handle_event(event.to_string().as_bytes())
        .await
        .unwrap_err();

    assert!(
        matches!(err, RelayError::Normalize(NormalizeError::MissingSender)),
        "unexpected: {err:?}"
    );
}
