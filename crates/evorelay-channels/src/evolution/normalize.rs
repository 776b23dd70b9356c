//! Webhook payload normalization.
//!
//! Evolution delivers the same logical event in several JSON shapes:
//!
//! - a single record under `data` (`MESSAGES_UPSERT`, `message_create`, ...)
//! - an upsert batch, `data.messages[]`, one entry per message
//! - vendor-nested `message_create`, where `data` is the message itself
//! - the legacy direct shape `{ "message": { "from", "type", "body" } }`
//!
//! Every shape is reduced to [`CanonicalMessage`] records by walking ordered
//! lists of JSON pointers and taking the first non-blank string.

use evorelay_common::{CanonicalMessage, SenderKey};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("missing sender id")]
    MissingSender,

    #[error("audio message missing url")]
    MissingAudioReference,
}

/// Text candidates, in priority order.
const TEXT_POINTERS: &[&str] = &[
    "/message/body",
    "/message/conversation",
    "/message/text",
    "/message/extendedText",
    "/message/extendedTextMessage/text",
    "/message/buttonsResponseMessage/selectedDisplayText",
    "/message/buttonsResponseMessage/selectedButtonId",
    "/message/interactiveResponseMessage/body/text",
];

/// Sender candidates, in priority order. Each is normalized before the
/// emptiness check.
const SENDER_POINTERS: &[&str] = &[
    "/message/from",
    "/sender",
    "/message/remoteJid",
    "/message/chatId",
    "/key/remoteJid",
    "/remoteJid",
    "/chatId",
];

const KIND_POINTERS: &[&str] = &["/message/type", "/messageType"];

const AUDIO_URL_POINTERS: &[&str] = &["/message/audio/url", "/message/mediaUrl"];

const FROM_ME_POINTERS: &[&str] = &["/key/fromMe", "/fromMe", "/message/fromMe"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    /// One record in `data`, or a `data.messages[]` batch.
    Upsert,
    /// One record in `data`; `data` may be the bare message.
    Create,
    /// One record in `data`.
    Message,
    /// Anything else (`connection.update`, `qrcode.updated`, ...).
    Other,
}

impl EventKind {
    fn parse(name: &str) -> Self {
        let canonical = name.trim().to_ascii_lowercase().replace('_', ".");
        match canonical.as_str() {
            "messages.upsert" => Self::Upsert,
            "message.create" => Self::Create,
            "message" | "message.upsert" | "messages.create" => Self::Message,
            _ => Self::Other,
        }
    }
}

/// Parse raw webhook bytes into zero or more canonical records.
///
/// Self-sent entries (`fromMe`) and non-message events produce no records.
/// A single unusable entry fails the whole payload.
pub fn normalize(raw: &[u8]) -> Result<Vec<CanonicalMessage>, NormalizeError> {
    let envelope: Value = serde_json::from_slice(raw)
        .map_err(|e| NormalizeError::MalformedPayload(e.to_string()))?;
    let Value::Object(envelope) = envelope else {
        return Err(NormalizeError::MalformedPayload(
            "envelope is not a JSON object".into(),
        ));
    };

    let event = envelope.get("event").and_then(Value::as_str);
    let data = envelope.get("data");

    let (kind, data) = match (event, data) {
        // Legacy direct shape: the envelope is the record.
        (None, None) if envelope.get("message").is_some_and(Value::is_object) => {
            return single(&Value::Object(envelope));
        }
        (None, None) => {
            return Err(NormalizeError::MalformedPayload(
                "payload has neither event data nor message".into(),
            ));
        }
        (Some(name), data) => (EventKind::parse(name), data),
        (None, data) => (EventKind::Message, data),
    };

    if kind == EventKind::Other {
        debug!(event = event.unwrap_or_default(), "ignoring non-message event");
        return Ok(Vec::new());
    }

    let data = match data {
        Some(Value::Object(data)) => data,
        Some(_) => {
            return Err(NormalizeError::MalformedPayload(
                "event data is not a JSON object".into(),
            ));
        }
        None => {
            return Err(NormalizeError::MalformedPayload(
                "message event without data".into(),
            ));
        }
    };

    match kind {
        EventKind::Upsert => match data.get("messages") {
            Some(Value::Array(entries)) => batch(entries),
            Some(_) => Err(NormalizeError::MalformedPayload(
                "upsert messages is not an array".into(),
            )),
            None => single(&Value::Object(data.clone())),
        },
        EventKind::Create if !data.get("message").is_some_and(Value::is_object) => {
            single(&nest_bare_message(data))
        }
        _ => single(&Value::Object(data.clone())),
    }
}

fn batch(entries: &[Value]) -> Result<Vec<CanonicalMessage>, NormalizeError> {
    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        if !entry.is_object() {
            return Err(NormalizeError::MalformedPayload(
                "upsert entry is not a JSON object".into(),
            ));
        }
        if is_from_me(entry) {
            continue;
        }
        records.push(record(entry)?);
    }
    Ok(records)
}

fn single(record_value: &Value) -> Result<Vec<CanonicalMessage>, NormalizeError> {
    if is_from_me(record_value) {
        debug!("ignoring self-sent message");
        return Ok(Vec::new());
    }
    record(record_value).map(|message| vec![message])
}

/// `message_create` from some gateway builds puts the message fields directly
/// in `data`. Re-nest them so the same pointers apply.
fn nest_bare_message(data: &Map<String, Value>) -> Value {
    let mut record = Map::new();
    record.insert("message".into(), Value::Object(data.clone()));
    for field in ["key", "sender", "messageType"] {
        if let Some(value) = data.get(field) {
            record.insert(field.into(), value.clone());
        }
    }
    Value::Object(record)
}

fn record(record: &Value) -> Result<CanonicalMessage, NormalizeError> {
    let sender = resolve_sender(record).ok_or(NormalizeError::MissingSender)?;

    let kind = first_non_blank(record, KIND_POINTERS)
        .map(|kind| kind.to_ascii_lowercase())
        .unwrap_or_default();

    if matches!(kind.as_str(), "audio" | "ptt") {
        let url = first_non_blank(record, AUDIO_URL_POINTERS)
            .ok_or(NormalizeError::MissingAudioReference)?;
        return Ok(CanonicalMessage::audio(sender.into_inner(), url));
    }

    let text = first_non_blank(record, TEXT_POINTERS).unwrap_or_default();
    Ok(CanonicalMessage::text(sender.into_inner(), text))
}

fn resolve_sender(record: &Value) -> Option<SenderKey> {
    SENDER_POINTERS
        .iter()
        .filter_map(|pointer| record.pointer(pointer).and_then(Value::as_str))
        .find_map(SenderKey::parse)
}

/// First candidate that is a string with non-whitespace content, trimmed.
fn first_non_blank<'a>(record: &'a Value, pointers: &[&str]) -> Option<&'a str> {
    pointers
        .iter()
        .filter_map(|pointer| record.pointer(pointer).and_then(Value::as_str))
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
}

fn is_from_me(record: &Value) -> bool {
    FROM_ME_POINTERS
        .iter()
        .any(|pointer| record.pointer(pointer).and_then(Value::as_bool) == Some(true))
}
