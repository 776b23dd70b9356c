use std::sync::Arc;
use std::time::Duration;

use evorelay_common::{ConversationTurn, Error, Result, SenderKey};
use tracing::debug;

use crate::kv::KvBackend;

/// Most recent turns kept per participant.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Time-to-live applied on every write.
pub const DEFAULT_HISTORY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const KEY_PREFIX: &str = "conversation:";

/// Ordered turns for one participant, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop the oldest turns until at most `limit` remain.
    pub fn truncate_front(&mut self, limit: usize) {
        if self.turns.len() > limit {
            let excess = self.turns.len() - limit;
            self.turns.drain(..excess);
        }
    }
}

impl From<Vec<ConversationTurn>> for ConversationHistory {
    fn from(turns: Vec<ConversationTurn>) -> Self {
        Self { turns }
    }
}

/// Bounded, TTL'd conversation history per participant.
///
/// Reads and writes are not coordinated across requests: two concurrent
/// events for the same participant may interleave and the last save wins.
#[derive(Clone)]
pub struct ConversationStore {
    backend: Arc<dyn KvBackend>,
    limit: usize,
    ttl: Duration,
}

impl ConversationStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            backend,
            limit: DEFAULT_HISTORY_LIMIT,
            ttl: DEFAULT_HISTORY_TTL,
        }
    }

    pub fn with_limits(backend: Arc<dyn KvBackend>, limit: usize, ttl: Duration) -> Self {
        Self {
            backend,
            limit: limit.max(1),
            ttl,
        }
    }

    /// Load the stored history. An absent key yields an empty history.
    pub async fn load(&self, sender: &SenderKey) -> Result<ConversationHistory> {
        let key = Self::key(sender);
        let Some(raw) = self.backend.get(&key).await? else {
            return Ok(ConversationHistory::new());
        };
        if raw.trim().is_empty() {
            return Ok(ConversationHistory::new());
        }

        let turns: Vec<ConversationTurn> = serde_json::from_str(&raw)
            .map_err(|e| Error::Database(format!("decode conversation {key}: {e}")))?;
        debug!(key = %key, turns = turns.len(), "loaded conversation");
        Ok(turns.into())
    }

    /// Persist the history, keeping only the most recent turns.
    pub async fn save(&self, sender: &SenderKey, history: &ConversationHistory) -> Result<()> {
        let key = Self::key(sender);
        let mut capped = history.clone();
        capped.truncate_front(self.limit);
        let payload = serde_json::to_string(capped.turns())
            .map_err(|e| Error::Database(format!("encode conversation {key}: {e}")))?;

        self.backend.set_ex(&key, &payload, self.ttl).await?;
        debug!(
            key = %key,
            turns = capped.len(),
            backend = self.backend.backend_id(),
            "saved conversation"
        );
        Ok(())
    }

    /// Release the backing connection. Safe to call more than once.
    pub async fn close(&self) -> Result<()> {
        self.backend.close().await
    }

    fn key(sender: &SenderKey) -> String {
        format!("{KEY_PREFIX}{sender}")
    }
}
