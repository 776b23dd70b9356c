use std::time::Duration;

use async_trait::async_trait;
use evorelay_common::Result;

/// Minimal key-value surface the conversation store needs from its backend.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Backend identifier for logs (e.g. "redis", "memory").
    fn backend_id(&self) -> &str;

    /// Fetch a value. `Ok(None)` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value that expires `ttl` after this call.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Release the underlying connection. Calling it twice is a no-op.
    async fn close(&self) -> Result<()>;
}
