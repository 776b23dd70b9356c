pub mod kv;
pub mod memory_store;
pub mod redis_store;
pub mod session_store;

pub use kv::KvBackend;
pub use memory_store::MemoryBackend;
pub use redis_store::RedisBackend;
pub use session_store::{ConversationHistory, ConversationStore};
