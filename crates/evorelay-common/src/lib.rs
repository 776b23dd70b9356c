pub mod error;
pub mod message;
pub mod types;

pub use error::{Error, Result};
pub use message::{CanonicalMessage, ConversationTurn, MessageKind, TurnRole};
pub use types::SenderKey;
