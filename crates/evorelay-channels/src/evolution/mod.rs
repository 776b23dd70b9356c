//! Evolution API (WhatsApp gateway) integration: inbound webhook payloads and
//! the outbound REST client.

pub mod client;
pub mod normalize;

pub use client::EvolutionClient;
pub use normalize::{NormalizeError, normalize};
