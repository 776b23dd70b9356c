pub mod error;
pub mod orchestrator;
pub mod router;
pub mod server;
pub mod state;

pub use error::{RelayError, Stage};
pub use orchestrator::{Capabilities, RelaySettings, ReplyOrchestrator, ReplyOutcome, SkipReason};
pub use server::GatewayServer;
pub use state::{AppState, SharedState};
