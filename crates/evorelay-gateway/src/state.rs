use std::sync::Arc;

use crate::orchestrator::ReplyOrchestrator;

/// Shared, read-only state handed to every request.
pub struct AppState {
    pub orchestrator: ReplyOrchestrator,
}

impl AppState {
    pub fn new(orchestrator: ReplyOrchestrator) -> Self {
        Self { orchestrator }
    }
}

pub type SharedState = Arc<AppState>;
