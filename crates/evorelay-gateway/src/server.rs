use std::future::Future;

use evorelay_common::Result;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::SharedState;

/// HTTP server exposing the webhook endpoint.
pub struct GatewayServer {
    bind: String,
    state: SharedState,
}

impl GatewayServer {
    pub fn new(bind: impl Into<String>, state: SharedState) -> Self {
        Self {
            bind: bind.into(),
            state,
        }
    }

    /// Serve until `shutdown` resolves. In-flight requests are drained first.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.bind).await?;
        info!("evorelay listening on {}", listener.local_addr()?);

        axum::serve(listener, build_router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("evorelay server stopped");
        Ok(())
    }
}
