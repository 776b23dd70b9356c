use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use evorelay_channels::{NormalizeError, SendError};
use thiserror::Error;
use tracing::{error, warn};

/// Pipeline stage an upstream capability failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transcription,
    Completion,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transcription => "transcription",
            Self::Completion => "completion",
        })
    }
}

/// Failure of one inbound event. Audio and store problems never surface here.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("unusable payload: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("{stage} failed: {source}")]
    Upstream {
        stage: Stage,
        #[source]
        source: evorelay_common::Error,
    },

    #[error("send text: {0}")]
    Delivery(#[source] SendError),
}

impl RelayError {
    pub fn upstream(stage: Stage, source: evorelay_common::Error) -> Self {
        Self::Upstream { stage, source }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Normalize(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { .. } | Self::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_client_error() {
            warn!(error = %self, "rejected webhook payload");
            (status, "invalid payload").into_response()
        } else {
            error!(error = %self, "webhook handling failed");
            (status, "failed to process message").into_response()
        }
    }
}
