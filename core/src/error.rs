//! Error types for the ClinicCare API client.
//!
//! # Design
//! Callers match on *where* a failure came from: the network (`Transport`)
//! or the backend (`Backend`, carrying its JSON error payload when there is
//! one). Nothing here is retried or recovered locally.

use thiserror::Error;

use crate::types::ErrorPayload;

/// Errors returned by `ConsultationClient` and `ApiClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response: connection refused, DNS
    /// failure, timeout, or a broken body stream.
    #[error("transport error: {message}")]
    Transport { message: String, timed_out: bool },

    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Backend {
        status: u16,
        payload: Option<ErrorPayload>,
        body: String,
    },

    /// A 2xx body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The underlying HTTP client could not be constructed.
    #[error("client configuration error: {0}")]
    Configuration(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&ErrorPayload> {
        match self {
            ApiError::Backend { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }

    /// What gets logged for this failure: the backend payload when present,
    /// otherwise the error message.
    pub fn log_detail(&self) -> String {
        match self {
            ApiError::Backend {
                payload: Some(payload),
                ..
            } => payload.to_string(),
            ApiError::Transport { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport {
            timed_out: err.is_timeout(),
            message: err.to_string(),
        }
    }
}
