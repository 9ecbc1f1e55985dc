use serde::Serialize;
use thiserror::Error;
use uast_dev_mappings::RegistryError;
use uast_dev_protocol::TransportError;

pub type Result<T> = std::result::Result<T, SessionError>;

/// Failures surfaced by the session. Pipeline failures are stored as values in the snapshot
/// and never returned from controller methods; only `Closed` is.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionError {
    #[error("Mapping catalog unavailable: {message}")]
    RegistryUnavailable { message: String },

    #[error("Failed to fetch mapping for {language}: {message}")]
    MappingFetch { language: String, message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("{message}")]
    ServiceReported { message: String },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Session closed")]
    Closed,
}

impl SessionError {
    /// Whether re-triggering the operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::MappingFetch { .. } | Self::RegistryUnavailable { .. }
        )
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }
}

impl From<RegistryError> for SessionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::RegistryUnavailable(message) => Self::RegistryUnavailable { message },
            RegistryError::MappingFetch { language, message } => {
                Self::MappingFetch { language, message }
            }
        }
    }
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        Self::Transport {
            message: err.message,
        }
    }
}
