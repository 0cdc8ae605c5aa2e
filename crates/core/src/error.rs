use crate::store::{PatchError, StoreError};
use crate::transport::TransportError;
use crate::ShowId;

/// Result alias that carries [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the playback engine's control surface.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A show, cycle or scene the operation needs does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("show {0} is already running")]
    AlreadyRunning(ShowId),
    /// Publishing to the command transport failed. Playback logs these and
    /// keeps going.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// Stored data could not be turned into a playable show.
    #[error("invalid show data: {0}")]
    Config(String),
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { .. } | StoreError::TopicNotFound(_) => {
                Self::NotFound(value.to_string())
            }
            _ => Self::Config(value.to_string()),
        }
    }
}

impl From<PatchError> for EngineError {
    fn from(value: PatchError) -> Self {
        Self::Config(value.to_string())
    }
}
