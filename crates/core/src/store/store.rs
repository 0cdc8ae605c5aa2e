use crate::show::show::Show;
use crate::ShowId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },
    #[error("no show with topic '{0}'")]
    TopicNotFound(String),
    #[error("{kind} {id} is invalid: {reason}")]
    Invalid {
        kind: &'static str,
        id: u64,
        reason: String,
    },
    #[error("failed to access store file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse store file: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: u64) -> Self {
        Self::NotFound { kind, id }
    }

    pub(crate) fn invalid(kind: &'static str, id: u64, reason: impl Into<String>) -> Self {
        Self::Invalid {
            kind,
            id,
            reason: reason.into(),
        }
    }
}

/// Read access to stored shows, as the playback engine needs it.
///
/// Reads must observe every completed write. Implementations are shared
/// between the control surface and the inbound command handler.
pub trait HierarchyStore: Send + Sync {
    /// The show with every cycle, scene, group, action and device filled in.
    fn get_show_recursive(&self, id: ShowId) -> Result<Show, StoreError>;

    /// The show's own fields; `cycles` is left empty.
    fn get_show(&self, id: ShowId) -> Result<Show, StoreError>;

    fn get_show_by_topic(&self, topic: &str) -> Result<Show, StoreError>;

    /// Every show, shallow, in stored order.
    fn get_shows(&self) -> Result<Vec<Show>, StoreError>;
}
