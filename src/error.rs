use uuid::Uuid;

use crate::models::EntityType;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("{entity_type} {entity_id} not found")]
    EntityNotFound {
        entity_type: EntityType,
        entity_id: Uuid,
    },

    #[error("Invocation failed: {0}")]
    Invocation(String),

    #[error("Embedding function timed out after {0}ms")]
    Timeout(u128),

    #[error("Worker task {0}")]
    WorkerExited(String),
}

impl WorkerError {
    /// Failures that will not change on a later attempt without outside intervention.
    pub fn is_deterministic(&self) -> bool {
        matches!(self, WorkerError::EntityNotFound { .. })
    }
}
