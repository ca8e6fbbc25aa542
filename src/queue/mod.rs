pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::WorkerError;
use crate::models::{EntityType, QueueItem};

pub use memory::MemoryQueueStore;

pub const ABANDONED_ERROR: &str = "abandoned while processing";

/// Durable storage for embedding work items.
///
/// Every `mark_*` transition is conditional on the item's current status and reports
/// whether it applied. Terminal statuses are absorbing: marking an item that is no
/// longer `processing` changes nothing and returns `false`.
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn enqueue(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<QueueItem, WorkerError>;

    async fn get(&self, id: Uuid) -> Result<Option<QueueItem>, WorkerError>;

    /// Up to `limit` pending items, oldest `created_at` first.
    async fn fetch_pending(&self, limit: i64) -> Result<Vec<QueueItem>, WorkerError>;

    /// Claim a pending item. At most one caller gets `true`.
    async fn mark_processing(&self, id: Uuid) -> Result<bool, WorkerError>;

    async fn mark_completed(&self, id: Uuid) -> Result<bool, WorkerError>;

    async fn mark_failed(&self, id: Uuid, attempts: i32, error: &str)
    -> Result<bool, WorkerError>;

    async fn mark_retry(&self, id: Uuid, attempts: i32, error: &str) -> Result<bool, WorkerError>;

    /// Recover items left in `processing` by a worker that died mid-cycle.
    async fn reclaim_stale(
        &self,
        older_than: Duration,
        max_attempts: i32,
    ) -> Result<u64, WorkerError>;
}

pub struct PgQueueStore {
    pool: PgPool,
}

impl PgQueueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueStore for PgQueueStore {
    async fn enqueue(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<QueueItem, WorkerError> {
        Ok(db::embedding_queue::enqueue(&self.pool, entity_type, entity_id).await?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<QueueItem>, WorkerError> {
        Ok(db::embedding_queue::find_by_id(&self.pool, id).await?)
    }

    async fn fetch_pending(&self, limit: i64) -> Result<Vec<QueueItem>, WorkerError> {
        Ok(db::embedding_queue::fetch_pending(&self.pool, limit).await?)
    }

    async fn mark_processing(&self, id: Uuid) -> Result<bool, WorkerError> {
        Ok(db::embedding_queue::mark_processing(&self.pool, id).await?)
    }

    async fn mark_completed(&self, id: Uuid) -> Result<bool, WorkerError> {
        Ok(db::embedding_queue::mark_completed(&self.pool, id).await?)
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
    ) -> Result<bool, WorkerError> {
        Ok(db::embedding_queue::mark_failed(&self.pool, id, attempts, error).await?)
    }

    async fn mark_retry(&self, id: Uuid, attempts: i32, error: &str) -> Result<bool, WorkerError> {
        Ok(db::embedding_queue::mark_retry(&self.pool, id, attempts, error).await?)
    }

    async fn reclaim_stale(
        &self,
        older_than: Duration,
        max_attempts: i32,
    ) -> Result<u64, WorkerError> {
        Ok(db::embedding_queue::reclaim_stale(
            &self.pool,
            older_than.as_secs_f64(),
            max_attempts,
            ABANDONED_ERROR,
        )
        .await?)
    }
}
