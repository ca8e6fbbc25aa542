use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{ABANDONED_ERROR, QueueStore};
use crate::error::WorkerError;
use crate::models::{EntityType, QueueItem, QueueStatus};

/// Process-local queue with the same transition rules as the Postgres table.
/// Used for tests and for running the worker without a database.
#[derive(Default)]
pub struct MemoryQueueStore {
    items: Mutex<Vec<QueueItem>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed item, e.g. one with a backdated `created_at`.
    pub fn insert(&self, item: QueueItem) {
        self.lock().push(item);
    }

    pub fn snapshot(&self) -> Vec<QueueItem> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<QueueItem>> {
        // A poisoned lock only means a test panicked mid-update; the data is still usable.
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `f` to the item if it currently has status `from`.
    fn transition<F>(&self, id: Uuid, from: QueueStatus, f: F) -> bool
    where
        F: FnOnce(&mut QueueItem),
    {
        let mut items = self.lock();
        match items.iter_mut().find(|i| i.id == id && i.status == from) {
            Some(item) => {
                f(item);
                item.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn enqueue(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<QueueItem, WorkerError> {
        let now = Utc::now();
        let item = QueueItem {
            id: Uuid::now_v7(),
            entity_type,
            entity_id,
            status: QueueStatus::Pending,
            attempts: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
            processed_at: None,
        };
        self.insert(item.clone());
        Ok(item)
    }

    async fn get(&self, id: Uuid) -> Result<Option<QueueItem>, WorkerError> {
        Ok(self.lock().iter().find(|i| i.id == id).cloned())
    }

    async fn fetch_pending(&self, limit: i64) -> Result<Vec<QueueItem>, WorkerError> {
        let mut pending: Vec<QueueItem> = self
            .lock()
            .iter()
            .filter(|i| i.status == QueueStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        pending.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(pending)
    }

    async fn mark_processing(&self, id: Uuid) -> Result<bool, WorkerError> {
        Ok(self.transition(id, QueueStatus::Pending, |item| {
            item.status = QueueStatus::Processing;
        }))
    }

    async fn mark_completed(&self, id: Uuid) -> Result<bool, WorkerError> {
        Ok(self.transition(id, QueueStatus::Processing, |item| {
            item.status = QueueStatus::Completed;
            item.error_message = None;
            item.processed_at = Some(Utc::now());
        }))
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
    ) -> Result<bool, WorkerError> {
        Ok(self.transition(id, QueueStatus::Processing, |item| {
            item.status = QueueStatus::Failed;
            item.attempts = attempts;
            item.error_message = Some(error.to_string());
        }))
    }

    async fn mark_retry(&self, id: Uuid, attempts: i32, error: &str) -> Result<bool, WorkerError> {
        Ok(self.transition(id, QueueStatus::Processing, |item| {
            item.status = QueueStatus::Pending;
            item.attempts = attempts;
            item.error_message = Some(error.to_string());
        }))
    }

    async fn reclaim_stale(
        &self,
        older_than: Duration,
        max_attempts: i32,
    ) -> Result<u64, WorkerError> {
        let threshold = chrono::Duration::from_std(older_than)
            .map_err(|e| WorkerError::Config(format!("invalid staleness threshold: {e}")))?;
        let cutoff = Utc::now() - threshold;
        let now = Utc::now();

        let mut reclaimed = 0;
        for item in self.lock().iter_mut() {
            if item.status != QueueStatus::Processing || item.updated_at >= cutoff {
                continue;
            }
            item.attempts += 1;
            item.status = if item.attempts >= max_attempts {
                QueueStatus::Failed
            } else {
                QueueStatus::Pending
            };
            item.error_message = Some(ABANDONED_ERROR.to_string());
            item.updated_at = now;
            reclaimed += 1;
        }
        Ok(reclaimed)
    }
}
