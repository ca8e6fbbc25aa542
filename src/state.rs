use std::sync::Arc;

use crate::config::WorkerSettings;
use crate::invoker::EmbeddingInvoker;
use crate::payload::PayloadBuilder;
use crate::queue::QueueStore;
use crate::source::EntitySource;
use crate::transition::RetryPolicy;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub queue: Arc<dyn QueueStore>,
    pub payloads: PayloadBuilder,
    pub invoker: Arc<dyn EmbeddingInvoker>,
    pub settings: WorkerSettings,
}

impl AppState {
    pub fn new(
        queue: Arc<dyn QueueStore>,
        source: Arc<dyn EntitySource>,
        invoker: Arc<dyn EmbeddingInvoker>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            queue,
            payloads: PayloadBuilder::new(source),
            invoker,
            settings,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.settings.max_attempts,
            retry_deterministic: self.settings.retry_missing_entities,
        }
    }
}
