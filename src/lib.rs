pub mod config;
pub mod db;
pub mod error;
pub mod invoker;
pub mod models;
pub mod payload;
pub mod queue;
pub mod source;
pub mod state;
pub mod transition;
pub mod worker;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::error::WorkerError;
use crate::invoker::FunctionInvoker;
use crate::queue::PgQueueStore;
use crate::source::PgEntitySource;
use crate::state::{AppState, SharedState};

/// Wire the Postgres-backed queue and source tables to the hosted embedding functions.
pub fn build_state(pool: PgPool, config: Config) -> Result<SharedState, WorkerError> {
    let invoker = FunctionInvoker::new(config.functions, config.worker.invoke_timeout)?;

    Ok(Arc::new(AppState::new(
        Arc::new(PgQueueStore::new(pool.clone())),
        Arc::new(PgEntitySource::new(pool)),
        Arc::new(invoker),
        config.worker,
    )))
}
