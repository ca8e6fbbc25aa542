use std::future::Future;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::WorkerError;
use crate::models::QueueItem;
use crate::state::{AppState, SharedState};
use crate::transition::{self, Outcome, Transition};

/// Counters for one cycle, or accumulated over many.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub completed: usize,
    pub retried: usize,
    pub failed: usize,
    /// Items another worker claimed between fetch and claim.
    pub skipped: usize,
}

impl CycleReport {
    fn absorb(&mut self, other: CycleReport) {
        self.fetched += other.fetched;
        self.completed += other.completed;
        self.retried += other.retried;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }

    fn record(&mut self, processed: Processed) {
        match processed {
            Processed::Completed => self.completed += 1,
            Processed::Retried => self.retried += 1,
            Processed::Failed => self.failed += 1,
            Processed::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Processed {
    Completed,
    Retried,
    Failed,
    Skipped,
}

/// Poll the queue until shutdown is signaled. A cycle that is still running when the
/// signal arrives is abandoned; its claimed item stays `processing` until reclaimed.
pub async fn run(state: SharedState, mut shutdown: watch::Receiver<bool>) {
    let settings = &state.settings;
    tracing::info!(
        batch_size = settings.batch_size,
        poll_interval_ms = settings.poll_interval.as_millis() as u64,
        max_attempts = settings.max_attempts,
        "Embedding worker started"
    );

    reclaim_stale(&state).await;

    let mut cycle: u64 = 0;
    let mut totals = CycleReport::default();

    loop {
        if *shutdown.borrow() {
            break;
        }

        cycle += 1;

        tokio::select! {
            result = run_cycle(&state) => match result {
                Ok(report) => {
                    if report.fetched > 0 {
                        tracing::debug!(cycle, ?report, "Cycle finished");
                    }
                    totals.absorb(report);
                }
                Err(e) => tracing::error!(cycle, "Worker cycle failed: {e}"),
            },
            _ = shutdown.changed() => break,
        }

        if cycle % settings.heartbeat_every == 0 {
            tracing::info!(
                cycle,
                completed = totals.completed,
                retried = totals.retried,
                failed = totals.failed,
                "Embedding worker alive"
            );
            reclaim_stale(&state).await;
        }

        tokio::select! {
            _ = tokio::time::sleep(settings.poll_interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!(cycles = cycle, "Embedding worker stopped");
}

/// Wait for `signal`, then stop the worker task and wait for it. A worker that ends
/// before the signal, by returning or panicking, is an error.
pub async fn supervise<F>(
    mut worker: JoinHandle<()>,
    signal: F,
    shutdown: watch::Sender<bool>,
) -> Result<(), WorkerError>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        joined = &mut worker => {
            let reason = match joined {
                Ok(()) => "exited without a shutdown signal".to_string(),
                Err(e) => format!("failed: {e}"),
            };
            tracing::error!("Embedding worker {reason}");
            return Err(WorkerError::WorkerExited(reason));
        }
        _ = signal => {}
    }

    let _ = shutdown.send(true);
    worker.await.map_err(|e| {
        tracing::error!("Embedding worker failed while stopping: {e}");
        WorkerError::WorkerExited(format!("failed while stopping: {e}"))
    })
}

/// One poll: fetch a batch and process its items in order.
pub async fn run_cycle(state: &AppState) -> Result<CycleReport, WorkerError> {
    let items = state.queue.fetch_pending(state.settings.batch_size).await?;

    let mut report = CycleReport {
        fetched: items.len(),
        ..Default::default()
    };

    for item in &items {
        report.record(process_item(state, item).await?);
    }

    Ok(report)
}

pub async fn reclaim_stale(state: &AppState) {
    match state
        .queue
        .reclaim_stale(state.settings.stale_after, state.settings.max_attempts)
        .await
    {
        Ok(0) => {}
        Ok(n) => tracing::warn!("Reclaimed {n} queue item(s) abandoned in processing"),
        Err(e) => tracing::error!("Failed to reclaim stale queue items: {e}"),
    }
}

async fn process_item(state: &AppState, item: &QueueItem) -> Result<Processed, WorkerError> {
    if !state.queue.mark_processing(item.id).await? {
        tracing::debug!(item_id = %item.id, "Queue item already claimed, skipping");
        return Ok(Processed::Skipped);
    }

    tracing::debug!(
        item_id = %item.id,
        entity_type = %item.entity_type,
        entity_id = %item.entity_id,
        attempt = item.attempts + 1,
        "Processing queue item"
    );

    let outcome = execute(state, item).await;

    let processed = match transition::next(item, outcome, &state.retry_policy()) {
        Transition::Complete => {
            let applied = state.queue.mark_completed(item.id).await?;
            warn_if_stale(item, applied);
            tracing::info!(
                item_id = %item.id,
                entity_type = %item.entity_type,
                entity_id = %item.entity_id,
                "Embedding generated"
            );
            Processed::Completed
        }
        Transition::Retry { attempts, error } => {
            let applied = state.queue.mark_retry(item.id, attempts, &error).await?;
            warn_if_stale(item, applied);
            tracing::warn!(
                item_id = %item.id,
                attempts,
                "Embedding attempt failed, will retry: {error}"
            );
            Processed::Retried
        }
        Transition::Fail { attempts, error } => {
            let applied = state.queue.mark_failed(item.id, attempts, &error).await?;
            warn_if_stale(item, applied);
            tracing::error!(
                item_id = %item.id,
                entity_type = %item.entity_type,
                entity_id = %item.entity_id,
                attempts,
                "Embedding failed permanently: {error}"
            );
            Processed::Failed
        }
    };

    Ok(processed)
}

/// Build the payload and call the embedding function under the configured timeout.
async fn execute(state: &AppState, item: &QueueItem) -> Outcome {
    let request = match state.payloads.build(item.entity_type, item.entity_id).await {
        Ok(request) => request,
        Err(e) => return Outcome::from_error(&e),
    };

    let timeout = state.settings.invoke_timeout;
    match tokio::time::timeout(timeout, state.invoker.invoke(&request)).await {
        Ok(outcome) => Outcome::from(outcome),
        Err(_) => Outcome::from_error(&WorkerError::Timeout(timeout.as_millis())),
    }
}

fn warn_if_stale(item: &QueueItem, applied: bool) {
    if !applied {
        tracing::warn!(
            item_id = %item.id,
            "Queue item left processing before write-back; result not recorded"
        );
    }
}
