use crate::error::WorkerError;
use crate::invoker::InvokeOutcome;
use crate::models::QueueItem;

/// What happened when an item was run through build + invoke.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success,
    Failure {
        error: String,
        /// The same attempt would fail the same way again (e.g. missing source record).
        deterministic: bool,
    },
}

impl Outcome {
    pub fn from_error(err: &WorkerError) -> Self {
        Outcome::Failure {
            error: err.to_string(),
            deterministic: err.is_deterministic(),
        }
    }
}

impl From<InvokeOutcome> for Outcome {
    fn from(outcome: InvokeOutcome) -> Self {
        if outcome.success {
            Outcome::Success
        } else {
            Outcome::Failure {
                error: outcome
                    .error
                    .unwrap_or_else(|| "Embedding function failed".to_string()),
                deterministic: false,
            }
        }
    }
}

/// The write-back a processed item needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Complete,
    Retry { attempts: i32, error: String },
    Fail { attempts: i32, error: String },
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: i32,
    pub retry_deterministic: bool,
}

/// Decide the next state of a `processing` item. Pure: no I/O, no clock.
///
/// Every failure counts as one attempt. The item goes back to `pending` while the new
/// count is below `max_attempts`, and to `failed` once it reaches it. Deterministic
/// failures skip the remaining budget unless the policy says to retry them.
pub fn next(item: &QueueItem, outcome: Outcome, policy: &RetryPolicy) -> Transition {
    match outcome {
        Outcome::Success => Transition::Complete,
        Outcome::Failure {
            error,
            deterministic,
        } => {
            let attempts = item.attempts + 1;
            if attempts >= policy.max_attempts || (deterministic && !policy.retry_deterministic) {
                Transition::Fail { attempts, error }
            } else {
                Transition::Retry { attempts, error }
            }
        }
    }
}
