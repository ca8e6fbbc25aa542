use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::WorkerError;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub functions: FunctionsConfig,
    pub worker: WorkerSettings,
    pub log_level: String,
}

#[derive(Clone)]
pub struct FunctionsConfig {
    pub base_url: String,
    pub service_key: String,
    pub candidate_function: String,
    pub job_function: String,
}

impl fmt::Debug for FunctionsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionsConfig")
            .field("base_url", &self.base_url)
            .field("service_key", &"<redacted>")
            .field("candidate_function", &self.candidate_function)
            .field("job_function", &self.job_function)
            .finish()
    }
}

/// Tunables for the polling loop.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub max_attempts: i32,
    /// Emit a heartbeat (and reclaim stale items) every this many cycles.
    pub heartbeat_every: u64,
    pub invoke_timeout: Duration,
    /// Items left in `processing` longer than this are considered abandoned.
    pub stale_after: Duration,
    /// Spend retry budget on missing source records instead of failing them at once.
    pub retry_missing_entities: bool,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5000),
            batch_size: 5,
            max_attempts: 3,
            heartbeat_every: 12,
            invoke_timeout: Duration::from_millis(30_000),
            stale_after: Duration::from_secs(600),
            retry_missing_entities: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, WorkerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup, so parsing can be exercised
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WorkerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let database_url = env.required("DATABASE_URL")?;
        let base_url = env.required("EMBEDDER_FUNCTIONS_URL")?;
        let service_key = env.required("EMBEDDER_SERVICE_KEY")?;

        let functions = FunctionsConfig {
            base_url,
            service_key,
            candidate_function: env.or("EMBEDDER_CANDIDATE_FUNCTION", "generate-candidate-embedding"),
            job_function: env.or("EMBEDDER_JOB_FUNCTION", "generate-job-embedding"),
        };

        let defaults = WorkerSettings::default();
        let worker = WorkerSettings {
            poll_interval: Duration::from_millis(env.parse("POLL_INTERVAL_MS", 5000)?),
            batch_size: env.parse("BATCH_SIZE", defaults.batch_size)?,
            max_attempts: env.parse("MAX_ATTEMPTS", defaults.max_attempts)?,
            heartbeat_every: env.parse("EMBEDDER_HEARTBEAT_CYCLES", defaults.heartbeat_every)?,
            invoke_timeout: Duration::from_millis(env.parse("EMBEDDER_INVOKE_TIMEOUT_MS", 30_000)?),
            stale_after: Duration::from_secs(env.parse("EMBEDDER_STALE_AFTER_SECS", 600)?),
            retry_missing_entities: env.flag("EMBEDDER_RETRY_MISSING_ENTITIES")?,
        };

        if worker.poll_interval.is_zero() {
            return Err(invalid("POLL_INTERVAL_MS", "must be greater than 0"));
        }
        if worker.batch_size < 1 {
            return Err(invalid("BATCH_SIZE", "must be at least 1"));
        }
        if worker.max_attempts < 1 {
            return Err(invalid("MAX_ATTEMPTS", "must be at least 1"));
        }
        if worker.heartbeat_every < 1 {
            return Err(invalid("EMBEDDER_HEARTBEAT_CYCLES", "must be at least 1"));
        }
        if worker.invoke_timeout.is_zero() {
            return Err(invalid("EMBEDDER_INVOKE_TIMEOUT_MS", "must be greater than 0"));
        }
        if worker.stale_after.is_zero() {
            return Err(invalid("EMBEDDER_STALE_AFTER_SECS", "must be greater than 0"));
        }
        // A live call must never look abandoned to another worker's reclaim.
        if worker.stale_after <= worker.invoke_timeout {
            return Err(invalid(
                "EMBEDDER_STALE_AFTER_SECS",
                format!(
                    "must exceed EMBEDDER_INVOKE_TIMEOUT_MS ({}ms)",
                    worker.invoke_timeout.as_millis()
                ),
            ));
        }

        Ok(Config {
            database_url,
            db_max_connections: env.parse("EMBEDDER_DB_MAX_CONNECTIONS", 5)?,
            functions,
            worker,
            log_level: env.or("EMBEDDER_LOG_LEVEL", "info"),
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, WorkerError> {
        self.get(key)
            .ok_or_else(|| WorkerError::Config(format!("Missing required environment variable: {key}")))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, WorkerError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw.trim().parse().map_err(|e| invalid(key, e)),
            None => Ok(default),
        }
    }

    fn flag(&self, key: &str) -> Result<bool, WorkerError> {
        match self.get(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            None | Some("false" | "0" | "no") => Ok(false),
            Some("true" | "1" | "yes") => Ok(true),
            Some(other) => Err(invalid(key, format!("expected a boolean, got '{other}'"))),
        }
    }
}

fn invalid(key: &str, reason: impl fmt::Display) -> WorkerError {
    WorkerError::Config(format!("Invalid {key}: {reason}"))
}
