#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use embedder::config::WorkerSettings;
use embedder::error::WorkerError;
use embedder::invoker::{EmbeddingInvoker, InvokeOutcome};
use embedder::models::{
    Candidate, CandidateRecord, EntityType, JobPosting, QueueItem, QueueStatus, WorkExperience,
};
use embedder::payload::EmbeddingRequest;
use embedder::queue::{MemoryQueueStore, QueueStore};
use embedder::source::EntitySource;
use embedder::state::AppState;

// ── Test doubles ────────────────────────────────────────────────

/// Source records held in memory. Unknown ids are reported as missing.
#[derive(Default)]
pub struct StubSource {
    candidates: Mutex<HashMap<Uuid, CandidateRecord>>,
    jobs: Mutex<HashMap<Uuid, JobPosting>>,
}

impl StubSource {
    pub fn add_candidate(&self, id: Uuid) {
        let record = CandidateRecord {
            profile: Candidate {
                id,
                full_name: Some("Grace Hopper".to_string()),
                headline: None,
                summary: Some("Compiler pioneer".to_string()),
                location: Some("Arlington".to_string()),
                skills: vec!["cobol".to_string()],
            },
            experience: vec![WorkExperience {
                title: Some("Rear Admiral".to_string()),
                company: Some("US Navy".to_string()),
                description: None,
                start_year: Some("1943".to_string()),
                end_year: Some("1986".to_string()),
                is_present: false,
            }],
            education: vec![],
        };
        self.candidates.lock().unwrap().insert(id, record);
    }

    pub fn add_job(&self, id: Uuid) {
        let job = JobPosting {
            id,
            title: "Rust Engineer".to_string(),
            categories: vec!["engineering".to_string()],
            location: Some("Remote".to_string()),
            requirements: Some("tokio, sqlx".to_string()),
            description_ref: None,
        };
        self.jobs.lock().unwrap().insert(id, job);
    }
}

#[async_trait]
impl EntitySource for StubSource {
    async fn candidate(&self, id: Uuid) -> Result<Option<CandidateRecord>, WorkerError> {
        Ok(self.candidates.lock().unwrap().get(&id).cloned())
    }

    async fn job_posting(&self, id: Uuid) -> Result<Option<JobPosting>, WorkerError> {
        Ok(self.jobs.lock().unwrap().get(&id).cloned())
    }
}

/// Returns queued outcomes in order, then succeeds. Records every request it sees.
#[derive(Default)]
pub struct ScriptedInvoker {
    outcomes: Mutex<VecDeque<InvokeOutcome>>,
    requests: Mutex<Vec<EmbeddingRequest>>,
    delay: Option<Duration>,
}

impl ScriptedInvoker {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn push(&self, outcome: InvokeOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn fail_always(&self, times: usize, error: &str) {
        for _ in 0..times {
            self.push(InvokeOutcome::failure(error));
        }
    }

    pub fn requests(&self) -> Vec<EmbeddingRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingInvoker for ScriptedInvoker {
    async fn invoke(&self, request: &EmbeddingRequest) -> InvokeOutcome {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(InvokeOutcome::success)
    }
}

// ── Memory harness ──────────────────────────────────────────────

pub struct TestWorker {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryQueueStore>,
    pub source: Arc<StubSource>,
    pub invoker: Arc<ScriptedInvoker>,
}

impl TestWorker {
    pub fn new(settings: WorkerSettings) -> Self {
        Self::with_invoker(settings, ScriptedInvoker::default())
    }

    pub fn with_invoker(settings: WorkerSettings, invoker: ScriptedInvoker) -> Self {
        let store = Arc::new(MemoryQueueStore::new());
        let source = Arc::new(StubSource::default());
        let invoker = Arc::new(invoker);
        let state = Arc::new(AppState::new(
            store.clone(),
            source.clone(),
            invoker.clone(),
            settings,
        ));
        Self {
            state,
            store,
            source,
            invoker,
        }
    }

    /// Insert a pending item for an existing job posting, `age_ms` old.
    pub fn seed_job(&self, age_ms: i64, attempts: i32) -> QueueItem {
        let entity_id = Uuid::now_v7();
        self.source.add_job(entity_id);
        let item = pending_item(EntityType::JobPosting, entity_id, age_ms, attempts);
        self.store.insert(item.clone());
        item
    }

    pub async fn item(&self, id: Uuid) -> QueueItem {
        self.store.get(id).await.unwrap().expect("queue item exists")
    }
}

pub fn pending_item(
    entity_type: EntityType,
    entity_id: Uuid,
    age_ms: i64,
    attempts: i32,
) -> QueueItem {
    let created_at: DateTime<Utc> = Utc::now() - chrono::Duration::milliseconds(age_ms);
    QueueItem {
        id: Uuid::now_v7(),
        entity_type,
        entity_id,
        status: QueueStatus::Pending,
        attempts,
        error_message: None,
        created_at,
        updated_at: created_at,
        processed_at: None,
    }
}

pub fn fast_settings() -> WorkerSettings {
    WorkerSettings {
        poll_interval: Duration::from_millis(10),
        invoke_timeout: Duration::from_secs(2),
        ..WorkerSettings::default()
    }
}

// ── Postgres harness ────────────────────────────────────────────

/// A dedicated temporary database with the queue migrations and source tables applied.
pub struct TestDb {
    pub pool: PgPool,
    pub db_name: String,
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

pub async fn spawn_db() -> TestDb {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let db_name = format!("embedder_test_{}", Uuid::now_v7().to_string().replace('-', ""));

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    sqlx::raw_sql(include_str!("../fixtures/source_tables.sql"))
        .execute(&pool)
        .await
        .expect("Failed to create source tables");

    TestDb { pool, db_name }
}

/// Drop the test database after tests complete.
pub async fn cleanup(db: TestDb) {
    db.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!(
        "DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)",
        db.db_name
    ))
    .execute(&admin_pool)
    .await;

    admin_pool.close().await;
}
