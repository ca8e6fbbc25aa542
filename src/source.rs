use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::WorkerError;
use crate::models::{CandidateRecord, JobPosting};

/// Read access to the platform's candidate and job tables.
#[async_trait]
pub trait EntitySource: Send + Sync {
    async fn candidate(&self, id: Uuid) -> Result<Option<CandidateRecord>, WorkerError>;
    async fn job_posting(&self, id: Uuid) -> Result<Option<JobPosting>, WorkerError>;
}

pub struct PgEntitySource {
    pool: PgPool,
}

impl PgEntitySource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitySource for PgEntitySource {
    async fn candidate(&self, id: Uuid) -> Result<Option<CandidateRecord>, WorkerError> {
        let profile = match db::candidates::find_by_id(&self.pool, id).await? {
            Some(p) => p,
            None => return Ok(None),
        };

        let experience = db::candidates::list_work_experience(&self.pool, id).await?;
        let education = db::candidates::list_education(&self.pool, id).await?;

        Ok(Some(CandidateRecord {
            profile,
            experience,
            education,
        }))
    }

    async fn job_posting(&self, id: Uuid) -> Result<Option<JobPosting>, WorkerError> {
        Ok(db::job_postings::find_by_id(&self.pool, id).await?)
    }
}
