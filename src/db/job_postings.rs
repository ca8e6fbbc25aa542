use sqlx::PgPool;
use uuid::Uuid;

use crate::models::JobPosting;

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<JobPosting>, sqlx::Error> {
    sqlx::query_as::<_, JobPosting>(
        "SELECT id, title, COALESCE(categories, '{}') AS categories,
                location, requirements, description_ref
         FROM job_postings WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
