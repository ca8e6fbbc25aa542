use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Candidate, Education, WorkExperience};

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Candidate>, sqlx::Error> {
    sqlx::query_as::<_, Candidate>(
        "SELECT id, full_name, headline, summary, location,
                COALESCE(skills, '{}') AS skills
         FROM candidates WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list_work_experience(
    pool: &PgPool,
    candidate_id: Uuid,
) -> Result<Vec<WorkExperience>, sqlx::Error> {
    sqlx::query_as::<_, WorkExperience>(
        "SELECT title, company, description, start_year, end_year,
                COALESCE(is_present, false) AS is_present
         FROM candidate_work_experience
         WHERE candidate_id = $1
         ORDER BY start_year DESC NULLS LAST",
    )
    .bind(candidate_id)
    .fetch_all(pool)
    .await
}

pub async fn list_education(
    pool: &PgPool,
    candidate_id: Uuid,
) -> Result<Vec<Education>, sqlx::Error> {
    sqlx::query_as::<_, Education>(
        "SELECT school, field, degree
         FROM candidate_education
         WHERE candidate_id = $1",
    )
    .bind(candidate_id)
    .fetch_all(pool)
    .await
}
