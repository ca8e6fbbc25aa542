use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{EntityType, QueueItem};

pub async fn enqueue(
    pool: &PgPool,
    entity_type: EntityType,
    entity_id: Uuid,
) -> Result<QueueItem, sqlx::Error> {
    sqlx::query_as::<_, QueueItem>(
        "INSERT INTO embedding_queue (id, entity_type, entity_id)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(entity_type.as_str())
    .bind(entity_id)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<QueueItem>, sqlx::Error> {
    sqlx::query_as::<_, QueueItem>("SELECT * FROM embedding_queue WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Oldest pending items first. `created_at` is never rewritten by a retry, so an item
/// keeps its place in line across attempts.
pub async fn fetch_pending(pool: &PgPool, limit: i64) -> Result<Vec<QueueItem>, sqlx::Error> {
    sqlx::query_as::<_, QueueItem>(
        "SELECT * FROM embedding_queue
         WHERE status = 'pending'
         ORDER BY created_at ASC, id ASC
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Conditional claim: succeeds for exactly one caller while the row is still pending.
pub async fn mark_processing(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE embedding_queue SET status = 'processing', updated_at = now()
         WHERE id = $1 AND status = 'pending'",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn mark_completed(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE embedding_queue
         SET status = 'completed', error_message = NULL,
             processed_at = now(), updated_at = now()
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn mark_failed(
    pool: &PgPool,
    id: Uuid,
    attempts: i32,
    error: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE embedding_queue
         SET status = 'failed', attempts = $2, error_message = $3, updated_at = now()
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .bind(attempts)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn mark_retry(
    pool: &PgPool,
    id: Uuid,
    attempts: i32,
    error: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE embedding_queue
         SET status = 'pending', attempts = $2, error_message = $3, updated_at = now()
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .bind(attempts)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Treat items stuck in processing past the threshold as one abandoned attempt.
/// Items whose abandoned attempt exhausts the budget go straight to failed.
pub async fn reclaim_stale(
    pool: &PgPool,
    older_than_secs: f64,
    max_attempts: i32,
    error: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE embedding_queue
         SET attempts = attempts + 1,
             status = CASE WHEN attempts + 1 >= $2 THEN 'failed' ELSE 'pending' END,
             error_message = $3,
             updated_at = now()
         WHERE status = 'processing'
           AND updated_at < now() - make_interval(secs => $1::double precision)",
    )
    .bind(older_than_secs)
    .bind(max_attempts)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
