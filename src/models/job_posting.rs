use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    pub categories: Vec<String>,
    pub location: Option<String>,
    pub requirements: Option<String>,
    pub description_ref: Option<String>,
}
