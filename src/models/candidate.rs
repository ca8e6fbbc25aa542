use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
}

/// Years are free text as entered on the profile form ("2019", "Mar 2019").
#[derive(Debug, Clone, Default, sqlx::FromRow, Serialize, Deserialize)]
pub struct WorkExperience {
    pub title: Option<String>,
    pub company: Option<String>,
    pub description: Option<String>,
    pub start_year: Option<String>,
    pub end_year: Option<String>,
    pub is_present: bool,
}

#[derive(Debug, Clone, Default, sqlx::FromRow, Serialize, Deserialize)]
pub struct Education {
    pub school: Option<String>,
    pub field: Option<String>,
    pub degree: Option<String>,
}

/// A candidate profile together with its history, as needed to build a payload.
#[derive(Debug, Clone)]
pub struct CandidateRecord {
    pub profile: Candidate,
    pub experience: Vec<WorkExperience>,
    pub education: Vec<Education>,
}
