use std::sync::{Arc, LazyLock};

use chrono::Datelike;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::error::WorkerError;
use crate::models::{CandidateRecord, Education, EntityType, JobPosting, WorkExperience};
use crate::source::EntitySource;

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{4})\b").unwrap());

/// Request body for the embedding functions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EmbeddingRequest {
    Candidate {
        candidate_id: Uuid,
        candidate_data: CandidateData,
    },
    JobPosting {
        job_posting_id: Uuid,
        job_data: JobData,
    },
}

impl EmbeddingRequest {
    pub fn entity_type(&self) -> EntityType {
        match self {
            EmbeddingRequest::Candidate { .. } => EntityType::Candidate,
            EmbeddingRequest::JobPosting { .. } => EntityType::JobPosting,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateData {
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub current_position: Option<String>,
    pub current_company: Option<String>,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub total_years_experience: i32,
    pub work_experience: Vec<WorkEntry>,
    pub education: Vec<EducationEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkEntry {
    pub title: Option<String>,
    pub company: Option<String>,
    pub description: Option<String>,
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationEntry {
    pub school: Option<String>,
    pub field: Option<String>,
    pub degree: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobData {
    pub title: String,
    pub categories: Vec<String>,
    pub location: Option<String>,
    pub requirements: Option<String>,
    pub description_ref: Option<String>,
}

/// Loads source records and projects them into embedding requests.
pub struct PayloadBuilder {
    source: Arc<dyn EntitySource>,
}

impl PayloadBuilder {
    pub fn new(source: Arc<dyn EntitySource>) -> Self {
        Self { source }
    }

    pub async fn build(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<EmbeddingRequest, WorkerError> {
        let not_found = || WorkerError::EntityNotFound {
            entity_type,
            entity_id,
        };

        match entity_type {
            EntityType::Candidate => {
                let record = self.source.candidate(entity_id).await?.ok_or_else(not_found)?;
                let current_year = chrono::Utc::now().year();
                Ok(EmbeddingRequest::Candidate {
                    candidate_id: entity_id,
                    candidate_data: candidate_data(&record, current_year),
                })
            }
            EntityType::JobPosting => {
                let job = self.source.job_posting(entity_id).await?.ok_or_else(not_found)?;
                Ok(EmbeddingRequest::JobPosting {
                    job_posting_id: entity_id,
                    job_data: job_data(job),
                })
            }
        }
    }
}

pub fn candidate_data(record: &CandidateRecord, current_year: i32) -> CandidateData {
    let current = current_entry(&record.experience);
    if record.experience.iter().filter(|e| e.is_present).count() > 1 {
        tracing::warn!(
            candidate_id = %record.profile.id,
            "Candidate has several current positions, using the most recently started"
        );
    }

    let current_position = current.and_then(|e| e.title.clone());
    let headline = record
        .profile
        .headline
        .clone()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| current_position.clone());

    CandidateData {
        full_name: record.profile.full_name.clone(),
        headline,
        current_position,
        current_company: current.and_then(|e| e.company.clone()),
        summary: record.profile.summary.clone(),
        location: record.profile.location.clone(),
        skills: record.profile.skills.clone(),
        total_years_experience: total_years(&record.experience, current_year),
        work_experience: record.experience.iter().map(work_entry).collect(),
        education: record.education.iter().map(education_entry).collect(),
    }
}

pub fn job_data(job: JobPosting) -> JobData {
    JobData {
        title: job.title,
        categories: job.categories,
        location: job.location,
        requirements: job.requirements,
        description_ref: job.description_ref,
    }
}

/// First four-digit year found in free text.
pub fn parse_year(text: Option<&str>) -> Option<i32> {
    let caps = YEAR_RE.captures(text?)?;
    caps[1].parse().ok()
}

/// Sum of `(end or current_year when present) - start` over all entries. Entries
/// without a parseable start, or without an end while not current, contribute nothing.
pub fn total_years(experience: &[WorkExperience], current_year: i32) -> i32 {
    experience
        .iter()
        .filter_map(|e| {
            let start = parse_year(e.start_year.as_deref())?;
            let end = if e.is_present {
                current_year
            } else {
                parse_year(e.end_year.as_deref())?
            };
            Some((end - start).max(0))
        })
        .sum()
}

/// The `is_present` entry; ties go to the latest start year.
pub fn current_entry(experience: &[WorkExperience]) -> Option<&WorkExperience> {
    experience
        .iter()
        .filter(|e| e.is_present)
        .max_by_key(|e| parse_year(e.start_year.as_deref()))
}

fn work_entry(e: &WorkExperience) -> WorkEntry {
    let start = year_text(e.start_year.as_deref()).unwrap_or_default();
    // A past entry without an end year stays open-ended, as `total_years` skips it.
    let end = if e.is_present {
        "Present".to_string()
    } else {
        year_text(e.end_year.as_deref()).unwrap_or_default()
    };

    WorkEntry {
        title: e.title.clone(),
        company: e.company.clone(),
        description: e.description.clone(),
        duration: format!("{start}-{end}"),
    }
}

fn education_entry(e: &Education) -> EducationEntry {
    EducationEntry {
        school: e.school.clone(),
        field: e.field.clone(),
        degree: e.degree.clone(),
    }
}

fn year_text(text: Option<&str>) -> Option<String> {
    let text = text.map(str::trim).filter(|t| !t.is_empty())?;
    Some(match parse_year(Some(text)) {
        Some(year) => year.to_string(),
        None => text.to_string(),
    })
}
