pub mod candidate;
pub mod job_posting;
pub mod queue_item;

pub use candidate::{Candidate, CandidateRecord, Education, WorkExperience};
pub use job_posting::JobPosting;
pub use queue_item::{EntityType, QueueItem, QueueStatus};
