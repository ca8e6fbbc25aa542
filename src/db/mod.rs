pub mod candidates;
pub mod embedding_queue;
pub mod job_postings;
