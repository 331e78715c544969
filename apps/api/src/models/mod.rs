pub mod analysis;
pub mod candidate;
pub mod job;
pub mod records;

pub use candidate::CandidateSummary;
pub use job::{JobDescriptor, JobType};

/// Job primary key in the job-management collaborator.
pub type JobId = i32;
/// Candidate primary key in the candidate collaborator.
pub type CandidateId = i32;
