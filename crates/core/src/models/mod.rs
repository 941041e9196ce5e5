pub mod failure;
pub mod job;

pub use failure::FailureRecord;
pub use job::{format_timestamp, parse_timestamp, SurveyJob, SurveyJobStatus, SurveyJobType};
