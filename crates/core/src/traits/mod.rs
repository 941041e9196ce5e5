pub mod executor;
pub mod failure_sink;
pub mod repository;

pub use executor::SurveyExecutor;
pub use failure_sink::FailureSink;
pub use repository::JobRepository;
