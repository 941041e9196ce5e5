pub mod builders;
pub mod mocks;

pub use builders::SurveyJobBuilder;
pub use mocks::{CollectingFailureSink, MockJobRepository, RecordingExecutor};
