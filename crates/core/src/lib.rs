pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod traits;

pub use config::{AppConfig, ConfigLoader, DispatcherConfig, ObservabilityConfig};
pub use errors::SchedulerError;
pub use logging::init_logging;
pub use models::{
    format_timestamp, parse_timestamp, FailureRecord, SurveyJob, SurveyJobStatus, SurveyJobType,
};
pub use traits::{FailureSink, JobRepository, SurveyExecutor};

/// 统一的Result类型
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;
