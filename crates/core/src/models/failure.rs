use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 运维可见的失败记录，交给失败接收器持久化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub timestamp: DateTime<Utc>,
    pub environment: String,
    pub version: String,
    pub exception_message: String,
    pub stack_trace: Option<String>,
    pub project_id: Option<Uuid>,
}

impl FailureRecord {
    pub fn new(
        environment: &str,
        version: &str,
        exception_message: String,
        project_id: Option<Uuid>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            environment: environment.to_string(),
            version: version.to_string(),
            exception_message,
            stack_trace: None,
            project_id,
        }
    }
}
