use async_trait::async_trait;
use tracing::error;

use survey_scheduler_core::{FailureRecord, FailureSink, SchedulerResult};

/// 基于结构化日志的失败接收器
///
/// 把失败记录作为结构化字段写入 tracing，自身不会失败。
#[derive(Debug, Clone, Default)]
pub struct TracingFailureSink;

impl TracingFailureSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FailureSink for TracingFailureSink {
    async fn record(&self, failure: &FailureRecord) -> SchedulerResult<()> {
        error!(
            target: "survey_scheduler::failures",
            timestamp = %failure.timestamp,
            environment = %failure.environment,
            version = %failure.version,
            project_id = ?failure.project_id,
            stack_trace = ?failure.stack_trace,
            "问卷任务执行失败: {}",
            failure.exception_message
        );
        Ok(())
    }
}
