use async_trait::async_trait;

use crate::models::FailureRecord;
use crate::SchedulerResult;

/// 失败接收器接口
///
/// 接收结构化的失败记录用于运维排查。接收器自身的错误
/// 绝不能使调度循环崩溃，调度器只会记录日志后继续。
#[async_trait]
pub trait FailureSink: Send + Sync {
    async fn record(&self, failure: &FailureRecord) -> SchedulerResult<()>;
}
