use async_trait::async_trait;

use crate::models::SurveyJob;
use crate::SchedulerResult;

/// 问卷发送执行器接口
///
/// 对每个到期任务执行一次具体的业务动作（短信/邮件问卷发送等），
/// 动作内容对调度器完全不透明。执行器抛出的任何错误都会被调度器
/// 捕获并记录，不会中断同批次的其他任务。
#[async_trait]
pub trait SurveyExecutor: Send + Sync {
    /// 执行一个到期任务
    async fn execute(&self, job: &SurveyJob) -> SchedulerResult<()>;
}
