//! 任务仓储层接口定义
//!
//! 调度器通过此抽象访问持久化的问卷任务，核心从不直接
//! 接触具体存储。单条任务记录的写入在仓储层被假定为原子操作。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::SurveyJob;
use crate::SchedulerResult;

/// 问卷任务仓储接口
///
/// 每个调度周期通过 [`fetch_due_between`](JobRepository::fetch_due_between)
/// 选出到期窗口内的候选任务，状态变更通过
/// [`update`](JobRepository::update) 整条写回。
///
/// # 线程安全
///
/// 要求实现 `Send + Sync`，调度器以 `Arc<dyn JobRepository>` 持有。
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// 查询 `next_execution` 落在 `[start, end]` 窗口内的任务
    ///
    /// `next_execution` 无法解析的任务也应返回，由调度器
    /// 负责将其关闭为错误状态，而不是在查询层静默丢弃。
    async fn fetch_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SchedulerResult<Vec<SurveyJob>>;

    /// 根据ID获取任务
    async fn get_by_id(&self, id: Uuid) -> SchedulerResult<Option<SurveyJob>>;

    /// 整条写回任务记录
    async fn update(&self, job: &SurveyJob) -> SchedulerResult<()>;
}
