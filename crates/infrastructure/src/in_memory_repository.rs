use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use survey_scheduler_core::{
    JobRepository, SchedulerError, SchedulerResult, SurveyJob,
};

/// 内存任务仓储
///
/// 用于嵌入式部署和集成测试的进程内实现，不提供持久化。
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobRepository {
    jobs: Arc<Mutex<HashMap<Uuid, SurveyJob>>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs(jobs: Vec<SurveyJob>) -> Self {
        let repo = Self::new();
        for job in jobs {
            repo.insert(job);
        }
        repo
    }

    pub fn insert(&self, job: SurveyJob) {
        self.jobs.lock().unwrap().insert(job.id, job);
    }

    pub fn count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// 测试辅助: 同步读取当前快照
    pub fn snapshot(&self, id: Uuid) -> Option<SurveyJob> {
        self.jobs.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn fetch_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SchedulerResult<Vec<SurveyJob>> {
        let jobs = self.jobs.lock().unwrap();
        let due = jobs
            .values()
            .filter(|job| match job.parse_next_execution() {
                Ok(due_at) => due_at >= start && due_at <= end,
                // 时间戳损坏的任务也要交给调度器, 由它关闭为错误状态
                Err(_) => true,
            })
            .cloned()
            .collect();
        Ok(due)
    }

    async fn get_by_id(&self, id: Uuid) -> SchedulerResult<Option<SurveyJob>> {
        Ok(self.jobs.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, job: &SurveyJob) -> SchedulerResult<()> {
        let mut jobs = self.jobs.lock().unwrap();
        if !jobs.contains_key(&job.id) {
            return Err(SchedulerError::JobNotFound { id: job.id });
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }
}
