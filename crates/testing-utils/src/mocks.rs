//! Mock implementations for the scheduler's collaborator traits
//!
//! This module provides in-memory mock implementations that can be used
//! for unit testing without requiring actual persistence or delivery
//! services.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use survey_scheduler_core::{
    FailureRecord, FailureSink, JobRepository, SchedulerError, SchedulerResult, SurveyExecutor,
    SurveyJob,
};

/// Mock implementation of JobRepository for testing
///
/// Records every `update` call in order so tests can assert on the
/// persisted state transitions (e.g. that `InProgress` was written
/// before the executor ran).
#[derive(Debug, Clone, Default)]
pub struct MockJobRepository {
    jobs: Arc<Mutex<HashMap<Uuid, SurveyJob>>>,
    update_log: Arc<Mutex<Vec<SurveyJob>>>,
    fetch_error: Arc<Mutex<Option<String>>>,
}

impl MockJobRepository {
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

    pub fn get(&self, id: Uuid) -> Option<SurveyJob> {
        self.jobs.lock().unwrap().get(&id).cloned()
    }

    /// All `update` calls in invocation order
    pub fn updates(&self) -> Vec<SurveyJob> {
        self.update_log.lock().unwrap().clone()
    }

    /// Make every subsequent `fetch_due_between` fail with the given message
    pub fn fail_fetch_with(&self, message: &str) {
        *self.fetch_error.lock().unwrap() = Some(message.to_string());
    }

    /// `update` calls recorded for one specific job
    pub fn updates_for(&self, id: Uuid) -> Vec<SurveyJob> {
        self.update_log
            .lock()
            .unwrap()
            .iter()
            .filter(|job| job.id == id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl JobRepository for MockJobRepository {
    async fn fetch_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SchedulerResult<Vec<SurveyJob>> {
        if let Some(message) = self.fetch_error.lock().unwrap().clone() {
            return Err(SchedulerError::Repository(message));
        }
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .values()
            .filter(|job| match job.parse_next_execution() {
                Ok(due_at) => due_at >= start && due_at <= end,
                Err(_) => true,
            })
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: Uuid) -> SchedulerResult<Option<SurveyJob>> {
        Ok(self.jobs.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, job: &SurveyJob) -> SchedulerResult<()> {
        self.update_log.lock().unwrap().push(job.clone());
        self.jobs.lock().unwrap().insert(job.id, job.clone());
        Ok(())
    }
}

/// Mock executor that records every invocation and can be configured
/// to fail for specific job ids
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    executed: Arc<Mutex<Vec<Uuid>>>,
    failing: Arc<Mutex<HashSet<Uuid>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, id: Uuid) {
        self.failing.lock().unwrap().insert(id);
    }

    pub fn executed(&self) -> Vec<Uuid> {
        self.executed.lock().unwrap().clone()
    }

    pub fn execution_count(&self) -> usize {
        self.executed.lock().unwrap().len()
    }
}

#[async_trait]
impl SurveyExecutor for RecordingExecutor {
    async fn execute(&self, job: &SurveyJob) -> SchedulerResult<()> {
        self.executed.lock().unwrap().push(job.id);
        if self.failing.lock().unwrap().contains(&job.id) {
            return Err(SchedulerError::ExecutionFailure(format!(
                "simulated delivery failure for job {}",
                job.id
            )));
        }
        Ok(())
    }
}

/// Failure sink that collects every record for later assertions
#[derive(Debug, Clone, Default)]
pub struct CollectingFailureSink {
    records: Arc<Mutex<Vec<FailureRecord>>>,
}

impl CollectingFailureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<FailureRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl FailureSink for CollectingFailureSink {
    async fn record(&self, failure: &FailureRecord) -> SchedulerResult<()> {
        self.records.lock().unwrap().push(failure.clone());
        Ok(())
    }
}
