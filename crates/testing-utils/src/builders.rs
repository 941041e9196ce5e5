//! Fluent builders for test entities

use chrono::{DateTime, Utc};
use uuid::Uuid;

use survey_scheduler_core::models::format_timestamp;
use survey_scheduler_core::{SurveyJob, SurveyJobStatus, SurveyJobType};

/// Builder for `SurveyJob` test fixtures
///
/// Defaults to a queued frequent job firing Mondays at noon.
#[derive(Debug, Clone)]
pub struct SurveyJobBuilder {
    id: Uuid,
    job_type: SurveyJobType,
    cron_expression: String,
    next_execution: String,
    execution_count: i64,
    status: SurveyJobStatus,
    project_id: Uuid,
}

impl Default for SurveyJobBuilder {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            job_type: SurveyJobType::Frequent,
            cron_expression: "0 12 * * MON".to_string(),
            next_execution: format_timestamp(Utc::now()),
            execution_count: 0,
            status: SurveyJobStatus::Queued,
            project_id: Uuid::new_v4(),
        }
    }
}

impl SurveyJobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn immediate(mut self) -> Self {
        self.job_type = SurveyJobType::Immediate;
        self.cron_expression = String::new();
        self
    }

    pub fn frequent(mut self, cron_expression: &str) -> Self {
        self.job_type = SurveyJobType::Frequent;
        self.cron_expression = cron_expression.to_string();
        self
    }

    pub fn due_at(mut self, due: DateTime<Utc>) -> Self {
        self.next_execution = format_timestamp(due);
        self
    }

    /// Raw `next_execution` value, for corrupt-timestamp scenarios
    pub fn next_execution_raw(mut self, value: &str) -> Self {
        self.next_execution = value.to_string();
        self
    }

    pub fn status(mut self, status: SurveyJobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn execution_count(mut self, count: i64) -> Self {
        self.execution_count = count;
        self
    }

    pub fn project_id(mut self, project_id: Uuid) -> Self {
        self.project_id = project_id;
        self
    }

    pub fn build(self) -> SurveyJob {
        let now = Utc::now();
        SurveyJob {
            id: self.id,
            job_type: self.job_type,
            cron_expression: self.cron_expression,
            next_execution: self.next_execution,
            execution_count: self.execution_count,
            status: self.status,
            project_id: self.project_id,
            strategy_id: Uuid::new_v4(),
            frequency_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }
}
