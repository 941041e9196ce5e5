use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::SchedulerError;
use crate::SchedulerResult;

/// `next_execution` 的标准时间戳格式（写入时总是使用此格式）
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// 历史遗留的点分隔变体，仅在解析时接受
pub const TIMESTAMP_FORMAT_LEGACY: &str = "%Y-%m-%dT%H.%M.%S%.3fZ";

/// 问卷发送任务
///
/// 表示一次已排期的问卷发送，包含调度所需的全部状态。
///
/// # 字段说明
///
/// - `id`: 任务的唯一标识符，创建后不可变
/// - `job_type`: 任务类型，一次性（Immediate）或周期性（Frequent）
/// - `cron_expression`: 节律表达式；一次性任务忽略此字段
/// - `next_execution`: 下次到期时间的 ISO-8601 UTC 时间戳字符串，
///   由调度器在每次评估后改写
/// - `execution_count`: 周期性任务每次成功触发后递增；
///   一次性任务完成后归零
/// - `status`: 任务状态（状态机见调度器文档）
/// - `project_id` / `strategy_id` / `frequency_id` / `patient_id`:
///   透传给执行器的业务引用，调度器不做解释
/// - `created_at` / `updated_at`: 创建和最后更新时间
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyJob {
    pub id: Uuid,
    pub job_type: SurveyJobType,
    pub cron_expression: String,
    pub next_execution: String,
    pub execution_count: i64,
    pub status: SurveyJobStatus,
    pub project_id: Uuid,
    pub strategy_id: Uuid,
    pub frequency_id: Uuid,
    pub patient_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 任务类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SurveyJobType {
    /// 一次性任务，触发一次后完成
    #[serde(rename = "IMMEDIATE")]
    Immediate,
    /// 周期性任务，按节律表达式反复触发
    #[serde(rename = "FREQUENT")]
    Frequent,
}

/// 任务状态
///
/// `Completed` 和 `Error` 对本调度周期是粘性的终态，
/// 只有外部系统重新入队才会复位。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SurveyJobStatus {
    #[serde(rename = "QUEUED")]
    Queued,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "ERROR")]
    Error,
}

impl SurveyJob {
    /// 创建新的周期性任务
    pub fn new_frequent(
        cron_expression: String,
        next_execution: DateTime<Utc>,
        project_id: Uuid,
        strategy_id: Uuid,
        frequency_id: Uuid,
        patient_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_type: SurveyJobType::Frequent,
            cron_expression,
            next_execution: format_timestamp(next_execution),
            execution_count: 0,
            status: SurveyJobStatus::Queued,
            project_id,
            strategy_id,
            frequency_id,
            patient_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// 创建新的一次性任务
    pub fn new_immediate(
        next_execution: DateTime<Utc>,
        project_id: Uuid,
        strategy_id: Uuid,
        frequency_id: Uuid,
        patient_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_type: SurveyJobType::Immediate,
            cron_expression: String::new(),
            next_execution: format_timestamp(next_execution),
            execution_count: 0,
            status: SurveyJobStatus::Queued,
            project_id,
            strategy_id,
            frequency_id,
            patient_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// 解析 `next_execution` 字段，依次尝试两种被接受的格式
    pub fn parse_next_execution(&self) -> SchedulerResult<DateTime<Utc>> {
        parse_timestamp(&self.next_execution)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            SurveyJobStatus::Completed | SurveyJobStatus::Error
        )
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self.status, SurveyJobStatus::InProgress)
    }

    pub fn is_queued(&self) -> bool {
        matches!(self.status, SurveyJobStatus::Queued)
    }

    /// 变更状态并刷新更新时间
    pub fn set_status(&mut self, status: SurveyJobStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// 解析时间戳字符串，依次尝试标准格式和历史点分隔格式
pub fn parse_timestamp(value: &str) -> SchedulerResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT_LEGACY))
        .map(|naive| naive.and_utc())
        .map_err(|_| SchedulerError::InvalidTimestamp {
            value: value.to_string(),
        })
}

/// 按标准格式输出时间戳
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}
