use thiserror::Error;

/// 调度器错误类型定义
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("无效的节律表达式: {expr} - {message}")]
    InvalidCadence { expr: String, message: String },

    #[error("无效的执行时间戳: {value}")]
    InvalidTimestamp { value: String },

    #[error("问卷任务未找到: {id}")]
    JobNotFound { id: uuid::Uuid },

    #[error("仓储操作错误: {0}")]
    Repository(String),

    #[error("问卷发送执行错误: {0}")]
    ExecutionFailure(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的Result类型
pub type Result<T> = std::result::Result<T, SchedulerError>;
