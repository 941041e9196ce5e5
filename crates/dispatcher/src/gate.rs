use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use survey_scheduler_core::{SchedulerError, SchedulerResult};

/// 执行闸门
///
/// 进程内的单一准入互斥机制：同一时刻只允许一个批处理周期运行。
/// 定时器在上一批次未结束时再次触发，会在此阻塞直到前一批完成。
/// 闸门没有超时，卡住的批次会阻塞后续周期而不是产生重复发送。
#[derive(Clone)]
pub struct ExecutionGate {
    permit: Arc<Semaphore>,
}

impl ExecutionGate {
    pub fn new() -> Self {
        Self {
            permit: Arc::new(Semaphore::new(1)),
        }
    }

    /// 在独占许可下执行 `work`，所有退出路径上都保证释放许可
    pub async fn run_exclusive<F, T>(&self, work: F) -> SchedulerResult<T>
    where
        F: Future<Output = T>,
    {
        let _permit = self
            .permit
            .acquire()
            .await
            .map_err(|e| SchedulerError::Internal(format!("执行闸门已关闭: {e}")))?;
        Ok(work.await)
        // _permit 在此随作用域结束释放
    }
}

impl Default for ExecutionGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_exclusive_returns_work_result() {
        let gate = ExecutionGate::new();
        let result = gate.run_exclusive(async { 41 + 1 }).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn test_concurrent_batches_never_interleave() {
        let gate = ExecutionGate::new();
        let active = Arc::new(AtomicUsize::new(0));
        let max_observed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let gate = gate.clone();
            let active = Arc::clone(&active);
            let max_observed = Arc::clone(&max_observed);
            handles.push(tokio::spawn(async move {
                gate.run_exclusive(async {
                    let current = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_observed.fetch_max(current, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_observed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_permit_released_between_calls() {
        let gate = ExecutionGate::new();
        gate.run_exclusive(async {}).await.unwrap();
        // 第二次获取不应被阻塞
        tokio::time::timeout(Duration::from_millis(100), gate.run_exclusive(async {}))
            .await
            .expect("闸门许可未被释放")
            .unwrap();
    }
}
