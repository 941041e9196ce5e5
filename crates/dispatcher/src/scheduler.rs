use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use survey_scheduler_core::{
    config::AppConfig,
    models::{format_timestamp, FailureRecord, SurveyJob, SurveyJobStatus, SurveyJobType},
    FailureSink, JobRepository, SchedulerError, SchedulerResult, SurveyExecutor,
};

use crate::cadence::CadenceExpression;
use crate::gate::ExecutionGate;

/// 一次性任务完成后 `next_execution` 的停放偏移（约70年）。
/// 字段保持可解析、可排序，而不是引入可空值。
const PARK_OFFSET_DAYS: i64 = 70 * 365;

/// 问卷任务调度器
///
/// 由固定周期的定时器驱动：每个周期查询到期窗口内的任务，
/// 在执行闸门内逐个推进状态机并调用执行器。单个任务的失败
/// 被完全隔离，不会中断同批次的其他任务。
pub struct JobDispatcher {
    job_repo: Arc<dyn JobRepository>,
    executor: Arc<dyn SurveyExecutor>,
    failure_sink: Arc<dyn FailureSink>,
    gate: ExecutionGate,
    config: AppConfig,
    timezone: FixedOffset,
    shutdown_tx: broadcast::Sender<()>,
}

impl JobDispatcher {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        executor: Arc<dyn SurveyExecutor>,
        failure_sink: Arc<dyn FailureSink>,
        config: AppConfig,
    ) -> SchedulerResult<Self> {
        let timezone = config.dispatcher.timezone().ok_or_else(|| {
            SchedulerError::Configuration(format!(
                "无效的UTC偏移: {} 分钟",
                config.dispatcher.utc_offset_minutes
            ))
        })?;
        let (shutdown_tx, _) = broadcast::channel(16);

        Ok(Self {
            job_repo,
            executor,
            failure_sink,
            gate: ExecutionGate::new(),
            config,
            timezone,
            shutdown_tx,
        })
    }

    /// 启动调度循环
    ///
    /// 首个周期在启动时立即执行，之后按配置的周期触发。
    /// 收到停止信号后不再开启新周期，进行中的批次不会被强制取消。
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let dispatcher = self;
        let mut shutdown_rx = dispatcher.shutdown_tx.subscribe();

        tokio::spawn(async move {
            if !dispatcher.config.dispatcher.enabled {
                warn!("调度器在配置中被禁用, 调度循环不会启动");
                return;
            }

            let period = StdDuration::from_secs(dispatcher.config.dispatcher.tick_interval_seconds);
            let mut ticker = tokio::time::interval(period);
            info!(
                "问卷任务调度器已启动, 调度周期 {} 秒",
                period.as_secs()
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        dispatcher.run_tick().await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("收到停止信号, 调度循环退出");
                        break;
                    }
                }
            }
        })
    }

    /// 发送停止信号，不取消进行中的批次
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// 执行一个调度周期，吞掉并记录顶层错误以保证定时器持续运行
    pub async fn run_tick(&self) {
        if let Err(e) = self.scan_and_dispatch().await {
            error!("调度周期执行失败: {e}");
        }
    }

    /// 扫描到期窗口并分发任务，返回本周期触发的任务数
    pub async fn scan_and_dispatch(&self) -> SchedulerResult<usize> {
        let now = Utc::now();
        let window_start = now - Duration::hours(self.config.dispatcher.lookback_hours);
        let window_end = now + Duration::hours(self.config.dispatcher.lookahead_hours);

        let due_jobs = self
            .job_repo
            .fetch_due_between(window_start, window_end)
            .await?;

        if due_jobs.is_empty() {
            debug!("到期窗口内没有候选任务");
            return Ok(0);
        }

        debug!("本次扫描发现 {} 个候选任务", due_jobs.len());
        let dispatched = self
            .gate
            .run_exclusive(self.process_batch(due_jobs, now))
            .await?;

        info!("本次调度完成, 共触发 {dispatched} 个任务");
        Ok(dispatched)
    }

    /// 顺序处理一个批次；单个任务的错误被捕获后继续处理剩余任务
    async fn process_batch(&self, jobs: Vec<SurveyJob>, now: DateTime<Utc>) -> usize {
        let mut dispatched = 0;

        for mut job in jobs {
            // 批次在闸门外查询, 进入闸门后按仓储中的当前状态刷新,
            // 重叠周期等待闸门期间持有的过期副本不能再被采信
            if let Ok(Some(current)) = self.job_repo.get_by_id(job.id).await {
                job = current;
            }

            if job.is_terminal() || job.is_in_progress() {
                debug!("任务 {} 处于 {:?} 状态, 跳过", job.id, job.status);
                continue;
            }

            match self.process_job(&mut job, now).await {
                Ok(true) => dispatched += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("处理任务 {} 失败: {e}", job.id);
                    self.fail_job(&mut job, &e).await;
                }
            }
        }

        dispatched
    }

    /// 推进单个任务的状态机，返回是否实际触发了执行器
    async fn process_job(&self, job: &mut SurveyJob, now: DateTime<Utc>) -> SchedulerResult<bool> {
        // 时间戳损坏时关闭执行: 任务进入错误状态, 执行器不会被调用
        let due_at = job.parse_next_execution()?;

        // 在决定是否触发之前就把推进后的时间写到内存中的任务上,
        // 执行中途崩溃也不会丢失已计算的调度推进
        let advanced = self.compute_advance(job, due_at, now)?;
        job.next_execution = format_timestamp(advanced);

        if now < due_at {
            debug!("任务 {} 尚未到期 (到期时间 {})", job.id, due_at);
            return Ok(false);
        }

        // 先持久化 InProgress, 让并发读取方观察到任务已被认领
        job.set_status(SurveyJobStatus::InProgress);
        self.job_repo.update(job).await?;

        match self.executor.execute(job).await {
            Ok(()) => {
                self.complete_job(job, due_at).await?;
            }
            Err(e) => {
                warn!("任务 {} 执行失败: {e}", job.id);
                self.fail_job(job, &e).await;
            }
        }

        Ok(true)
    }

    /// 计算任务的下一次到期时间
    ///
    /// 周期性任务由节律表达式求值；一次性任务保持原到期时间，
    /// 完成时再统一停放。节律无后续触发时同样停放并降级为不再复发。
    fn compute_advance(
        &self,
        job: &SurveyJob,
        due_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> SchedulerResult<DateTime<Utc>> {
        match job.job_type {
            SurveyJobType::Immediate => Ok(due_at),
            SurveyJobType::Frequent => {
                let cadence = CadenceExpression::parse(
                    &job.cron_expression,
                    self.timezone,
                    self.config.dispatcher.end_week_on_sunday,
                )?;
                match cadence.next_occurrence(now, false) {
                    Some(next) => Ok(next),
                    None => {
                        warn!(
                            "任务 {} 的节律 '{}' 没有后续触发时间, 任务停放为不再复发",
                            job.id, job.cron_expression
                        );
                        Ok(due_at + Duration::days(PARK_OFFSET_DAYS))
                    }
                }
            }
        }
    }

    /// 执行成功后的状态转移
    async fn complete_job(&self, job: &mut SurveyJob, due_at: DateTime<Utc>) -> SchedulerResult<()> {
        match job.job_type {
            SurveyJobType::Immediate => {
                job.set_status(SurveyJobStatus::Completed);
                job.execution_count = 0;
                job.next_execution = format_timestamp(due_at + Duration::days(PARK_OFFSET_DAYS));
            }
            SurveyJobType::Frequent => {
                // 外部系统可能在执行期间把任务标记为已完成, 该信号要保留
                let externally_completed = self
                    .job_repo
                    .get_by_id(job.id)
                    .await?
                    .map(|current| current.status == SurveyJobStatus::Completed)
                    .unwrap_or(false);

                if externally_completed {
                    job.set_status(SurveyJobStatus::Completed);
                } else {
                    job.set_status(SurveyJobStatus::Queued);
                }
                job.execution_count += 1;
            }
        }

        self.job_repo.update(job).await?;
        debug!(
            "任务 {} 执行成功, 下次到期时间 {}",
            job.id, job.next_execution
        );
        Ok(())
    }

    /// 错误路径: 标记错误状态并写入失败记录, 两者自身的错误也不中断批处理
    async fn fail_job(&self, job: &mut SurveyJob, cause: &SchedulerError) {
        job.set_status(SurveyJobStatus::Error);

        let record = FailureRecord::new(
            &self.config.environment,
            &self.config.version,
            cause.to_string(),
            Some(job.project_id),
        );
        if let Err(sink_err) = self.failure_sink.record(&record).await {
            warn!("写入失败记录时出错: {sink_err}");
        }

        if let Err(update_err) = self.job_repo.update(job).await {
            error!("持久化任务 {} 的错误状态失败: {update_err}", job.id);
        }
    }
}
